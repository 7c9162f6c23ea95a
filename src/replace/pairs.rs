//! Pair builders: expand one search/replace intent into patterns.
//!
//! Every builder returns the pairs in the order they must be applied. URL and
//! path patterns end in a capturing group for the boundary that follows the
//! match (separator, quote, query marker or end of line) and their
//! replacement re-appends it through `$1`. Plain-string patterns have no
//! boundary group.
//!
//! All patterns are multiline (`(?m)`) and written for `fancy-regex`, which
//! is needed for the negative lookbehind on protocol-relative URLs.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::SearchReplacePair;
use super::encode::{escape_replacement, json_without_quotes, quote_pattern, url_encode};

/// Heuristic registrable domain: a label followed by a short suffix such as
/// `com` or `co.uk`.
static REGISTRABLE_DOMAIN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<domain>[a-z0-9][a-z0-9\-]{1,63}\.[a-z.]{2,6})$").ok()
});

/// Schemes that the explicit-scheme URL patterns accept.
const URL_SCHEME_PATTERN: &str = "https?";

// ---------------------------------------------------------------------------
// Encodings
// ---------------------------------------------------------------------------

/// The three shapes a URL can take in stored content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Raw,
    Json,
    UrlEncoded,
}

impl Encoding {
    const ALL: [Self; 3] = [Self::Raw, Self::Json, Self::UrlEncoded];

    fn encode(self, value: &str) -> String {
        match self {
            Self::Raw => value.to_owned(),
            Self::Json => json_without_quotes(value),
            Self::UrlEncoded => url_encode(value),
        }
    }

    /// Pattern for the `//` that follows a scheme.
    const fn slashes(self) -> &'static str {
        match self {
            Self::Raw => "//",
            Self::Json => r"\\/\\/",
            Self::UrlEncoded => "%2F%2F",
        }
    }

    /// Pattern for the `:` that ends a scheme.
    const fn colon(self) -> &'static str {
        match self {
            Self::Raw | Self::Json => ":",
            Self::UrlEncoded => "%3A",
        }
    }

    /// Capturing group for whatever may legally follow a URL.
    const fn url_boundary(self) -> &'static str {
        match self {
            Self::Raw => r#"(/|\?|#|"|'|<|\s|$)"#,
            Self::Json => r#"(\\/|\\"|\?|#|"|'|\\n|\s|$)"#,
            Self::UrlEncoded => "(%2F|%3F|%23|%22|%27|&|$)",
        }
    }

    /// Lookbehinds rejecting `//` preceded by an explicit `http:`/`https:`.
    fn no_scheme_lookbehind(self) -> String {
        let colon = self.colon();
        format!("(?<!http{colon})(?<!https{colon})")
    }

    /// Zero-width assertion that an explicit `http://`/`https://` precedes.
    fn after_scheme_lookbehind(self) -> String {
        let colon = self.colon();
        let slashes = self.slashes();
        format!("(?:(?<=http{colon}{slashes})|(?<=https{colon}{slashes}))")
    }
}

fn multiline(body: &str) -> String {
    format!("(?m){body}")
}

// ---------------------------------------------------------------------------
// Plain strings
// ---------------------------------------------------------------------------

/// Pairs for a plain string: raw, JSON-escaped and urlencoded.
///
/// An encoded variant is only emitted when it differs from the raw search
/// and from the equally encoded replacement.
pub fn search_replace_with_encodings(search: &str, replace: &str) -> Vec<SearchReplacePair> {
    if search == replace {
        return Vec::new();
    }

    let mut result = vec![literal_pair(search, replace)];

    let search_json = json_without_quotes(search);
    let replace_json = json_without_quotes(replace);
    if search_json != search && search_json != replace_json {
        result.push(literal_pair(&search_json, &replace_json));
    }

    let search_url = url_encode(search);
    let replace_url = url_encode(replace);
    if search_url != search && search_url != replace_url {
        result.push(literal_pair(&search_url, &replace_url));
    }

    result
}

fn literal_pair(search: &str, replace: &str) -> SearchReplacePair {
    SearchReplacePair {
        search: multiline(&quote_pattern(search)),
        replace: escape_replacement(replace),
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Pairs for a filesystem path: one matching `/` or `\` separators, one
/// matching JSON-escaped separators (`\/` or `\\`). There is no urlencoded
/// variant.
pub fn search_replace_path(search: &str, replace: &str) -> Vec<SearchReplacePair> {
    if search == replace {
        return Vec::new();
    }

    let segments: Vec<String> = search
        .split('/')
        .map(|segment| quote_pattern(&json_without_quotes(segment)))
        .collect();

    let normal = SearchReplacePair {
        search: multiline(&format!(
            r#"{}([/\\]|"|'|\n|$)"#,
            segments.join(r"[/\\]")
        )),
        replace: format!("{}$1", escape_replacement(replace)),
    };

    let json = SearchReplacePair {
        search: multiline(&format!(
            r#"{}(\\/|\\\\|\\"|"|'|\\n|\n|$)"#,
            segments.join(r"(?:\\/|\\\\)")
        )),
        replace: format!("{}$1", escape_replacement(&json_without_quotes(replace))),
    };

    vec![normal, json]
}

// ---------------------------------------------------------------------------
// URLs
// ---------------------------------------------------------------------------

/// Split a URL into its scheme and the part after `scheme://`.
///
/// Values that do not parse as a URL with a `://` separator have no scheme;
/// a protocol-relative value loses its leading `//`.
fn split_scheme(value: &str) -> (Option<String>, &str) {
    if let Ok(parsed) = url::Url::parse(value) {
        let scheme = parsed.scheme();
        if let Some(rest) = value
            .get(scheme.len()..)
            .and_then(|tail| tail.strip_prefix("://"))
        {
            return (Some(scheme.to_owned()), rest);
        }
    }
    (None, value.strip_prefix("//").unwrap_or(value))
}

/// Host of `value`, tolerating values without a scheme.
fn host_of(value: &str) -> Option<String> {
    let parsed = url::Url::parse(value).ok().filter(|u| u.host_str().is_some());
    let parsed = match parsed {
        Some(u) => u,
        None => {
            let (_, rest) = split_scheme(value);
            url::Url::parse(&format!("http://{rest}")).ok()?
        }
    };
    parsed.host_str().map(str::to_ascii_lowercase)
}

/// `true` when the host of `url` starts with `www.`.
pub fn is_www(url: &str) -> bool {
    host_of(url).is_some_and(|host| host.starts_with("www."))
}

/// `true` when the `www.` and bare forms of the host of `url` can be treated
/// as the same site: the host is `www.`-prefixed, has exactly two labels, or
/// has three labels that together form a registrable domain like
/// `example.co.uk`.
pub fn domain_can_normalize(url: &str) -> bool {
    let Some(host) = host_of(url) else {
        return false;
    };
    if !host.contains('.') {
        return false;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.first() == Some(&"www") {
        return true;
    }

    match labels.len() {
        2 => true,
        3 => REGISTRABLE_DOMAIN
            .as_ref()
            .and_then(|re| re.captures(&host))
            .and_then(|caps| caps.name("domain"))
            .is_some_and(|domain| domain.as_str() == host),
        _ => false,
    }
}

/// Pairs for a URL.
///
/// Two families, each in raw, JSON and urlencoded form:
/// - protocol-relative `//host/path` not preceded by `http:`/`https:`,
///   rewritten host-only (emitted only when the part after the scheme
///   changes);
/// - explicit `http://` or `https://`, rewritten to the replacement's scheme.
///   A replacement without a scheme keeps whatever scheme was matched.
///
/// With `normalize_www` and a search host that qualifies, a leading `www.` is
/// optional in every pattern.
pub fn search_replace_url(search: &str, replace: &str, normalize_www: bool) -> Vec<SearchReplacePair> {
    if search == replace {
        return Vec::new();
    }

    let (_, search_rest) = split_scheme(search);
    let (replace_scheme, replace_rest) = split_scheme(replace);

    let normalize = normalize_www && domain_can_normalize(search);
    let (www, search_host_rest) = if normalize {
        ("(?:www\\.)?", search_rest.strip_prefix("www.").unwrap_or(search_rest))
    } else {
        ("", search_rest)
    };

    let mut result = Vec::with_capacity(6);

    if search_rest != replace_rest {
        for encoding in Encoding::ALL {
            result.push(SearchReplacePair {
                search: multiline(&format!(
                    "{}{}{}{}{}",
                    encoding.no_scheme_lookbehind(),
                    encoding.slashes(),
                    www,
                    quote_pattern(&encoding.encode(search_host_rest)),
                    encoding.url_boundary(),
                )),
                replace: format!(
                    "{}$1",
                    escape_replacement(&encoding.encode(&format!("//{replace_rest}")))
                ),
            });
        }
    }

    for encoding in Encoding::ALL {
        let host = format!(
            "{}{}{}",
            www,
            quote_pattern(&encoding.encode(search_host_rest)),
            encoding.url_boundary(),
        );
        let pair = match &replace_scheme {
            Some(scheme) => SearchReplacePair {
                search: multiline(&format!(
                    "{URL_SCHEME_PATTERN}{}{}{host}",
                    encoding.colon(),
                    encoding.slashes(),
                )),
                replace: format!(
                    "{}$1",
                    escape_replacement(&encoding.encode(&format!("{scheme}://{replace_rest}")))
                ),
            },
            None => SearchReplacePair {
                search: multiline(&format!("{}{host}", encoding.after_scheme_lookbehind())),
                replace: format!("{}$1", escape_replacement(&encoding.encode(replace_rest))),
            },
        };
        result.push(pair);
    }

    debug!(
        search,
        replace,
        normalize_www = normalize,
        pairs = result.len(),
        "expanded url rule"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(pairs: &[SearchReplacePair], text: &str) -> String {
        crate::replace::PairSet::compile(pairs)
            .expect("patterns compile")
            .apply(text)
            .expect("patterns match")
            .0
    }

    // -- plain strings --
    #[test]
    fn test_string_identical_is_empty() {
        assert!(search_replace_with_encodings("same", "same").is_empty());
    }

    #[test]
    fn test_string_skips_unchanged_encodings() {
        // Neither JSON nor urlencoding changes a bare word.
        let pairs = search_replace_with_encodings("oldword", "newword");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].search, "(?m)oldword");
        assert_eq!(pairs[0].replace, "newword");
    }

    #[test]
    fn test_string_all_encodings() {
        let pairs = search_replace_with_encodings("a/b c", "x/y z");
        assert_eq!(pairs.len(), 3);
        assert_eq!(apply(&pairs, "a/b c|a\\/b c|a%2Fb+c"), "x/y z|x\\/y z|x%2Fy+z");
    }

    #[test]
    fn test_string_dollar_in_replacement_is_literal() {
        let pairs = search_replace_with_encodings("price", "$1.00");
        assert_eq!(apply(&pairs, "the price"), "the $1.00");
    }

    // -- paths --
    #[test]
    fn test_path_produces_two_pairs() {
        assert_eq!(search_replace_path("/var/www", "/srv/site").len(), 2);
        assert!(search_replace_path("/var/www", "/var/www").is_empty());
    }

    #[test]
    fn test_path_any_separator() {
        let pairs = search_replace_path("/var/www", "/srv/site");
        assert_eq!(apply(&pairs, "/var/www/index.php"), "/srv/site/index.php");
        assert_eq!(apply(&pairs, "\\var\\www\\index.php"), "/srv/site\\index.php");
        assert_eq!(apply(&pairs, "'/var/www'"), "'/srv/site'");
    }

    #[test]
    fn test_path_boundary_is_respected() {
        let pairs = search_replace_path("/var/www", "/srv/site");
        assert_eq!(apply(&pairs, "/var/www-old/x"), "/var/www-old/x");
    }

    #[test]
    fn test_path_json_escaped() {
        let pairs = search_replace_path("/var/www", "/srv/site");
        assert_eq!(
            apply(&pairs, r#"{"path":"\/var\/www\/wp-content"}"#),
            r#"{"path":"\/srv\/site\/wp-content"}"#
        );
    }

    // -- urls --
    #[test]
    fn test_url_explicit_scheme_forced() {
        let pairs = search_replace_url("http://old.com", "https://new.com", false);
        assert_eq!(apply(&pairs, "http://old.com/page"), "https://new.com/page");
        assert_eq!(apply(&pairs, "see https://old.com"), "see https://new.com");
    }

    #[test]
    fn test_url_protocol_relative_host_only() {
        let pairs = search_replace_url("http://old.com", "https://new.com", false);
        assert_eq!(apply(&pairs, "src=\"//old.com/a.js\""), "src=\"//new.com/a.js\"");
    }

    #[test]
    fn test_url_no_partial_host_match() {
        let pairs = search_replace_url("http://old.com", "https://new.com", false);
        assert_eq!(apply(&pairs, "http://old.com.au/x"), "http://old.com.au/x");
    }

    #[test]
    fn test_url_json_and_urlencoded() {
        let pairs = search_replace_url("http://old.com", "https://new.com", false);
        assert_eq!(
            apply(&pairs, r#"{"u":"http:\/\/old.com\/p"}"#),
            r#"{"u":"https:\/\/new.com\/p"}"#
        );
        assert_eq!(
            apply(&pairs, "r=http%3A%2F%2Fold.com%2Fp"),
            "r=https%3A%2F%2Fnew.com%2Fp"
        );
    }

    #[test]
    fn test_url_scheme_only_change_skips_protocol_relative() {
        let pairs = search_replace_url("http://site.com", "https://site.com", false);
        assert_eq!(pairs.len(), 3);
        assert_eq!(apply(&pairs, "//site.com/x http://site.com/x"), "//site.com/x https://site.com/x");
    }

    #[test]
    fn test_url_without_replace_scheme_keeps_matched_scheme() {
        let pairs = search_replace_url("oldsite.com", "newsite.com", false);
        assert_eq!(
            apply(&pairs, "https://oldsite.com/a http://oldsite.com //oldsite.com"),
            "https://newsite.com/a http://newsite.com //newsite.com"
        );
    }

    #[test]
    fn test_url_normalize_www() {
        let pairs = search_replace_url("https://www.example.com", "https://new.org", true);
        assert_eq!(
            apply(&pairs, "http://www.example.com/a http://example.com/b"),
            "https://new.org/a https://new.org/b"
        );
    }

    #[test]
    fn test_url_without_normalization_is_strict() {
        let pairs = search_replace_url("https://www.example.com", "https://new.org", false);
        assert_eq!(apply(&pairs, "http://example.com/b"), "http://example.com/b");
    }

    // -- domain helpers --
    #[test]
    fn test_domain_can_normalize() {
        assert!(domain_can_normalize("https://www.example.com"));
        assert!(domain_can_normalize("https://example.com/path"));
        assert!(domain_can_normalize("example.co.uk"));
        assert!(!domain_can_normalize("https://blog.example.com"));
        assert!(!domain_can_normalize("https://a.b.example.com"));
        assert!(!domain_can_normalize("http://localhost"));
        assert!(!domain_can_normalize(""));
    }

    #[test]
    fn test_is_www() {
        assert!(is_www("http://www.example.com"));
        assert!(is_www("//WWW.example.com"));
        assert!(!is_www("http://example.com"));
        assert!(!is_www("not a url"));
    }
}
