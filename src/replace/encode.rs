//! Encodings a search/replace value can take inside stored site data.
//!
//! WordPress content carries the same URL or path in several shapes: raw,
//! inside a JSON string (as PHP's `json_encode` writes it, with `\/` and
//! `\uXXXX` escapes), and form-urlencoded. Each helper here produces one of
//! those shapes, or escapes a value for use in a pattern or replacement.

use std::fmt::Write as _;

use fancy_regex::Expander;

/// Encode `value` as the body of a JSON string literal, without the quotes.
///
/// Matches PHP's default `json_encode` output: `/` becomes `\/` and every
/// non-ASCII character is written as one or two `\uXXXX` escapes.
pub fn json_without_quotes(value: &str) -> String {
    let quoted = serde_json::Value::String(value.to_owned()).to_string();
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(&quoted);

    let mut out = String::with_capacity(inner.len());
    for ch in inner.chars() {
        match ch {
            '/' => out.push_str("\\/"),
            c if c.is_ascii() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
        }
    }
    out
}

/// Form-urlencode `value` the way PHP's `urlencode` does.
///
/// Alphanumerics and `-_.` pass through, space becomes `+`, everything else
/// is percent-encoded with uppercase hex.
pub fn url_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('*', "%2A")
}

/// Escape `value` so it matches literally inside a generated pattern.
pub fn quote_pattern(value: &str) -> String {
    fancy_regex::escape(value).into_owned()
}

/// Escape `value` for use as a literal replacement string.
///
/// Only `$` is special in the replacement dialect; it is doubled.
pub fn escape_replacement(value: &str) -> String {
    Expander::default().escape(value).into_owned()
}
