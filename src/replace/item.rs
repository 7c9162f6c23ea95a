//! Rule items: one declared search/replace intent each.
//!
//! A [`RuleItem`] is immutable once built. Its `search`/`replace` values are
//! normalized by [`RuleKind`] at construction, and it expands itself into
//! concrete pattern/replacement pairs on demand via [`RuleItem::pairs`].

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::RelocateError;
use crate::paths::relative::untrailingslash;

use super::SearchReplacePair;
use super::pairs;

/// Priority given to rules registered without an explicit one.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Wire token standing for [`Scope::Global`] in serialized rule records.
pub const GLOBAL_SCOPE_TOKEN: &str = "___!GLOBAL!___";

/// Source of rule ids, unique for the lifetime of the process.
static NEXT_RULE_ID: AtomicU64 = AtomicU64::new(0);

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// What a rule's search/replace values are, which decides the encodings
/// generated for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RuleKind {
    /// Arbitrary text: raw, JSON and urlencoded variants.
    PlainString,
    /// Absolute or protocol-relative URL.
    Url,
    /// URL whose `www.` prefix is optional when matching.
    UrlNormalizeDomain,
    /// Filesystem path, matched with either separator style.
    Path,
}

impl RuleKind {
    /// The wire name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PlainString => "str",
            Self::Url => "url",
            Self::UrlNormalizeDomain => "urlnd",
            Self::Path => "path",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = RelocateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" => Ok(Self::PlainString),
            "url" => Ok(Self::Url),
            "urlnd" => Ok(Self::UrlNormalizeDomain),
            "path" => Ok(Self::Path),
            other => Err(RelocateError::UnknownKind(other.to_owned())),
        }
    }
}

impl TryFrom<String> for RuleKind {
    type Error = RelocateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RuleKind> for String {
    fn from(kind: RuleKind) -> Self {
        kind.as_str().to_owned()
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Where a rule applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Scope {
    /// Applies to every scope queried.
    Global,
    /// Applies only when this scope name is queried (e.g. `"database"`).
    Named(String),
}

impl Scope {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl From<String> for Scope {
    fn from(value: String) -> Self {
        if value == GLOBAL_SCOPE_TOKEN {
            Self::Global
        } else {
            Self::Named(value)
        }
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Global => GLOBAL_SCOPE_TOKEN.to_owned(),
            Scope::Named(name) => name,
        }
    }
}

/// The set of scopes a rule is registered under. Duplicates are dropped,
/// first-seen order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Scope>", into = "Vec<Scope>")]
pub struct ScopeSet(Vec<Scope>);

impl ScopeSet {
    /// Only the global scope.
    pub fn global() -> Self {
        Self(vec![Scope::Global])
    }

    /// No scope at all: the rule is kept but never returned.
    pub const fn none() -> Self {
        Self(Vec::new())
    }

    pub fn contains(&self, scope: &Scope) -> bool {
        self.0.contains(scope)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.0.iter()
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, scope) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{scope}")?;
        }
        f.write_str("]")
    }
}

impl From<Vec<Scope>> for ScopeSet {
    fn from(scopes: Vec<Scope>) -> Self {
        let mut unique: Vec<Scope> = Vec::with_capacity(scopes.len());
        for scope in scopes {
            if !unique.contains(&scope) {
                unique.push(scope);
            }
        }
        Self(unique)
    }
}

impl From<ScopeSet> for Vec<Scope> {
    fn from(set: ScopeSet) -> Self {
        set.0
    }
}

/// `true` is the global scope, `false` is no scope.
impl From<bool> for ScopeSet {
    fn from(global: bool) -> Self {
        if global { Self::global() } else { Self::none() }
    }
}

impl From<Scope> for ScopeSet {
    fn from(scope: Scope) -> Self {
        Self(vec![scope])
    }
}

impl From<&str> for ScopeSet {
    fn from(name: &str) -> Self {
        Self(vec![Scope::from(name.to_owned())])
    }
}

impl From<String> for ScopeSet {
    fn from(name: String) -> Self {
        Self(vec![Scope::from(name)])
    }
}

impl From<Vec<&str>> for ScopeSet {
    fn from(names: Vec<&str>) -> Self {
        names
            .into_iter()
            .map(|n| Scope::from(n.to_owned()))
            .collect::<Vec<_>>()
            .into()
    }
}

impl From<Vec<String>> for ScopeSet {
    fn from(names: Vec<String>) -> Self {
        names.into_iter().map(Scope::from).collect::<Vec<_>>().into()
    }
}

// ---------------------------------------------------------------------------
// Rule item
// ---------------------------------------------------------------------------

/// A single search/replace rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleItem {
    id: u64,
    priority: i32,
    scope: ScopeSet,
    kind: RuleKind,
    search: String,
    replace: String,
}

impl RuleItem {
    /// Build a rule, normalizing `search` and `replace` for `kind`:
    /// URLs lose trailing slashes, paths lose a trailing separator unless
    /// they are a bare root.
    pub fn new(
        search: &str,
        replace: &str,
        kind: RuleKind,
        priority: i32,
        scope: impl Into<ScopeSet>,
    ) -> Self {
        let (search, replace) = match kind {
            RuleKind::Url | RuleKind::UrlNormalizeDomain => (
                search.trim_end_matches('/').to_owned(),
                replace.trim_end_matches('/').to_owned(),
            ),
            RuleKind::Path => (untrailingslash(search), untrailingslash(replace)),
            RuleKind::PlainString => (search.to_owned(), replace.to_owned()),
        };

        Self {
            id: NEXT_RULE_ID.fetch_add(1, Ordering::Relaxed),
            priority,
            scope: scope.into(),
            kind,
            search,
            replace,
        }
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    pub const fn priority(&self) -> i32 {
        self.priority
    }

    pub const fn scope(&self) -> &ScopeSet {
        &self.scope
    }

    pub const fn kind(&self) -> RuleKind {
        self.kind
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn replace(&self) -> &str {
        &self.replace
    }

    /// Expand this rule into the ordered pattern/replacement pairs that
    /// rewrite every encoding of `search`.
    pub fn pairs(&self) -> Vec<SearchReplacePair> {
        match self.kind {
            RuleKind::PlainString => pairs::search_replace_with_encodings(&self.search, &self.replace),
            RuleKind::Url => pairs::search_replace_url(&self.search, &self.replace, false),
            RuleKind::UrlNormalizeDomain => {
                pairs::search_replace_url(&self.search, &self.replace, true)
            }
            RuleKind::Path => pairs::search_replace_path(&self.search, &self.replace),
        }
    }

    /// Serializable form of this rule.
    pub fn to_record(&self) -> RuleRecord {
        RuleRecord {
            id: self.id,
            priority: self.priority,
            scope: self.scope.clone(),
            kind: self.kind,
            search: self.search.clone(),
            replace: self.replace.clone(),
        }
    }
}

/// Wire form of a rule, as exported by the registry and read back on import.
///
/// `id` is informational: importing re-registers the rule under a fresh id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    #[serde(default)]
    pub id: u64,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "ScopeSet::global")]
    pub scope: ScopeSet,
    pub kind: RuleKind,
    pub search: String,
    pub replace: String,
}

const fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}
