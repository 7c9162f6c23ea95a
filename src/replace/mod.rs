//! Search/replace rule engine.
//!
//! Callers register substitution intents (old URL → new URL, old path → new
//! path, arbitrary strings) into a [`RuleRegistry`], each with a priority and
//! a set of scopes. At rewrite time the registry is queried for one scope and
//! returns an ordered, deduplicated list of [`SearchReplacePair`]s: regex
//! patterns with their replacements, covering every encoding under which the
//! value may be stored (raw, JSON string, urlencoded).
//!
//! # Flow
//!
//! ```text
//! add_item() → RuleItem (normalized by kind)
//!                 ↓ indexed by priority → scope
//! pairs(scope) → walk priorities ascending → dedup by search
//!                 ↓ RuleItem::pairs() per survivor
//!              Vec<SearchReplacePair> → PairSet::compile → apply(text)
//! ```
//!
//! # Pair contract
//!
//! Patterns are multiline and use lookbehind, so they must be compiled with
//! `fancy-regex`. Replacements use `regex` crate syntax: `$1` re-inserts the
//! captured boundary, `$$` is a literal dollar.

pub mod apply;
pub mod encode;
pub mod item;
pub mod pairs;
pub mod registry;

use serde::{Deserialize, Serialize};

pub use apply::PairSet;
pub use item::{DEFAULT_PRIORITY, RuleItem, RuleKind, RuleRecord, Scope, ScopeSet};
pub use pairs::{domain_can_normalize, is_www};
pub use registry::RuleRegistry;

/// One concrete rewrite step: a regex `search` pattern and its `replace`
/// template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReplacePair {
    pub search: String,
    pub replace: String,
}
