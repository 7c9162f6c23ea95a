//! The rule registry: every pending substitution for one migration run.
//!
//! Rules are held in a flat map keyed by id (ids grow with insertion, so
//! iteration is insertion order) and in a derived index
//! `priority → scope → ids` used to answer scoped queries. The index is a
//! cache of the flat map and is only ever extended alongside it.
//!
//! The registry is a plain value: build one per migration run and pass it to
//! whichever rewrite pass needs it. To carry it across process invocations,
//! [`RuleRegistry::export`] it and [`RuleRegistry::import`] the records into a
//! fresh registry.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::RelocateResult;

use super::SearchReplacePair;
use super::apply::PairSet;
use super::item::{RuleItem, RuleKind, RuleRecord, Scope, ScopeSet};

/// Registry of search/replace rules.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    items: BTreeMap<u64, RuleItem>,
    index: BTreeMap<i32, IndexMap<Scope, Vec<u64>>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule.
    ///
    /// Returns the new rule id, or `None` when the rule would do nothing once
    /// normalized for its kind (empty `search`, or `search == replace`, so
    /// `http://a.com/ → http://a.com` is rejected). Rejection is not an
    /// error: callers register thousands of candidate rules and many are
    /// no-ops.
    pub fn add_item(
        &mut self,
        search: &str,
        replace: &str,
        kind: RuleKind,
        priority: i32,
        scope: impl Into<ScopeSet>,
    ) -> Option<u64> {
        let item = RuleItem::new(search, replace, kind, priority, scope);
        if item.search().is_empty() || item.search() == item.replace() {
            debug!(%kind, search, replace, "no-op search/replace rule skipped");
            return None;
        }

        info!(
            id = item.id(),
            kind = %item.kind(),
            priority = item.priority(),
            search = item.search(),
            replace = item.replace(),
            scope = %item.scope(),
            "search/replace rule added"
        );

        let id = item.id();
        let bands = self.index.entry(item.priority()).or_default();
        for scope in item.scope().iter() {
            bands.entry(scope.clone()).or_default().push(id);
        }
        self.items.insert(id, item);

        Some(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&RuleItem> {
        self.items.get(&id)
    }

    /// All rules in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &RuleItem> {
        self.items.values()
    }

    /// Rules that apply to `scope`, in application order.
    ///
    /// Priorities are walked ascending. Within one priority, rules registered
    /// under the named scope come before global ones, each group in
    /// insertion order. `scope: None` asks for global rules only.
    ///
    /// With `unique_search`, only the first rule for a given `search` value
    /// survives, whatever its kind or replacement. A rule registered under
    /// both the named and the global scope is returned once.
    pub fn rules_for(
        &self,
        scope: Option<&str>,
        unique_search: bool,
        include_global: bool,
    ) -> Vec<&RuleItem> {
        let named = scope.map(Scope::named);
        let mut seen_ids = HashSet::new();
        let mut seen_search = HashSet::new();
        let mut result = Vec::new();

        for (priority, bands) in &self.index {
            let named_ids = named.as_ref().and_then(|s| bands.get(s));
            let global_ids = if include_global {
                bands.get(&Scope::Global)
            } else {
                None
            };

            for id in named_ids.into_iter().chain(global_ids).flatten() {
                if !seen_ids.insert(*id) {
                    continue;
                }
                let Some(item) = self.items.get(id) else {
                    continue;
                };
                if unique_search && !seen_search.insert(item.search()) {
                    debug!(
                        id,
                        priority,
                        search = item.search(),
                        "duplicate search dropped"
                    );
                    continue;
                }
                result.push(item);
            }
        }

        result
    }

    /// The ordered pattern/replacement pairs for `scope`.
    ///
    /// Every surviving rule from [`Self::rules_for`] is expanded in order;
    /// pairs with an empty pattern are dropped.
    pub fn pairs(
        &self,
        scope: Option<&str>,
        unique_search: bool,
        include_global: bool,
    ) -> Vec<SearchReplacePair> {
        let pairs: Vec<SearchReplacePair> = self
            .rules_for(scope, unique_search, include_global)
            .into_iter()
            .flat_map(RuleItem::pairs)
            .filter(|pair| !pair.search.is_empty())
            .collect();

        debug!(
            scope = scope.unwrap_or("global"),
            pairs = pairs.len(),
            "search/replace pairs assembled"
        );
        pairs
    }

    /// Pairs for `scope` with the usual options: unique searches, global rules
    /// included.
    pub fn pairs_for(&self, scope: Option<&str>) -> Vec<SearchReplacePair> {
        self.pairs(scope, true, true)
    }

    /// Rewrite `text` with every pair for `scope`.
    ///
    /// Returns the new text and the number of replacements.
    pub fn rewrite(&self, scope: Option<&str>, text: &str) -> RelocateResult<(String, usize)> {
        PairSet::compile(&self.pairs_for(scope))?.apply(text)
    }

    /// All rules as wire records, in insertion order.
    pub fn export(&self) -> Vec<RuleRecord> {
        self.items.values().map(RuleItem::to_record).collect()
    }

    /// Re-register `records` in order under fresh ids.
    ///
    /// Returns how many were accepted; no-op records are skipped like any
    /// other registration.
    pub fn import(&mut self, records: impl IntoIterator<Item = RuleRecord>) -> usize {
        records
            .into_iter()
            .filter_map(|r| self.add_item(&r.search, &r.replace, r.kind, r.priority, r.scope))
            .count()
    }

    pub fn to_json(&self) -> RelocateResult<String> {
        Ok(serde_json::to_string(&self.export())?)
    }

    pub fn from_json(json: &str) -> RelocateResult<Self> {
        let records: Vec<RuleRecord> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        registry.import(records);
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::DEFAULT_PRIORITY;

    fn searches(registry: &RuleRegistry, scope: Option<&str>) -> Vec<String> {
        registry
            .rules_for(scope, true, true)
            .iter()
            .map(|i| i.search().to_owned())
            .collect()
    }

    #[test]
    fn test_rejects_noop_rules() {
        let mut registry = RuleRegistry::new();
        assert_eq!(registry.add_item("/a", "/a", RuleKind::Path, 10, true), None);
        assert_eq!(registry.add_item("", "x", RuleKind::PlainString, 10, true), None);
        assert!(registry.is_empty());
        assert!(registry.pairs_for(None).is_empty());
    }

    #[test]
    fn test_rejects_rules_that_normalize_to_noop() {
        let mut registry = RuleRegistry::new();
        assert_eq!(registry.add_item("http://a.com/", "http://a.com", RuleKind::Url, 5, true), None);
        assert_eq!(registry.add_item("/var/www/", "/var/www", RuleKind::Path, 5, true), None);
        assert_eq!(registry.add_item("/", "", RuleKind::Url, 5, true), None);
        registry.add_item("http://a.com", "http://b.com", RuleKind::Url, 10, true);

        let (text, count) = registry.rewrite(None, "http://a.com/x").expect("rewrite");
        assert_eq!(text, "http://b.com/x");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_index_covers_every_scope() {
        let mut registry = RuleRegistry::new();
        let id = registry
            .add_item("a", "b", RuleKind::PlainString, 3, vec![Scope::Global, Scope::named("files")])
            .expect("added");
        let bands = registry.index.get(&3).expect("priority band");
        assert_eq!(bands.get(&Scope::Global), Some(&vec![id]));
        assert_eq!(bands.get(&Scope::named("files")), Some(&vec![id]));
    }

    #[test]
    fn test_priority_order() {
        let mut registry = RuleRegistry::new();
        registry.add_item("late", "x", RuleKind::PlainString, 20, true);
        registry.add_item("early", "x", RuleKind::PlainString, 1, true);
        registry.add_item("middle", "x", RuleKind::PlainString, DEFAULT_PRIORITY, true);
        assert_eq!(searches(&registry, None), ["early", "middle", "late"]);
    }

    #[test]
    fn test_named_before_global_in_same_band() {
        let mut registry = RuleRegistry::new();
        registry.add_item("global", "x", RuleKind::PlainString, 10, true);
        registry.add_item("named", "x", RuleKind::PlainString, 10, "database");
        assert_eq!(searches(&registry, Some("database")), ["named", "global"]);
    }

    #[test]
    fn test_dedup_keeps_lowest_priority() {
        let mut registry = RuleRegistry::new();
        registry.add_item("same", "ten", RuleKind::PlainString, 10, true);
        registry.add_item("same", "five", RuleKind::Url, 5, true);
        let rules = registry.rules_for(None, true, true);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].replace(), "five");

        assert_eq!(registry.rules_for(None, false, true).len(), 2);
    }

    #[test]
    fn test_item_in_two_scopes_returned_once() {
        let mut registry = RuleRegistry::new();
        registry.add_item("a", "b", RuleKind::PlainString, 10, vec![Scope::Global, Scope::named("files")]);
        assert_eq!(registry.rules_for(Some("files"), false, true).len(), 1);
    }

    #[test]
    fn test_scope_isolation() {
        let mut registry = RuleRegistry::new();
        registry.add_item("a", "b", RuleKind::PlainString, 10, "files");
        assert!(registry.pairs_for(Some("database")).is_empty());
        assert!(registry.pairs_for(None).is_empty());
        assert_eq!(registry.pairs_for(Some("files")).len(), 1);
        assert!(registry.pairs(Some("files"), true, false).len() == 1);
    }

    #[test]
    fn test_exclude_global() {
        let mut registry = RuleRegistry::new();
        registry.add_item("a", "b", RuleKind::PlainString, 10, true);
        assert!(registry.pairs(Some("files"), true, false).is_empty());
        assert!(registry.pairs(None, true, false).is_empty());
    }

    #[test]
    fn test_scope_false_never_applies() {
        let mut registry = RuleRegistry::new();
        assert!(registry.add_item("a", "b", RuleKind::PlainString, 10, false).is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.pairs_for(None).is_empty());
    }

    #[test]
    fn test_export_import_renumbers() {
        let mut registry = RuleRegistry::new();
        registry.add_item("http://a.com/", "http://b.com", RuleKind::Url, 4, "database");
        registry.add_item("/old", "/new", RuleKind::Path, 10, true);

        let json = registry.to_json().expect("export");
        let restored = RuleRegistry::from_json(&json).expect("import");

        let before = registry.export();
        let after = restored.export();
        assert_eq!(after.len(), 2);
        assert!(after[0].id < after[1].id);
        assert!(after[0].id > before[1].id);
        assert_eq!(after[0].search, "http://a.com");
        assert_eq!(after[0].scope, before[0].scope);
        assert_eq!(restored.pairs_for(Some("database")), registry.pairs_for(Some("database")));
    }

    #[test]
    fn test_rewrite() {
        let mut registry = RuleRegistry::new();
        registry.add_item("http://old.com", "https://new.com", RuleKind::Url, 10, true);
        let (text, count) = registry.rewrite(None, "<a href=\"http://old.com/x\">").expect("rewrite");
        assert_eq!(text, "<a href=\"https://new.com/x\">");
        assert_eq!(count, 1);
    }
}
