//! Compiled pair sets: the rewrite pass that consumes generated pairs.
//!
//! Patterns are compiled with `fancy-regex` and applied strictly in order,
//! each one over the output of the previous one. Replacement strings follow
//! the `fancy-regex` expander syntax: `$N`/`${N}` insert capture group `N`,
//! `$$` is a literal dollar, and every other character (backslash included)
//! is literal.

use std::borrow::Cow;

use fancy_regex::{Captures, Regex, RegexBuilder, Replacer};
use tracing::{debug, warn};

use crate::error::{RelocateError, RelocateResult};

use super::SearchReplacePair;

/// Backtracking steps one match attempt may take before it is aborted.
pub const DEFAULT_BACKTRACK_LIMIT: usize = 1_000_000;

/// An ordered list of compiled search patterns with their replacements.
#[derive(Debug, Clone)]
pub struct PairSet {
    compiled: Vec<(Regex, String)>,
}

impl PairSet {
    /// Compile every pair with [`DEFAULT_BACKTRACK_LIMIT`]. The first pattern
    /// that fails to compile aborts the whole set.
    pub fn compile(pairs: &[SearchReplacePair]) -> RelocateResult<Self> {
        Self::compile_with_backtrack_limit(pairs, DEFAULT_BACKTRACK_LIMIT)
    }

    /// Compile every pair, capping backtracking per match attempt at `limit`.
    pub fn compile_with_backtrack_limit(
        pairs: &[SearchReplacePair],
        limit: usize,
    ) -> RelocateResult<Self> {
        let compiled = pairs
            .iter()
            .map(|pair| {
                RegexBuilder::new(&pair.search)
                    .backtrack_limit(limit)
                    .build()
                    .map(|re| (re, pair.replace.clone()))
                    .map_err(|e| RelocateError::InvalidPattern {
                        pattern: pair.search.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<RelocateResult<Vec<_>>>()?;

        debug!(pairs = compiled.len(), backtrack_limit = limit, "compiled search/replace pairs");
        Ok(Self { compiled })
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// Run every pair over `text` in order.
    ///
    /// Returns the rewritten text and the total number of replacements made.
    /// A pattern that aborts at runtime (backtrack limit) fails the whole
    /// call: a partially rewritten text is never returned.
    pub fn apply(&self, text: &str) -> RelocateResult<(String, usize)> {
        let mut current = text.to_owned();
        let mut total = 0;

        for (re, template) in &self.compiled {
            let mut expander = CountingExpander { template, count: 0 };
            let replaced = re
                .try_replacen(&current, 0, expander.by_ref())
                .map_err(|e| {
                    warn!(pattern = re.as_str(), error = %e, "pattern matching aborted");
                    RelocateError::MatchAborted {
                        pattern: re.as_str().to_owned(),
                        reason: e.to_string(),
                    }
                })?;
            if let Cow::Owned(next) = replaced {
                current = next;
            }
            total += expander.count;
        }

        Ok((current, total))
    }
}

/// Expands the replacement template for each match and counts the matches.
struct CountingExpander<'a> {
    template: &'a str,
    count: usize,
}

impl Replacer for CountingExpander<'_> {
    fn replace_append(&mut self, caps: &Captures<'_>, dst: &mut String) {
        self.count += 1;
        caps.expand(self.template, dst);
    }
}
