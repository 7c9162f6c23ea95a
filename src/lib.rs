//! `site-relocate`: search/replace rules and archive path mapping for
//! moving a WordPress site to a new URL and filesystem layout.
//!
//! # Modules
//!
//! - [`replace`]: rule registry and pair builder turning "old URL/path/string
//!   → new one" intents into ordered regex search/replace pairs covering the
//!   raw, JSON-escaped and urlencoded forms of each value
//! - [`paths`]: maps archive-relative paths to their destination when the
//!   site's folders (home, core, content, plugins, uploads) move
//! - [`rewrite`]: applies compiled pairs to the files of an extracted site
//! - [`plan`]: JSON migration plan tying rules and path layouts together
//!
//! # Architecture
//!
//! ```text
//! MigrationPlan ─→ RuleRegistry ─→ pairs(scope) ─→ PairSet ─→ rewrite_tree()
//!       │                                              └────→ DB rewrite pass
//!       └────────→ PathMapper ─→ dest_file_from_archive_name()
//! ```

pub mod diff;
pub mod error;
pub mod paths;
pub mod plan;
pub mod replace;
pub mod rewrite;
pub mod util;

pub use error::{RelocateError, RelocateResult};
pub use paths::{ArchivePaths, InstallType, PathMapper, PathsMapping, WpPaths};
pub use plan::MigrationPlan;
pub use replace::{PairSet, RuleKind, RuleRegistry, Scope, ScopeSet, SearchReplacePair};
