//! Archive path mapping.
//!
//! An archive records where each WordPress root (home, core, content,
//! plugins, mu-plugins, uploads) lived on the source machine. The operator
//! picks a destination for each. [`PathMapper`] works out the smallest set of
//! `archive-relative path → destination path` mappings that relocates every
//! file, and resolves individual archive entries against it.
//!
//! # Algorithm
//!
//! 1. Make every recorded root relative to the archive's target root.
//! 2. Map home, then core (whole folder, or entry by entry when only the
//!    destination core moves), content, plugins, mu-plugins and uploads.
//! 3. Drop mappings with an empty destination.
//! 4. Sort most specific first, then prune every mapping that a broader one
//!    already produces (same relative position on both sides).
//! 5. Prefix keys with `/`. One survivor collapses to a bare destination.

pub mod core_files;
pub mod install_type;
pub mod relative;

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RelocateError, RelocateResult};

pub use install_type::InstallType;
use relative::{common_root, depth, relative_path, safe_path};

/// Absolute paths of the WordPress roots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WpPaths {
    pub home: String,
    /// Core folder (`ABSPATH`).
    pub abs: String,
    pub wpcontent: String,
    pub plugins: String,
    pub muplugins: String,
    pub uploads: String,
}

impl WpPaths {
    /// Standard layout: everything under `home`.
    pub fn standard(home: &str) -> Self {
        let home = safe_path(home);
        let content = format!("{home}/wp-content");
        Self {
            abs: home.clone(),
            plugins: format!("{content}/plugins"),
            muplugins: format!("{content}/mu-plugins"),
            uploads: format!("{content}/uploads"),
            wpcontent: content,
            home,
        }
    }

    fn all(&self) -> [&str; 6] {
        [
            self.home.as_str(),
            self.abs.as_str(),
            self.wpcontent.as_str(),
            self.plugins.as_str(),
            self.muplugins.as_str(),
            self.uploads.as_str(),
        ]
    }
}

/// Paths recorded in the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivePaths {
    #[serde(flatten)]
    pub paths: WpPaths,
    /// Folder the archive was built from. Defaults to the deepest folder
    /// containing every recorded root.
    #[serde(default)]
    pub target_root: Option<String>,
}

impl ArchivePaths {
    pub fn new(paths: WpPaths) -> Self {
        Self {
            paths,
            target_root: None,
        }
    }

    pub fn target_root(&self) -> String {
        self.target_root
            .as_deref()
            .map_or_else(|| common_root(self.paths.all()), safe_path)
    }

    /// `path` relative to the target root, or normalized as-is when it lies
    /// outside it.
    fn relative(&self, root: &str, path: &str) -> String {
        relative_path(path, root).unwrap_or_else(|| safe_path(path))
    }
}

/// Result of path mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathsMapping {
    /// Everything moves under one destination.
    Single(String),
    /// `/archive-relative path → destination`, most specific first.
    Multiple(IndexMap<String, String>),
}

/// Computes and caches the archive path mapping for one install.
#[derive(Debug, Clone)]
pub struct PathMapper {
    archive: ArchivePaths,
    target: WpPaths,
    install_type: InstallType,
    uploads_overrides: HashMap<InstallType, String>,
    cached: Option<PathsMapping>,
}

impl PathMapper {
    pub fn new(archive: ArchivePaths, target: WpPaths, install_type: InstallType) -> Self {
        Self {
            archive,
            target,
            install_type,
            uploads_overrides: HashMap::new(),
            cached: None,
        }
    }

    /// Record which archived uploads folder feeds the destination uploads
    /// folder for `install_type` (e.g. `.../uploads/sites/3` for a subsite).
    #[must_use]
    pub fn with_uploads_override(mut self, install_type: InstallType, uploads: impl Into<String>) -> Self {
        self.uploads_overrides.insert(install_type, uploads.into());
        self.cached = None;
        self
    }

    /// The mapping, computed on first use and cached until `reset`.
    pub fn paths_mapping(&mut self, reset: bool) -> RelocateResult<&PathsMapping> {
        let mapping = match self.cached.take() {
            Some(m) if !reset => m,
            _ => self.compute()?,
        };
        Ok(self.cached.insert(mapping))
    }

    /// Destination of the archive entry at `path_in_archive`.
    ///
    /// The entry is resolved against the most specific mapping containing
    /// it. An entry outside every mapping falls back to the destination home.
    pub fn dest_file_from_archive_name(&mut self, path_in_archive: &str) -> RelocateResult<String> {
        let trimmed = path_in_archive.trim_start_matches(['/', '\\']);
        let fallback = safe_path(&self.target.home);

        let mappings = match self.paths_mapping(false)? {
            PathsMapping::Single(dest) => return Ok(join(dest, trimmed)),
            PathsMapping::Multiple(mappings) => mappings,
        };

        let normalized = format!("/{trimmed}");
        for (archive_path, dest) in mappings {
            if let Some(relative) = relative_path(&normalized, archive_path) {
                return Ok(join(dest, &relative));
            }
        }

        warn!(path = path_in_archive, "archive entry outside every path mapping");
        Ok(join(&fallback, trimmed))
    }

    fn compute(&self) -> RelocateResult<PathsMapping> {
        let root = self.archive.target_root();
        let old = &self.archive.paths;
        let new = &self.target;
        let rel = |path: &str| self.archive.relative(&root, path);

        // (archive path, destination) per root, most general first.
        let mut roots: Vec<(String, String)> = vec![(old.home.clone(), new.home.clone())];

        let abs_is_home =
            !old.home.is_empty() && !old.abs.is_empty() && rel(&old.abs) == rel(&old.home);
        if !abs_is_home {
            roots.push((old.abs.clone(), new.abs.clone()));
        } else if safe_path(&new.home) != safe_path(&new.abs) {
            let old_abs = safe_path(&old.abs);
            let new_abs = safe_path(&new.abs);
            for name in core_files::relocatable_core_entries() {
                roots.push((format!("{old_abs}/{name}"), format!("{new_abs}/{name}")));
            }
        }

        roots.push((old.wpcontent.clone(), new.wpcontent.clone()));
        roots.push((old.plugins.clone(), new.plugins.clone()));
        roots.push((old.muplugins.clone(), new.muplugins.clone()));

        match self.install_type {
            InstallType::NotSet => {
                return Err(RelocateError::InstallTypeNotSet(
                    self.install_type.to_string(),
                ));
            }
            t if t.uses_uploads_override() => {
                let source = self
                    .uploads_overrides
                    .get(&t)
                    .ok_or_else(|| RelocateError::MissingUploadsOverride(t.to_string()))?;
                roots.push((source.clone(), new.uploads.clone()));
            }
            _ => roots.push((old.uploads.clone(), new.uploads.clone())),
        }

        let mut mapping: IndexMap<String, String> = IndexMap::new();
        for (source, dest) in roots {
            // A root the archive never recorded would claim the whole archive.
            if source.is_empty() {
                debug!(dest = %dest, "root without archive path skipped");
                continue;
            }
            mapping.insert(rel(&source), safe_path(&dest));
        }

        // An empty destination would relocate files into the server root.
        mapping.retain(|_, dest| !dest.is_empty());

        mapping.sort_by(|a, _, b, _| depth(b).cmp(&depth(a)));
        let mapping = prune_redundant(mapping);

        let mapping: IndexMap<String, String> = mapping
            .into_iter()
            .map(|(key, dest)| {
                let key = if key.starts_with('/') {
                    key
                } else {
                    format!("/{key}")
                };
                (key, dest)
            })
            .collect();

        debug!(mappings = mapping.len(), "archive paths mapping computed");

        match mapping.len() {
            0 => Err(RelocateError::EmptyMapping),
            1 => mapping
                .into_values()
                .next()
                .map(PathsMapping::Single)
                .ok_or(RelocateError::EmptyMapping),
            _ => Ok(PathsMapping::Multiple(mapping)),
        }
    }
}

/// Remove every mapping already covered by another one: `A` is redundant
/// when `A.old` lies inside `B.old` and `A.new` lies inside `B.new` at the
/// same relative position.
fn prune_redundant(mut mapping: IndexMap<String, String>) -> IndexMap<String, String> {
    let mut redundant = Vec::new();

    for (old_a, new_a) in mapping.iter().rev() {
        for (old_b, new_b) in &mapping {
            if old_a == old_b {
                continue;
            }
            let (Some(rel_old), Some(rel_new)) =
                (relative_path(old_a, old_b), relative_path(new_a, new_b))
            else {
                continue;
            };
            if rel_old == rel_new {
                debug!(old = %old_a, covered_by = %old_b, "redundant path mapping pruned");
                redundant.push(old_a.clone());
                break;
            }
        }
    }

    for key in redundant {
        mapping.shift_remove(&key);
    }
    mapping
}

fn join(dest: &str, relative: &str) -> String {
    if relative.is_empty() {
        dest.to_owned()
    } else if dest.ends_with('/') {
        format!("{dest}{relative}")
    } else {
        format!("{dest}/{relative}")
    }
}
