//! File rewrite pass: apply the pairs of one registry scope to every text
//! file of an extracted site.
//!
//! Files are selected with globset include patterns relative to the root.
//! Hidden directories are skipped, symlinks are never followed, binary files
//! (a NUL byte in the first 8 KiB) and non-UTF-8 files are left alone.
//! Changed files are replaced atomically, or rendered as unified diffs in
//! dry-run mode. A file whose patterns abort while matching is left
//! untouched and listed in the report.

use std::io::Read as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};

use crate::diff::unified_diff;
use crate::replace::{PairSet, RuleRegistry};
use crate::util::atomic::atomic_write;

/// Max bytes inspected for binary detection.
const BINARY_CHECK_BYTES: usize = 8192;

/// Maximum recursion depth of the tree walk.
const MAX_WALK_DEPTH: usize = 50;

/// Scope name used for file rewrites when none is given.
pub const DEFAULT_FILES_SCOPE: &str = "files";

/// Settings of one file rewrite pass.
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    /// Root of the extracted site.
    pub root: PathBuf,
    /// Registry scope whose pairs are applied.
    pub scope: String,
    /// Glob patterns (relative to `root`) selecting the files to rewrite.
    pub include: Vec<String>,
    /// Render diffs instead of writing files.
    pub dry_run: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            scope: DEFAULT_FILES_SCOPE.to_owned(),
            include: vec!["**/*".to_owned()],
            dry_run: false,
        }
    }
}

/// Outcome of a rewrite pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RewriteReport {
    pub files_scanned: usize,
    pub files_changed: usize,
    pub replacements: usize,
    /// Unified diffs of changed files (dry run only).
    pub diffs: Vec<String>,
    /// Files left untouched because a pattern aborted while matching.
    pub aborted: Vec<PathBuf>,
}

/// Rewrite every selected file under `config.root` with the pairs of
/// `config.scope` in `registry`.
///
/// # Errors
///
/// Fails on an invalid generated pattern, an invalid include pattern, an
/// unreadable directory, or a file that cannot be read or replaced.
pub fn rewrite_tree(config: &RewriteConfig, registry: &RuleRegistry) -> Result<RewriteReport> {
    let pairs = PairSet::compile(&registry.pairs_for(Some(&config.scope)))
        .with_context(|| format!("failed to compile pairs for scope {}", config.scope))?;
    rewrite_files(config, &pairs)
}

/// Rewrite every selected file under `config.root` with `pairs`.
///
/// `config.scope` is not consulted.
pub fn rewrite_files(config: &RewriteConfig, pairs: &PairSet) -> Result<RewriteReport> {
    let include = build_globset(&config.include)?;

    let mut files = Vec::new();
    collect_files(&config.root, &config.root, &include, &mut files, 0)?;
    files.sort();

    let mut report = RewriteReport::default();
    for relative in files {
        let path = config.root.join(&relative);
        report.files_scanned += 1;

        let Some(original) = read_text(&path)? else {
            debug!(path = %path.display(), "binary or non-UTF-8 file skipped");
            continue;
        };

        let (rewritten, count) = match pairs.apply(&original) {
            Ok(result) => result,
            Err(e) => {
                warn!(path = %relative.display(), error = %e, "file left unchanged");
                report.aborted.push(relative);
                continue;
            }
        };
        if count == 0 || rewritten == original {
            continue;
        }

        report.files_changed += 1;
        report.replacements += count;

        if config.dry_run {
            report.diffs.push(unified_diff(&relative, &original, &rewritten));
        } else {
            atomic_write(&path, &rewritten)?;
        }
        debug!(path = %relative.display(), replacements = count, "file rewritten");
    }

    info!(
        root = %config.root.display(),
        scanned = report.files_scanned,
        changed = report.files_changed,
        replacements = report.replacements,
        aborted = report.aborted.len(),
        dry_run = config.dry_run,
        "file rewrite pass finished"
    );
    Ok(report)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;
        builder.add(glob);
    }
    builder.build().context("failed to build include globset")
}

/// Read `path` as text, or `None` for binary and non-UTF-8 files.
fn read_text(path: &Path) -> Result<Option<String>> {
    let mut file =
        std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut head = vec![0u8; BINARY_CHECK_BYTES];
    let n = file
        .by_ref()
        .take(BINARY_CHECK_BYTES as u64)
        .read(&mut head)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if head[..n].contains(&0) {
        return Ok(None);
    }

    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(String::from_utf8(bytes).ok())
}

/// Collect files under `dir` whose path relative to `root` matches `include`.
fn collect_files(
    root: &Path,
    dir: &Path,
    include: &GlobSet,
    files: &mut Vec<PathBuf>,
    depth: usize,
) -> Result<()> {
    if depth > MAX_WALK_DEPTH {
        return Ok(());
    }

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?;

    for entry in entries {
        let entry = entry.context("failed to read directory entry")?;
        let path = entry.path();

        let is_hidden_dir = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with('.'));

        // file_type() does not follow symlinks.
        let Ok(ft) = entry.file_type() else {
            continue;
        };

        if ft.is_dir() {
            if !is_hidden_dir {
                collect_files(root, &path, include, files, depth + 1)?;
            }
        } else if ft.is_file() {
            if let Ok(relative) = path.strip_prefix(root) {
                if include.is_match(relative) {
                    files.push(relative.to_path_buf());
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replace::{RuleKind, SearchReplacePair};

    fn url_registry() -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        registry.add_item("http://old.com", "https://new.com", RuleKind::Url, 10, true);
        registry.add_item("Old Blog", "New Blog", RuleKind::PlainString, 10, "database");
        registry
    }

    fn seed(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, content).expect("write");
    }

    #[test]
    fn test_rewrites_matching_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path(), "wp-config.php", b"define('WP_HOME','http://old.com');\n");
        seed(dir.path(), ".htaccess", b"RewriteRule . http://old.com/index.php\n");
        seed(dir.path(), "readme.txt", b"nothing here\n");

        let config = RewriteConfig {
            root: dir.path().to_path_buf(),
            ..RewriteConfig::default()
        };
        let report = rewrite_tree(&config, &url_registry()).expect("rewrite");

        assert_eq!(report.files_scanned, 3);
        assert_eq!(report.files_changed, 2);
        assert_eq!(report.replacements, 2);
        assert!(report.diffs.is_empty());

        let config_php = std::fs::read_to_string(dir.path().join("wp-config.php")).expect("read");
        assert_eq!(config_php, "define('WP_HOME','https://new.com');\n");
    }

    #[test]
    fn test_dry_run_leaves_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path(), "a.php", b"http://old.com/x\n");

        let config = RewriteConfig {
            root: dir.path().to_path_buf(),
            dry_run: true,
            ..RewriteConfig::default()
        };
        let report = rewrite_tree(&config, &url_registry()).expect("rewrite");

        assert_eq!(report.files_changed, 1);
        assert_eq!(report.diffs.len(), 1);
        assert!(report.diffs[0].contains("+https://new.com/x"));
        let untouched = std::fs::read_to_string(dir.path().join("a.php")).expect("read");
        assert_eq!(untouched, "http://old.com/x\n");
    }

    #[test]
    fn test_include_patterns_and_binary_skip() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path(), "keep.php", b"http://old.com\n");
        seed(dir.path(), "skip.txt", b"http://old.com\n");
        seed(dir.path(), "image.php", b"http://old.com\0\x01");
        seed(dir.path(), ".git/config.php", b"http://old.com\n");

        let config = RewriteConfig {
            root: dir.path().to_path_buf(),
            include: vec!["**/*.php".to_owned()],
            dry_run: true,
            ..RewriteConfig::default()
        };
        let report = rewrite_tree(&config, &url_registry()).expect("rewrite");

        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.files_changed, 1);
    }

    #[test]
    fn test_invalid_glob() {
        let config = RewriteConfig {
            include: vec!["a[".to_owned()],
            ..RewriteConfig::default()
        };
        assert!(rewrite_tree(&config, &url_registry()).is_err());
    }

    #[test]
    fn test_scope_selects_pairs() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path(), "a.php", b"Old Blog at http://old.com\n");

        let config = RewriteConfig {
            root: dir.path().to_path_buf(),
            scope: "database".to_owned(),
            ..RewriteConfig::default()
        };
        let report = rewrite_tree(&config, &url_registry()).expect("rewrite");
        assert_eq!(report.replacements, 2);

        let config = RewriteConfig {
            root: dir.path().to_path_buf(),
            ..RewriteConfig::default()
        };
        let report = rewrite_tree(&config, &url_registry()).expect("rewrite");
        assert_eq!(report.files_changed, 0);

        let content = std::fs::read_to_string(dir.path().join("a.php")).expect("read");
        assert_eq!(content, "New Blog at https://new.com\n");
    }

    #[test]
    fn test_aborted_match_leaves_file_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path(), "slow.php", b"xxxxxxxxxxy\n");

        let pairs = PairSet::compile_with_backtrack_limit(
            &[SearchReplacePair {
                search: "(x+x+)+(?>y)".to_owned(),
                replace: "z".to_owned(),
            }],
            1,
        )
        .expect("compile");
        let config = RewriteConfig {
            root: dir.path().to_path_buf(),
            ..RewriteConfig::default()
        };
        let report = rewrite_files(&config, &pairs).expect("rewrite");

        assert_eq!(report.aborted, [PathBuf::from("slow.php")]);
        let slow = std::fs::read_to_string(dir.path().join("slow.php")).expect("read");
        assert_eq!(slow, "xxxxxxxxxxy\n");
    }
}
