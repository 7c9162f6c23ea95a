//! Atomic file replacement for the file rewrite pass.
//!
//! Rewritten content goes to a [`tempfile::NamedTempFile`] next to the
//! target and is then persisted over it, so an interrupted migration never
//! leaves a half-written `wp-config.php` or `.htaccess` behind.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

/// Replace the contents of `path` with `content` in one rename.
///
/// # Errors
///
/// Fails when `path` has no parent directory, the temporary file cannot be
/// written, or the final rename fails (e.g. across devices).
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("no parent directory for {}", path.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;

    tmp.write_all(content.as_bytes())
        .and_then(|()| tmp.flush())
        .with_context(|| format!("failed to write rewritten content for {}", path.display()))?;

    tmp.persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wp-config.php");
        std::fs::write(&path, "define('WP_HOME', 'http://old.com');").expect("seed");

        atomic_write(&path, "define('WP_HOME', 'https://new.com');").expect("write");

        let content = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(content, "define('WP_HOME', 'https://new.com');");
    }

    #[test]
    fn test_missing_parent_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("file.txt");
        assert!(atomic_write(&path, "x").is_err());
    }
}
