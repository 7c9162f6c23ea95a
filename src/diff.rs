//! Unified diffs of rewritten files, shown by dry runs.

use std::path::Path;

use similar::{Algorithm, TextDiff};

/// Render the change from `old` to `new` for the file at `path`.
///
/// Uses the Patience algorithm, which keeps unrelated lines of long
/// configuration files out of the hunks.
pub fn unified_diff(path: &Path, old: &str, new: &str) -> String {
    let name = path.display().to_string();
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Patience)
        .diff_lines(old, new);

    diff.unified_diff()
        .context_radius(2)
        .header(&format!("a/{name}"), &format!("b/{name}"))
        .to_string()
}
