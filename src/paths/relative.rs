//! Path string helpers.
//!
//! Archive paths are handled as `/`-separated strings, not [`std::path::Path`]:
//! they come from another machine and may be Windows paths recorded with
//! backslashes.

/// Normalize separators to `/`, collapse repeated separators and drop a
/// trailing one (see [`untrailingslash`]).
pub fn safe_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_sep = false;
    for ch in path.chars() {
        let ch = if ch == '\\' { '/' } else { ch };
        if ch == '/' {
            if prev_sep {
                continue;
            }
            prev_sep = true;
        } else {
            prev_sep = false;
        }
        out.push(ch);
    }
    untrailingslash(&out)
}

/// Remove trailing `/` and `\` without reducing a root to nothing: `/` stays
/// `/` and `C:\` becomes `C:/`.
pub fn untrailingslash(path: &str) -> String {
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.len() == path.len() {
        return path.to_owned();
    }
    if trimmed.is_empty() {
        return "/".to_owned();
    }
    if is_drive(trimmed) {
        return format!("{trimmed}/");
    }
    trimmed.to_owned()
}

fn is_drive(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// `path` relative to `base`, or `None` when `path` is not `base` or inside
/// it. Equal paths give `""`.
///
/// An empty `base` is the root of a relative tree: every relative `path` is
/// inside it.
pub fn relative_path(path: &str, base: &str) -> Option<String> {
    let path = safe_path(path);
    let base = safe_path(base);

    if base.is_empty() {
        return (!path.starts_with('/')).then_some(path);
    }
    if path == base {
        return Some(String::new());
    }

    let prefix = if base.ends_with('/') {
        base
    } else {
        format!("{base}/")
    };
    path.strip_prefix(&prefix).map(str::to_owned)
}

/// Number of non-empty segments in `path`.
pub fn depth(path: &str) -> usize {
    path.split(['/', '\\']).filter(|s| !s.is_empty()).count()
}

/// Deepest directory containing every non-empty path in `paths`.
pub fn common_root<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    let mut root: Option<Vec<String>> = None;

    for path in paths.into_iter().filter(|p| !p.is_empty()) {
        let normalized = safe_path(path);
        let segments: Vec<String> = normalized.split('/').map(str::to_owned).collect();
        root = Some(match root {
            None => segments,
            Some(current) => current
                .into_iter()
                .zip(segments)
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a)
                .collect(),
        });
    }

    match root {
        Some(segments) if segments.len() == 1 && segments[0].is_empty() => "/".to_owned(),
        Some(segments) => segments.join("/"),
        None => String::new(),
    }
}
