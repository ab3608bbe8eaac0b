//! Path and filter utilities

use std::path::{Component, Path};

/// Convert catalog path separators to `/` so Windows-style input compares equal.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Normalized, trimmed filter; `None` when unset or blank.
pub fn normalize_filter(filter: Option<&str>) -> Option<String> {
    filter
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(normalize_separators)
}

/// Plain string-prefix test after separator normalization. Not component-aware: `A/B` matches
/// `A/B2`.
pub fn path_matches_filter(path: &str, normalized_filter: &str) -> bool {
    normalize_separators(path).starts_with(normalized_filter)
}

/// Catalog paths to process, in catalog order. Without a (non-blank) filter every path is kept.
pub fn filter_catalog_paths<'a>(paths: &'a [String], filter: Option<&str>) -> Vec<&'a str> {
    match normalize_filter(filter) {
        None => paths.iter().map(String::as_str).collect(),
        Some(f) => paths
            .iter()
            .map(String::as_str)
            .filter(|p| path_matches_filter(p, &f))
            .collect(),
    }
}

/// True when `path` (either separator) is relative and made only of plain segments: no root,
/// drive prefix, `.` or `..`. Server-supplied catalog paths must pass before being joined to the
/// download root.
pub fn is_safe_relative_path(path: &str) -> bool {
    let normalized = normalize_separators(path);
    !normalized.is_empty()
        && Path::new(&normalized)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        && !normalized.split('/').any(|seg| seg == "." || seg == "..")
}

/// True when `name` is a single plain file name that stays inside its destination directory.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.contains(['/', '\\']) && is_safe_relative_path(name)
}
