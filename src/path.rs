//! Slash-delimited store paths.
//!
//! Store paths are plain strings such as `/sites/team/Shared Documents/2023`.
//! They are never edited in place: every helper returns a new `String`.

use crate::error::StoreError;

pub const SEPARATOR: char = '/';

/// Join a parent path and a single child name.
pub fn compose(parent: &str, name: &str) -> String {
    if parent.ends_with(SEPARATOR) {
        format!("{}{}", parent, name)
    } else {
        format!("{}{}{}", parent, SEPARATOR, name)
    }
}

/// Drop the last segment of a path. `"/root"` becomes `""`.
pub fn parent(path: &str) -> String {
    match path.rfind(SEPARATOR) {
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}

/// Last segment of a path.
pub fn name(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Join a base path with a stack of child segments.
pub fn join_segments(base: &str, segments: &[String]) -> String {
    segments
        .iter()
        .fold(base.to_string(), |acc, segment| compose(&acc, segment))
}

/// Trim whitespace and trailing separators, collapse repeated separators.
///
/// A lone `/` is kept as is so the store root stays addressable.
pub fn normalize(input: &str) -> String {
    let trimmed = input.trim();
    let leading = trimmed.starts_with(SEPARATOR);
    let joined = trimmed
        .split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    match (leading, joined.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", joined),
        (false, _) => joined,
    }
}

/// A child name must stay inside its parent.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(SEPARATOR) {
        return Err(StoreError::InvalidPath(name.to_string()));
    }
    Ok(())
}

/// True when `path` equals `ancestor` or lies beneath it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    path == ancestor
        || path
            .strip_prefix(ancestor)
            .map_or(false, |rest| rest.starts_with(SEPARATOR) || ancestor.ends_with(SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_and_parent_are_inverse() {
        let child = compose("/sites/hr/Docs", "2023");
        assert_eq!(child, "/sites/hr/Docs/2023");
        assert_eq!(parent(&child), "/sites/hr/Docs");
        assert_eq!(name(&child), "2023");
    }

    #[test]
    fn parent_of_top_level_is_empty() {
        assert_eq!(parent("/root"), "");
        assert_eq!(parent("root"), "");
    }

    #[test]
    fn compose_does_not_double_separator() {
        assert_eq!(compose("/", "a"), "/a");
    }

    #[test]
    fn join_segments_builds_nested_path() {
        let segments = vec!["a".to_string(), "b".to_string()];
        assert_eq!(join_segments("/root", &segments), "/root/a/b");
        assert_eq!(join_segments("/root", &[]), "/root");
    }

    #[test]
    fn normalize_strips_noise() {
        assert_eq!(normalize("  /sites//hr/Docs/ "), "/sites/hr/Docs");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("a/b/"), "a/b");
    }

    #[test]
    fn validate_name_rejects_escapes() {
        assert!(validate_name("Reports").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
    }

    #[test]
    fn is_within_respects_segment_boundaries() {
        assert!(is_within("/root/a", "/root"));
        assert!(is_within("/root", "/root"));
        assert!(!is_within("/rootless", "/root"));
        assert!(is_within("/a", "/"));
    }
}
