//! Relative-path handling for registry keys and wire payloads.
//!
//! Every path that crosses the wire or keys the watch registry is a
//! `/`-separated path relative to the sync root, with no trailing separator.
//! Paths are heap strings; there is no fixed buffer to overflow or truncate.

/// Error types for relative-path validation.
#[derive(Debug, thiserror::Error)]
pub enum RelPathError {
    /// Path is empty after normalization
    #[error("empty relative path")]
    Empty,

    /// Path is absolute instead of relative to the sync root
    #[error("path is not relative: {0}")]
    NotRelative(String),

    /// Path contains a parent-directory component
    #[error("path contains parent traversal: {0}")]
    ParentTraversal(String),
}

/// Strip trailing `/` separators from a relative path.
///
/// Registry keys and protocol payloads must be comparable, so `dir/` and
/// `dir` have to collapse to the same string.
pub fn normalize(path: &str) -> String {
    path.trim_end_matches('/').to_string()
}

/// Join a base relative path and a child name.
///
/// An empty base names the sync root itself, in which case the child alone
/// is the result.
pub fn join(base: &str, child: &str) -> String {
    if base.is_empty() {
        child.to_string()
    } else {
        format!("{}/{}", base, child)
    }
}

/// Validate a relative path received from a peer before touching the
/// filesystem with it.
///
/// Rejects absolute paths and any `..` component so a corrupted or hostile
/// stream cannot address files outside the sync root. A rejected path is a
/// protocol-level problem; the caller drops the message and continues.
pub fn validate(path: &str) -> Result<(), RelPathError> {
    if path.is_empty() {
        return Err(RelPathError::Empty);
    }
    if path.starts_with('/') {
        return Err(RelPathError::NotRelative(path.to_string()));
    }
    if path.split('/').any(|component| component == "..") {
        return Err(RelPathError::ParentTraversal(path.to_string()));
    }
    Ok(())
}
