//! Cross-platform path utilities
//!
//! Windows paths use backslashes (`\`) while reference map keys use forward
//! slashes (`/`). These utilities ensure consistent path normalization
//! across platforms, plus the filename sanitization contract used by the
//! tree projector.

use std::path::Path;

/// Normalize path to forward slashes
#[inline]
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Convert a Path to a normalized string
#[inline]
pub fn path_to_string(path: &Path) -> String {
    normalize_path(&path.to_string_lossy())
}

/// Sanitize an instance name for use as a file or directory name
///
/// Characters that are illegal in file paths map to `_`, trailing dots and
/// spaces are trimmed, and a name that sanitizes to nothing becomes
/// `"unnamed"`.
pub fn sanitize_filename(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = mapped.trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}
