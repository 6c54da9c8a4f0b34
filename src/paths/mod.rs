//! Path and name safety helpers
//!
//! Everything the crawler writes to disk passes through two gates: the
//! basename check in [`is_valid_name`] and the containment check in
//! [`is_within_root`]. Directory-listing servers are not trusted to emit
//! safe names, so both gates run before any filesystem operation.

use std::path::Path;
use url::Url;

/// Checks whether a file or directory name is safe to create locally
///
/// Rejects empty or whitespace-only names and anything containing a
/// traversal sequence or path separator. Deliberately minimal beyond that,
/// so listings of old archives with unusual but harmless names still mirror.
pub fn is_valid_name(name: &str) -> bool {
    if name.trim().is_empty() {
        return false;
    }

    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return false;
    }

    true
}

/// Checks that a resolved local path is still inside the target's root
///
/// Compared component-wise, so `/data/t` does not count as a prefix of
/// `/data/target`.
pub fn is_within_root(root: &Path, candidate: &Path) -> bool {
    candidate.starts_with(root)
}

/// Derives the local filename for a URL fetched as a single file
///
/// Falls back to `index.html` when the URL path is empty, a bare
/// directory, or the root.
pub fn default_file_name(url: &Url) -> String {
    let name = url
        .path_segments()
        .and_then(|segments| segments.last().map(str::to_string))
        .unwrap_or_default();

    if name.is_empty() || name == "." {
        "index.html".to_string()
    } else {
        name
    }
}
