//! Request path resolution.
//!
//! Clients ask for directories relative to the library root (`?path=…`). This
//! module turns those into absolute paths without ever letting them climb out
//! of the root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Normalizes a client-supplied path relative to the library root.
///
/// An empty result means "the root itself".
///
/// > **Note:** This does **not** normalize backslashes, non-UTF8 bytes, or
/// >           platform-specific weirdness. Null bytes are explicitly rejected.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use comicglass_storage::normalize_path;
/// // Valid paths
/// assert_eq!(normalize_path("books/Series").unwrap(), Path::new("books/Series"));
/// assert_eq!(normalize_path("books/../other").unwrap(), Path::new("other"));
/// assert_eq!(normalize_path("./").unwrap(), Path::new(""));
/// // Invalid paths
/// assert!(normalize_path("../etc/passwd").is_err());
/// assert!(normalize_path("books/../../etc").is_err());
/// assert!(normalize_path("a\0b").is_err());
/// ```
pub fn normalize(path: impl AsRef<Path>) -> Result<PathBuf> {
    // Path::components() already collapses `//` and interior `.` segments.
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls; reject them explicitly.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            // A leading slash is still relative to the library root.
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    Ok(components.into_iter().collect())
}

/// Resolves a client-supplied path to an absolute path inside `root`.
///
/// ```
/// use std::path::Path;
/// use comicglass_storage::resolve_path;
///
/// let root = Path::new("/srv/library");
/// assert_eq!(resolve_path(root, "").unwrap(), root);
/// assert_eq!(resolve_path(root, "books/A").unwrap(), Path::new("/srv/library/books/A"));
/// assert!(resolve_path(root, "../secrets").is_err());
/// ```
pub fn resolve(root: impl AsRef<Path>, requested: impl AsRef<Path>) -> Result<PathBuf> {
    let relative = normalize(requested)?;
    match relative.as_os_str().is_empty() {
        true => Ok(root.as_ref().to_path_buf()),
        false => Ok(root.as_ref().join(relative)),
    }
}

/// Inverse of [`resolve`]: the path of `absolute` relative to `root`, or
/// `None` when it does not live under `root`.
pub fn relative_to<'a>(root: impl AsRef<Path>, absolute: &'a Path) -> Option<&'a Path> {
    absolute.strip_prefix(root.as_ref()).ok()
}
