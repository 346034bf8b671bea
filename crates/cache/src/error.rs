//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Scanner failures are kept as children
//! of the cache error, so the original I/O error is still in the tree.

use comicglass_storage::error::{Error as StorageError, ErrorKind as StorageErrorKind};
use derive_more::{Display, Error};
use std::path::{Path, PathBuf};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
///
/// ### Client Errors
/// - [`ErrorKind::NotFound`]
///
/// ### Server Errors
/// - [`ErrorKind::PermissionDenied`]
/// - [`ErrorKind::Scan`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The requested directory does not exist (or is not a directory).
    #[display("path does not exist: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The directory exists but could not be read.
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Any other failure while stat-ing or listing the directory.
    #[display("failed to scan directory: {}", _0.display())]
    Scan(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Scan(_))
    }

    /// Returns `true` if the error was caused by what the client asked for.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` for failures that a pre-warm pass steps around instead
    /// of reporting: the subtree vanished or is off-limits.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::PermissionDenied(_))
    }

    /// Raise a scanner error into a cache error, keeping the scanner's error
    /// tree as a child.
    #[track_caller]
    pub(crate) fn scanner(err: StorageError, dir: &Path) -> Error {
        let kind = match &*err {
            StorageErrorKind::NotFound(_) | StorageErrorKind::InvalidPath(_) => Self::NotFound(dir.to_path_buf()),
            StorageErrorKind::PermissionDenied(_) => Self::PermissionDenied(dir.to_path_buf()),
            StorageErrorKind::Io(_) => Self::Scan(dir.to_path_buf()),
        };
        err.raise(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(StorageErrorKind::NotFound(PathBuf::from("/library/a")), true, true)]
    #[case(StorageErrorKind::InvalidPath(PathBuf::from("/library/a")), true, true)]
    #[case(StorageErrorKind::PermissionDenied(PathBuf::from("/library/a")), false, true)]
    #[case(StorageErrorKind::Io(std::io::Error::other("disk on fire")), false, false)]
    fn test_scanner_error_classification(
        #[case] storage: StorageErrorKind,
        #[case] client_error: bool,
        #[case] skippable: bool,
    ) {
        let err = ErrorKind::scanner(exn::Exn::from(storage), Path::new("/library/a"));
        assert_eq!(err.is_client_error(), client_error);
        assert_eq!(err.is_skippable(), skippable);
    }
}
