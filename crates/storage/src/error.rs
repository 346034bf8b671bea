//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::{Path, PathBuf};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Directory does not exist (or exists, but is not a directory)
    #[display("directory not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied while listing or stat-ing
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Path contains invalid characters or escapes the library root
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Returns `true` if the error was caused by what the client asked for,
    /// rather than by the server failing to answer it.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidPath(_))
    }

    pub(crate) fn from_io(e: IoError, path: &Path) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::ErrorKind as IoKind;

    #[rstest]
    #[case(IoKind::NotFound, true)]
    #[case(IoKind::NotADirectory, true)]
    #[case(IoKind::PermissionDenied, false)]
    #[case(IoKind::Other, false)]
    fn test_client_errors(#[case] kind: IoKind, #[case] expected: bool) {
        let err = ErrorKind::from_io(IoError::from(kind), Path::new("/library/books"));
        assert_eq!(err.is_client_error(), expected);
    }

    #[test]
    fn test_permission_denied_keeps_path() {
        let err = ErrorKind::from_io(IoError::from(IoKind::PermissionDenied), Path::new("/library/private"));
        assert!(matches!(err, ErrorKind::PermissionDenied(p) if p == Path::new("/library/private")));
    }
}
