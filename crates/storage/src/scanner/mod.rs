//! Directory scanner trait and implementations.
//!
//! This module defines the `Scanner` trait: the only thing the listing cache
//! needs from the filesystem. One call to find out whether a directory changed,
//! one call to list it.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::local::LocalScanner;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockScanner;
use crate::error::Result;
use crate::models::ListingEntry;
use async_trait::async_trait;
use std::path::Path;
use time::OffsetDateTime;

/// Lists the immediate children of a directory.
///
/// All paths handed to a scanner are absolute and have already been resolved
/// inside the library root (see [`resolve_path`](crate::resolve_path)).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use comicglass_storage::{Scanner, error::Result};
///
/// async fn count_books(scanner: &dyn Scanner, dir: &Path) -> Result<usize> {
///     let entries = scanner.scan(dir).await?;
///     Ok(entries.iter().filter(|entry| entry.is_file()).count())
/// }
/// ```
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Modification time of the directory itself, at full platform precision.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the path
    /// does not exist, or exists but is not a directory.
    async fn modified(&self, dir: &Path) -> Result<OffsetDateTime>;

    /// List the immediate children of `dir` (no recursion).
    ///
    /// # Notes
    /// - Only regular files and directories are returned. Symlinks are never
    ///   followed and, along with devices, sockets and FIFOs, never returned.
    /// - Files are only returned when their extension passes the scanner's
    ///   [`Extensions`](crate::Extensions) allow-list.
    /// - Order is whatever the underlying enumeration yields. Stable within a
    ///   single scan, not guaranteed across scans.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the
    /// directory does not exist at scan time.
    async fn scan(&self, dir: &Path) -> Result<Vec<ListingEntry>>;
}
