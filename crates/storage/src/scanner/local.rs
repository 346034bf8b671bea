//! Local filesystem scanner.
//!
//! Reads directories with `tokio::fs`, so every `read_dir`/`metadata` call is
//! a suspension point and other listings can progress in the meantime.

use crate::error::{ErrorKind, Result};
use crate::models::{EntryType, ListingEntry};
use crate::{Extensions, Scanner};
use async_trait::async_trait;
use std::fs::Metadata;
use std::path::Path;
use time::OffsetDateTime;
use tokio::fs::{self, DirEntry};
use tracing::instrument;

/// Scans directories on the local filesystem.
///
/// # Examples
///
/// ```no_run
/// use comicglass_storage::{Extensions, LocalScanner, Scanner};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let scanner = LocalScanner::new(Extensions::default());
/// for entry in scanner.scan(Path::new("/srv/library/books")).await? {
///     println!("{} ({} bytes)", entry.name, entry.size);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct LocalScanner {
    extensions: Extensions,
}
impl LocalScanner {
    pub fn new(extensions: Extensions) -> Self {
        Self { extensions }
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn modified_of(metadata: &Metadata, path: &Path) -> Result<OffsetDateTime> {
        Ok(metadata.modified().map_err(|e| ErrorKind::from_io(e, path))?.into())
    }

    /// Turns one enumerated child into a listing entry, or `None` when it
    /// should not be listed.
    async fn process_entry(&self, dir: &Path, entry: DirEntry) -> Result<Option<ListingEntry>> {
        let path = entry.path();
        // `DirEntry::metadata` does not traverse symlinks.
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            // Deleted between enumeration and stat. The directory itself still
            // exists, so this child simply isn't part of the listing anymore.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::trace!(path = %path.display(), "Entry vanished during scan; skipping");
                return Ok(None);
            },
            Err(e) => exn::bail!(ErrorKind::from_io(e, &path)),
        };
        let entry_type = if metadata.is_dir() {
            EntryType::Dir
        } else if metadata.is_file() {
            EntryType::File
        } else {
            // Symlinks, sockets, devices, FIFOs...
            return Ok(None);
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry_type == EntryType::File && !self.extensions.allows(&name) {
            return Ok(None);
        }
        let modified = Self::modified_of(&metadata, &path)?;
        Ok(Some(ListingEntry::new(dir, name, modified, metadata.len(), entry_type)))
    }
}

#[async_trait]
impl Scanner for LocalScanner {
    async fn modified(&self, dir: &Path) -> Result<OffsetDateTime> {
        let metadata = fs::metadata(dir).await.map_err(|e| ErrorKind::from_io(e, dir))?;
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::NotFound(dir.to_path_buf()));
        }
        Self::modified_of(&metadata, dir)
    }

    #[instrument(skip_all, fields(dir = %dir.display()))]
    async fn scan(&self, dir: &Path) -> Result<Vec<ListingEntry>> {
        let mut entries = fs::read_dir(dir).await.map_err(|e| ErrorKind::from_io(e, dir))?;
        let mut listing = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| ErrorKind::from_io(e, dir))? {
            if let Some(entry) = self.process_entry(dir, entry).await? {
                listing.push(entry);
            }
        }
        tracing::debug!(entries = listing.len(), "Directory scanned");
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write(root: &Path, relative: &str, data: &[u8]) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, data).unwrap();
        path
    }

    fn names(entries: &[ListingEntry]) -> Vec<&str> {
        let mut names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_scan_empty_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let scanner = LocalScanner::default();
        assert!(scanner.scan(temp_dir.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_filters_extensions() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), "x.jpg", b"jpg");
        write(temp_dir.path(), "x.txt", b"txt");
        // Substring match on the extension is intentional: `jpgx` contains `jpg`.
        write(temp_dir.path(), "x.jpgx", b"jpgx");
        write(temp_dir.path(), "README", b"none");
        let entries = LocalScanner::default().scan(temp_dir.path()).await.unwrap();
        assert_eq!(names(&entries), vec!["x.jpg", "x.jpgx"]);
    }

    #[tokio::test]
    async fn test_scan_keeps_directories_regardless_of_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp_dir.path().join("notes.txt")).unwrap();
        std::fs::create_dir(temp_dir.path().join("Series")).unwrap();
        let entries = LocalScanner::default().scan(temp_dir.path()).await.unwrap();
        assert_eq!(names(&entries), vec!["Series", "notes.txt"]);
        assert!(entries.iter().all(ListingEntry::is_dir));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_drops_symlinks() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target = write(temp_dir.path(), "real.cbz", b"data");
        std::os::unix::fs::symlink(&target, temp_dir.path().join("link.cbz")).unwrap();
        std::os::unix::fs::symlink(temp_dir.path(), temp_dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("missing"), temp_dir.path().join("broken.cbz")).unwrap();
        let entries = LocalScanner::default().scan(temp_dir.path()).await.unwrap();
        assert_eq!(names(&entries), vec!["real.cbz"]);
    }

    #[tokio::test]
    async fn test_scan_entry_metadata() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write(temp_dir.path(), "A.cbz", b"0123456789");
        let expected_mtime = OffsetDateTime::from(std::fs::metadata(&path).unwrap().modified().unwrap());
        let entries = LocalScanner::default().scan(temp_dir.path()).await.unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.name, "A.cbz");
        assert_eq!(entry.path, path);
        assert_eq!(entry.size, 10);
        assert_eq!(entry.entry_type, EntryType::File);
        assert_eq!(entry.modify_time, expected_mtime.unix_timestamp());
    }

    #[tokio::test]
    async fn test_scan_is_not_recursive() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), "Series/Vol 1.cbz", b"data");
        let entries = LocalScanner::default().scan(temp_dir.path()).await.unwrap();
        assert_eq!(names(&entries), vec!["Series"]);
    }

    #[tokio::test]
    async fn test_scan_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing");
        let err = LocalScanner::default().scan(&missing).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(p) if *p == missing));
    }

    #[tokio::test]
    async fn test_modified_of_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let expected = OffsetDateTime::from(std::fs::metadata(temp_dir.path()).unwrap().modified().unwrap());
        let modified = LocalScanner::default().modified(temp_dir.path()).await.unwrap();
        assert_eq!(modified, expected);
    }

    #[tokio::test]
    async fn test_modified_rejects_files_and_missing_paths() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = write(temp_dir.path(), "A.cbz", b"data");
        let scanner = LocalScanner::default();
        let err = scanner.modified(&file).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        let err = scanner.modified(&temp_dir.path().join("missing")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }
}
