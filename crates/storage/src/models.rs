//! Listing models.
//!
//! These types represent what a directory scan hands back to the cache, and
//! what the cache hands back to whoever is rendering the listing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;

/// A finished directory scan, shared between the cache and its readers.
///
/// Readers get a clone of the same allocation on every cache hit; treat it as
/// read-only.
pub type Listing = Arc<[ListingEntry]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryType {
    File,
    Dir,
}

/// One child of a scanned directory.
///
/// Constructed fresh on every scan and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Raw file name, as returned by the directory enumeration
    pub name: String,
    /// Absolute path (always `parent.join(name)`)
    pub path: PathBuf,
    /// Seconds since the Unix epoch, floored
    pub modify_time: i64,
    /// Size in bytes; only meaningful for files
    pub size: u64,
    pub entry_type: EntryType,
}
impl ListingEntry {
    pub fn new(
        parent: impl AsRef<Path>,
        name: impl Into<String>,
        modified: OffsetDateTime,
        size: u64,
        entry_type: EntryType,
    ) -> Self {
        let name = name.into();
        Self {
            path: parent.as_ref().join(&name),
            name,
            // `unix_timestamp()` drops the sub-second part, which for pre-epoch
            // times still rounds towards negative infinity.
            modify_time: modified.unix_timestamp(),
            size,
            entry_type,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Dir
    }

    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_path_is_joined_from_parent() {
        let entry = ListingEntry::new("/library/books", "A.cbz", OffsetDateTime::UNIX_EPOCH, 10, EntryType::File);
        assert_eq!(entry.path, Path::new("/library/books/A.cbz"));
        assert_eq!(entry.name, "A.cbz");
        assert!(entry.is_file());
        assert!(!entry.is_dir());
    }

    #[test]
    fn test_modify_time_is_floored() {
        let modified = OffsetDateTime::UNIX_EPOCH + Duration::milliseconds(1_700_000_000_999);
        let entry = ListingEntry::new("/library", "sub", modified, 4096, EntryType::Dir);
        assert_eq!(entry.modify_time, 1_700_000_000);

        let before_epoch = OffsetDateTime::UNIX_EPOCH - Duration::milliseconds(500);
        let entry = ListingEntry::new("/library", "old", before_epoch, 0, EntryType::Dir);
        assert_eq!(entry.modify_time, -1);
    }
}
