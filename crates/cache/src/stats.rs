use serde::Serialize;
use std::path::PathBuf;
use time::OffsetDateTime;

/// Point-in-time view of a [`DirectoryCache`](crate::DirectoryCache), for
/// diagnostics.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    /// Most recently accessed first.
    pub entries: Vec<EntryStats>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryStats {
    pub path: PathBuf,
    /// The directory's mtime when it was scanned.
    #[serde(with = "time::serde::rfc3339")]
    pub mtime: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_access: OffsetDateTime,
    pub file_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_camel_case_with_rfc3339_times() {
        let stats = CacheStats {
            size: 1,
            max_size: 10,
            entries: vec![EntryStats {
                path: PathBuf::from("/library/books"),
                mtime: OffsetDateTime::UNIX_EPOCH,
                last_access: OffsetDateTime::UNIX_EPOCH,
                file_count: 3,
            }],
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["maxSize"], 10);
        assert_eq!(json["entries"][0]["path"], "/library/books");
        assert_eq!(json["entries"][0]["fileCount"], 3);
        assert_eq!(json["entries"][0]["mtime"], "1970-01-01T00:00:00Z");
        assert_eq!(json["entries"][0]["lastAccess"], "1970-01-01T00:00:00Z");
    }
}
