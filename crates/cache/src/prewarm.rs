use crate::DirectoryCache;
use async_stream::stream;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::instrument;

/// Default number of directory listings a pre-warm pass keeps in flight.
pub const DEFAULT_PREWARM_CONCURRENCY: NonZeroUsize = NonZeroUsize::new(16).unwrap();

/// Progress events emitted by [`DirectoryCache::prewarm_stream`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once.
/// 2. [`Cached`](Self::Cached), [`Skipped`](Self::Skipped) or
///    [`Failed`](Self::Failed): once per directory visited, in completion
///    order.
/// 3. [`Complete`](Self::Complete): exactly once, signalling the stream is
///    finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrewarmEvent {
    Started,
    /// The directory is now cached, with this many listed entries.
    Cached { path: PathBuf, entries: usize },
    /// The directory vanished or can't be read; its subtree is not visited.
    Skipped { path: PathBuf },
    /// Any other failure. Its subtree is abandoned, siblings continue.
    Failed { path: PathBuf },
    Complete { directories: usize, elapsed: Duration },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrewarmSummary {
    /// Directories successfully cached.
    pub directories: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl DirectoryCache {
    /// Walks `root` and every directory below it, populating the cache as it
    /// goes. See [`prewarm_stream`](Self::prewarm_stream) for the details.
    ///
    /// Never fails: problems with individual subtrees are logged and counted.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub async fn prewarm(&self, root: &Path, concurrency: NonZeroUsize) -> PrewarmSummary {
        tracing::info!("Creating initial cache");
        let mut summary = PrewarmSummary::default();
        let mut events = std::pin::pin!(self.prewarm_stream(root, concurrency));
        while let Some(event) = events.next().await {
            match event {
                PrewarmEvent::Started => {},
                PrewarmEvent::Cached { .. } => {
                    summary.directories += 1;
                    if summary.directories % 1000 == 0 {
                        tracing::info!(directories = summary.directories, "Pre-warming cache");
                    }
                },
                PrewarmEvent::Skipped { .. } => summary.skipped += 1,
                PrewarmEvent::Failed { .. } => summary.failed += 1,
                PrewarmEvent::Complete { elapsed, .. } => summary.elapsed = elapsed,
            }
        }
        tracing::info!(
            directories = summary.directories,
            skipped = summary.skipped,
            failed = summary.failed,
            elapsed_ms = summary.elapsed.as_millis(),
            "Initial cache created",
        );
        if summary.directories > self.max_entries().get() {
            tracing::warn!(
                directories = summary.directories,
                max_entries = self.max_entries().get(),
                "Library has more directories than the cache can hold; increase cache.max_entries",
            );
        }
        summary
    }

    /// Streams [`PrewarmEvent`]s while walking the tree under `root`
    /// breadth-first, calling [`get_listing`](Self::get_listing) on every
    /// directory.
    ///
    /// At most `concurrency` listings are in flight at once. Newly discovered
    /// subdirectories are queued and promoted as in-flight listings complete.
    /// Directories that are already cached and unchanged are not re-scanned,
    /// so running this twice is cheap.
    pub fn prewarm_stream<'a>(
        &'a self,
        root: &'a Path,
        concurrency: NonZeroUsize,
    ) -> impl Stream<Item = PrewarmEvent> + 'a {
        let visit = move |path: PathBuf| async move {
            let result = self.get_listing(&path).await;
            (path, result)
        };
        // `rustfmt` does not format macros that use braces. Wrap in parentheses!
        stream!({
            let started = Instant::now();
            yield PrewarmEvent::Started;

            let mut directories = 0;
            let mut queue = VecDeque::from([root.to_path_buf()]);
            let mut processing = FuturesUnordered::new();
            loop {
                while processing.len() < concurrency.get() {
                    let Some(path) = queue.pop_front() else {
                        break;
                    };
                    processing.push(visit(path));
                }
                let Some((path, result)) = processing.next().await else {
                    break;
                };
                match result {
                    Ok(listing) => {
                        directories += 1;
                        queue.extend(listing.iter().filter(|entry| entry.is_dir()).map(|entry| entry.path.clone()));
                        yield PrewarmEvent::Cached { path, entries: listing.len() };
                    },
                    Err(err) if err.is_skippable() => {
                        tracing::debug!(path = %path.display(), error = ?err, "Skipping subtree");
                        yield PrewarmEvent::Skipped { path };
                    },
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = ?err, "Failed to pre-warm directory");
                        yield PrewarmEvent::Failed { path };
                    },
                }
            }

            yield PrewarmEvent::Complete { directories, elapsed: started.elapsed() };
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comicglass_storage::{LocalScanner, MockScanner};
    use rstest::rstest;
    use std::sync::Arc;
    use time::OffsetDateTime;

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    /// ```text
    /// /library
    /// ├── A.cbz
    /// ├── marvel/
    /// │   ├── X.cbz
    /// │   └── xmen/
    /// └── dc/
    ///     └── batman/
    /// ```
    fn library() -> Arc<MockScanner> {
        let now = OffsetDateTime::now_utc();
        Arc::new(
            MockScanner::default()
                .with_dir("/library", now)
                .with_file("/library/A.cbz", 1, now)
                .with_dir("/library/marvel", now)
                .with_file("/library/marvel/X.cbz", 1, now)
                .with_dir("/library/marvel/xmen", now)
                .with_dir("/library/dc", now)
                .with_dir("/library/dc/batman", now),
        )
    }

    const ALL: [&str; 5] = ["/library", "/library/marvel", "/library/marvel/xmen", "/library/dc", "/library/dc/batman"];

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(16)]
    #[tokio::test]
    async fn test_caches_every_directory(#[case] concurrency: usize) {
        let scanner = library();
        let cache = DirectoryCache::new(scanner.clone(), capacity(100));
        let summary = cache.prewarm(Path::new("/library"), capacity(concurrency)).await;
        assert_eq!(summary.directories, 5);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.failed, 0);
        for dir in ALL {
            assert!(cache.contains(dir), "{dir} should be cached");
            assert_eq!(scanner.scans_of(dir), 1);
        }
    }

    #[tokio::test]
    async fn test_second_pass_does_not_rescan() {
        let scanner = library();
        let cache = DirectoryCache::new(scanner.clone(), capacity(100));
        cache.prewarm(Path::new("/library"), DEFAULT_PREWARM_CONCURRENCY).await;
        let summary = cache.prewarm(Path::new("/library"), DEFAULT_PREWARM_CONCURRENCY).await;
        assert_eq!(summary.directories, 5);
        assert_eq!(scanner.scans(), 5);
    }

    #[tokio::test]
    async fn test_event_order() {
        let cache = DirectoryCache::new(library(), capacity(100));
        let events: Vec<_> = cache.prewarm_stream(Path::new("/library"), capacity(1)).collect().await;
        assert_eq!(events.first(), Some(&PrewarmEvent::Started));
        assert!(matches!(events.last(), Some(PrewarmEvent::Complete { directories: 5, .. })));
        // Breadth-first with one listing in flight: the root comes first, then
        // its children in scan order, then theirs.
        let cached: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                PrewarmEvent::Cached { path, .. } => Some(path.to_str().unwrap()),
                _ => None,
            })
            .collect();
        assert_eq!(cached, vec!["/library", "/library/marvel", "/library/dc", "/library/marvel/xmen", "/library/dc/batman"]);
        assert!(events.contains(&PrewarmEvent::Cached { path: PathBuf::from("/library/marvel"), entries: 2 }));
    }

    #[tokio::test]
    async fn test_denied_subtree_is_skipped() {
        let scanner = library();
        scanner.deny("/library/dc");
        let cache = DirectoryCache::new(scanner.clone(), capacity(100));
        let events: Vec<_> = cache.prewarm_stream(Path::new("/library"), capacity(4)).collect().await;
        assert!(events.contains(&PrewarmEvent::Skipped { path: PathBuf::from("/library/dc") }));
        assert!(!cache.contains("/library/dc"));
        assert!(!cache.contains("/library/dc/batman"));
        assert!(cache.contains("/library/marvel/xmen"));
        assert!(matches!(events.last(), Some(PrewarmEvent::Complete { directories: 3, .. })));
    }

    #[tokio::test]
    async fn test_failed_subtree_is_abandoned_and_siblings_continue() {
        let scanner = library();
        scanner.break_scans("/library/marvel");
        let cache = DirectoryCache::new(scanner.clone(), capacity(100));
        let summary = cache.prewarm(Path::new("/library"), capacity(4)).await;
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.directories, 3);
        assert!(!cache.contains("/library/marvel/xmen"));
        assert!(cache.contains("/library/dc/batman"));
    }

    #[tokio::test]
    async fn test_missing_root_is_skipped() {
        let cache = DirectoryCache::new(library(), capacity(100));
        let summary = cache.prewarm(Path::new("/elsewhere"), DEFAULT_PREWARM_CONCURRENCY).await;
        assert_eq!(summary, PrewarmSummary { skipped: 1, elapsed: summary.elapsed, ..Default::default() });
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_more_directories_than_capacity() {
        let scanner = library();
        let cache = DirectoryCache::new(scanner, capacity(2));
        let summary = cache.prewarm(Path::new("/library"), capacity(1)).await;
        assert_eq!(summary.directories, 5);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_local_tree() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("a/b/c")).unwrap();
        std::fs::create_dir_all(root.join("d")).unwrap();
        std::fs::write(root.join("a/b/Book.cbr"), b"rar").unwrap();
        let cache = DirectoryCache::new(Arc::new(LocalScanner::default()), capacity(100));
        let summary = cache.prewarm(root, DEFAULT_PREWARM_CONCURRENCY).await;
        assert_eq!(summary.directories, 5);
        for dir in ["", "a", "a/b", "a/b/c", "d"] {
            assert!(cache.contains(root.join(dir)), "{dir:?} should be cached");
        }
    }
}
