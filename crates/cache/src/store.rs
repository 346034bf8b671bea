//! The directory listing cache.
//!
//! One [`DirectoryCache`] maps absolute directory paths to the listing that
//! was scanned for them, together with the directory's own mtime at the time.
//! A listing stays valid for exactly as long as that mtime doesn't change.

use crate::error::{ErrorKind, Result};
use crate::stats::{CacheStats, EntryStats};
use comicglass_storage::{Listing, ScannerHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::instrument;

/// When a cache entry was last handed out.
#[derive(Clone, Copy, Debug)]
struct Access {
    /// Logical clock, strictly increasing per store. This is what eviction
    /// orders by; wall clocks can go backwards and are too coarse for ties.
    tick: u64,
    at: OffsetDateTime,
}

#[derive(Debug)]
struct CacheEntry {
    files: Listing,
    /// The directory's own mtime when `files` was scanned.
    source_mtime: OffsetDateTime,
    last_access: Access,
}

#[derive(Debug, Default)]
struct Store {
    entries: HashMap<PathBuf, CacheEntry>,
    clock: u64,
}
impl Store {
    fn next_access(clock: &mut u64) -> Access {
        *clock += 1;
        Access { tick: *clock, at: OffsetDateTime::now_utc() }
    }

    /// Deletes least-recently-accessed entries until the store is back within
    /// `max`. Returns the number of entries evicted.
    ///
    /// Sorting the whole map on every overflow is O(n log n), but it only
    /// happens on inserts past capacity and costs far less than the directory
    /// scan that caused the insert.
    fn evict_if_over_capacity(&mut self, max: NonZeroUsize) -> usize {
        let excess = self.entries.len().saturating_sub(max.get());
        if excess == 0 {
            return 0;
        }
        // Ties are impossible with a logical clock, but ordering by path as
        // well keeps eviction deterministic regardless.
        let mut by_age: Vec<(u64, PathBuf)> =
            self.entries.iter().map(|(path, entry)| (entry.last_access.tick, path.clone())).collect();
        by_age.sort_unstable();
        for (_, path) in by_age.into_iter().take(excess) {
            tracing::trace!(path = %path.display(), "Evicting cache entry");
            self.entries.remove(&path);
        }
        excess
    }
}

/// Caches directory listings, keyed by absolute path and invalidated by the
/// directory's modification time.
///
/// Cheap to share: wrap it in an [`Arc`] and hand clones to both request
/// handlers and the [pre-warm walker](Self::prewarm). All methods take `&self`.
///
/// # Concurrency
/// The store itself sits behind a single mutex that is never held across an
/// `.await`; scanning happens outside of it. Concurrent misses for the *same*
/// directory are coalesced: the first one scans, the others wait for it and
/// then re-check the store instead of scanning again.
///
/// # Examples
///
/// ```no_run
/// use comicglass_cache::DirectoryCache;
/// use comicglass_storage::{Extensions, LocalScanner};
/// use std::num::NonZeroUsize;
/// use std::path::Path;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let scanner = Arc::new(LocalScanner::new(Extensions::default()));
/// let cache = DirectoryCache::new(scanner, NonZeroUsize::new(10_000).unwrap());
/// let listing = cache.get_listing(Path::new("/srv/library/books")).await?;
/// println!("{} entries", listing.len());
/// # Ok(())
/// # }
/// ```
pub struct DirectoryCache {
    scanner: ScannerHandle,
    max_entries: NonZeroUsize,
    store: Mutex<Store>,
    in_flight: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

/// Holds the per-directory scan gate; removes the gate from the in-flight map
/// once nobody else is holding or waiting on it.
struct InFlight<'a> {
    cache: &'a DirectoryCache,
    dir: &'a Path,
    guard: Option<OwnedMutexGuard<()>>,
}
impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        // Release our own reference first, so that the count below only
        // includes the map itself plus anyone still queued on this gate.
        drop(self.guard.take());
        let mut in_flight = self.cache.in_flight.lock();
        if let Some(gate) = in_flight.get(self.dir)
            && Arc::strong_count(gate) == 1
        {
            in_flight.remove(self.dir);
        }
    }
}

impl DirectoryCache {
    pub fn new(scanner: ScannerHandle, max_entries: NonZeroUsize) -> Self {
        Self {
            scanner,
            max_entries,
            store: Mutex::new(Store::default()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_entries(&self) -> NonZeroUsize {
        self.max_entries
    }

    /// Number of directories currently cached.
    pub fn len(&self) -> usize {
        self.store.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `dir` currently has a cache entry (valid or not).
    pub fn contains(&self, dir: impl AsRef<Path>) -> bool {
        self.store.lock().entries.contains_key(dir.as_ref())
    }

    /// Returns the listing for `dir`, scanning it only if the cached copy is
    /// missing or stale.
    ///
    /// 1. The directory is stat-ed for its current mtime.
    /// 2. **Hit**: a cache entry exists whose mtime is *exactly* equal. Any
    ///    difference, including an mtime that went backwards, is a miss. The
    ///    entry's access time is refreshed and the cached listing returned
    ///    (the same allocation, not a copy).
    /// 3. **Miss**: the directory is scanned, the result replaces any previous
    ///    entry wholesale, and the store is trimmed back to capacity.
    ///
    /// A failed scan leaves any previous entry for `dir` untouched.
    ///
    /// Returns [`NotFound`](ErrorKind::NotFound) if `dir` does not exist or
    /// isn't a directory, otherwise [`PermissionDenied`](ErrorKind::PermissionDenied)
    /// or [`Scan`](ErrorKind::Scan) when the filesystem misbehaves.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub async fn get_listing(&self, dir: &Path) -> Result<Listing> {
        let mtime = self.modified(dir).await?;
        if let Some(files) = self.lookup(dir, mtime) {
            return Ok(files);
        }
        let (_in_flight, waited) = self.acquire(dir).await;
        let mtime = match waited {
            // Whoever we waited on has just stored a fresh listing, and the
            // directory may have changed again in the meantime.
            true => {
                let mtime = self.modified(dir).await?;
                if let Some(files) = self.lookup(dir, mtime) {
                    return Ok(files);
                }
                mtime
            },
            false => mtime,
        };
        self.populate(dir, mtime).await
    }

    /// Snapshot of everything in the cache, most recently accessed first.
    pub fn stats(&self) -> CacheStats {
        let store = self.store.lock();
        let mut entries: Vec<_> = store
            .entries
            .iter()
            .map(|(path, entry)| {
                (entry.last_access.tick, EntryStats {
                    path: path.clone(),
                    mtime: entry.source_mtime,
                    last_access: entry.last_access.at,
                    file_count: entry.files.len(),
                })
            })
            .collect();
        entries.sort_unstable_by(|(a, _), (b, _)| b.cmp(a));
        CacheStats {
            size: store.entries.len(),
            max_size: self.max_entries.get(),
            entries: entries.into_iter().map(|(_, stats)| stats).collect(),
        }
    }

    async fn modified(&self, dir: &Path) -> Result<OffsetDateTime> {
        self.scanner.modified(dir).await.map_err(|e| ErrorKind::scanner(e, dir))
    }

    /// Returns the cached listing if it was scanned at exactly `mtime`,
    /// refreshing its access time.
    fn lookup(&self, dir: &Path, mtime: OffsetDateTime) -> Option<Listing> {
        let mut store = self.store.lock();
        let Store { entries, clock } = &mut *store;
        let entry = entries.get_mut(dir)?;
        if entry.source_mtime != mtime {
            tracing::debug!(cached = %entry.source_mtime, current = %mtime, "Cache entry is stale");
            return None;
        }
        entry.last_access = Store::next_access(clock);
        tracing::trace!(entries = entry.files.len(), "Cache hit");
        Some(Arc::clone(&entry.files))
    }

    /// Waits for exclusive rights to scan `dir`. The flag is `true` if another
    /// caller was scanning it first.
    async fn acquire<'a>(&'a self, dir: &'a Path) -> (InFlight<'a>, bool) {
        let gate = Arc::clone(self.in_flight.lock().entry(dir.to_path_buf()).or_default());
        let (guard, waited) = match Arc::clone(&gate).try_lock_owned() {
            Ok(guard) => (guard, false),
            Err(_) => {
                tracing::trace!("Waiting on in-flight scan");
                (gate.lock_owned().await, true)
            },
        };
        (InFlight { cache: self, dir, guard: Some(guard) }, waited)
    }

    /// Scans `dir` and stores the result as having been taken at `mtime`.
    async fn populate(&self, dir: &Path, mtime: OffsetDateTime) -> Result<Listing> {
        tracing::debug!("Cache miss; scanning directory");
        let files: Listing = self.scanner.scan(dir).await.map_err(|e| ErrorKind::scanner(e, dir))?.into();
        let mut store = self.store.lock();
        let last_access = Store::next_access(&mut store.clock);
        let entry = CacheEntry { files: Arc::clone(&files), source_mtime: mtime, last_access };
        if store.entries.insert(dir.to_path_buf(), entry).is_some() {
            tracing::trace!("Replaced stale cache entry");
        }
        let evicted = store.evict_if_over_capacity(self.max_entries);
        if evicted > 0 {
            tracing::debug!(evicted, size = store.entries.len(), "Cache over capacity; evicted least recently used");
        }
        Ok(files)
    }
}
