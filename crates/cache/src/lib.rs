//! In-memory directory listing cache.
//!
//! Listing a directory with thousands of comics in it is slow; checking its
//! modification time is not. This crate keeps the most recent listing of each
//! directory in memory and only rescans a directory when its own mtime no
//! longer matches the one recorded alongside the cached listing.
//!
//! # Architecture
//! - [`DirectoryCache`] is the cache itself: an explicit object, shared behind
//!   an `Arc`, bounded to a maximum number of directories and evicting the
//!   least recently accessed ones past that.
//! - The [pre-warm walker](DirectoryCache::prewarm) visits the whole library
//!   at startup so that the first requests are already hits.
//! - [`CacheStats`] is a serialisable snapshot for diagnostics.
//!
//! The cache is not the source of truth, the filesystem is. A cache that is
//! thrown away is simply rebuilt on demand.

pub mod error;
mod prewarm;
mod stats;
mod store;

pub use crate::prewarm::{DEFAULT_PREWARM_CONCURRENCY, PrewarmEvent, PrewarmSummary};
pub use crate::stats::{CacheStats, EntryStats};
pub use crate::store::DirectoryCache;
