//! Directory scanning for the comicglass library.
//!
//! Everything the listing cache knows about the filesystem comes through the
//! [`Scanner`] trait: a directory's own mtime (to decide whether a cached
//! listing is still valid) and its immediate children (to build a new one).

pub mod error;
mod extensions;
mod models;
mod path;
mod scanner;

pub use crate::extensions::{DEFAULT_EXTENSIONS, Extensions};
pub use crate::models::{EntryType, Listing, ListingEntry};
pub use crate::path::{normalize as normalize_path, relative_to, resolve as resolve_path};
#[cfg(any(test, feature = "mock"))]
pub use crate::scanner::MockScanner;
pub use crate::scanner::{LocalScanner, Scanner};
use std::sync::Arc;

pub type ScannerHandle = Arc<dyn Scanner + Send + Sync>;
