//! In-memory scanner for testing.

use crate::error::{ErrorKind, Result};
use crate::models::{EntryType, ListingEntry};
use crate::{Extensions, Scanner};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use time::OffsetDateTime;

#[derive(Clone, Debug)]
enum Node {
    Entry(EntryType, u64, OffsetDateTime),
    Symlink,
}

#[derive(Default)]
struct Tree {
    /// Directory mtime, plus its children in insertion order.
    dirs: HashMap<PathBuf, (OffsetDateTime, Vec<(String, Node)>)>,
    denied: HashSet<PathBuf>,
    broken: HashSet<PathBuf>,
    scans: HashMap<PathBuf, usize>,
}

/// In-memory directory tree for testing.
///
/// Nothing happens implicitly: adding or removing children does **not** bump
/// the parent directory's mtime. Call [`touch`](Self::touch) to simulate that,
/// which also makes it possible to test what happens when contents change but
/// the mtime doesn't.
///
/// Every call to [`Scanner::scan`] is counted, see [`scans`](Self::scans).
#[derive(Default)]
pub struct MockScanner {
    extensions: Extensions,
    tree: RwLock<Tree>,
    total_scans: AtomicUsize,
    delay: Option<Duration>,
}

// The panics in here are DELIBERATE. MockScanner is intended to be used in
// tests; if test setup is wrong, then the test should not pass.
impl MockScanner {
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// Make every scan sleep before answering, so that concurrent callers
    /// actually overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_dir(self, path: impl Into<PathBuf>, modified: OffsetDateTime) -> Self {
        self.add_dir(path, modified);
        self
    }

    pub fn with_file(self, path: impl Into<PathBuf>, size: u64, modified: OffsetDateTime) -> Self {
        self.add_file(path, size, modified);
        self
    }

    /// Add an empty directory, listing it in its parent (if the parent exists).
    pub fn add_dir(&self, path: impl Into<PathBuf>, modified: OffsetDateTime) {
        let path = path.into();
        let mut tree = self.tree.write().expect("mock tree lock poisoned");
        Self::attach(&mut tree, &path, Node::Entry(EntryType::Dir, 4096, modified));
        tree.dirs.insert(path, (modified, Vec::new()));
    }

    /// Add a regular file. The parent directory must already exist.
    pub fn add_file(&self, path: impl Into<PathBuf>, size: u64, modified: OffsetDateTime) {
        let path = path.into();
        let mut tree = self.tree.write().expect("mock tree lock poisoned");
        if !Self::attach(&mut tree, &path, Node::Entry(EntryType::File, size, modified)) {
            panic!("MockScanner::add_file: parent of {} does not exist", path.display());
        }
    }

    /// Add a symbolic link. The parent directory must already exist.
    pub fn add_symlink(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut tree = self.tree.write().expect("mock tree lock poisoned");
        if !Self::attach(&mut tree, &path, Node::Symlink) {
            panic!("MockScanner::add_symlink: parent of {} does not exist", path.display());
        }
    }

    /// Remove a file or directory (recursively) from the tree.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut tree = self.tree.write().expect("mock tree lock poisoned");
        tree.dirs.retain(|dir, _| !dir.starts_with(path));
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name())
            && let Some((_, children)) = tree.dirs.get_mut(parent)
        {
            children.retain(|(child, _)| child.as_str() != name.to_string_lossy());
        }
    }

    /// Set a directory's mtime.
    pub fn touch(&self, path: impl AsRef<Path>, modified: OffsetDateTime) {
        let path = path.as_ref();
        let mut tree = self.tree.write().expect("mock tree lock poisoned");
        let Some((mtime, _)) = tree.dirs.get_mut(path) else {
            panic!("MockScanner::touch: {} is not a directory", path.display());
        };
        *mtime = modified;
    }

    /// Refuse access to a directory, as if its permissions changed.
    pub fn deny(&self, path: impl Into<PathBuf>) {
        self.tree.write().expect("mock tree lock poisoned").denied.insert(path.into());
    }

    /// Make scans of a directory fail with an I/O error, while its mtime can
    /// still be read.
    pub fn break_scans(&self, path: impl Into<PathBuf>) {
        self.tree.write().expect("mock tree lock poisoned").broken.insert(path.into());
    }

    /// Total number of times [`Scanner::scan`] has been called.
    pub fn scans(&self) -> usize {
        self.total_scans.load(Ordering::SeqCst)
    }

    /// Number of times [`Scanner::scan`] has been called for `path`.
    pub fn scans_of(&self, path: impl AsRef<Path>) -> usize {
        let tree = self.tree.read().expect("mock tree lock poisoned");
        tree.scans.get(path.as_ref()).copied().unwrap_or(0)
    }

    /// Appends a node to its parent's children (replacing any child with the
    /// same name). Returns `false` if the parent isn't a known directory.
    fn attach(tree: &mut Tree, path: &Path, node: Node) -> bool {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return false;
        };
        let Some((_, children)) = tree.dirs.get_mut(parent) else {
            return false;
        };
        let name = name.to_string_lossy().into_owned();
        children.retain(|(child, _)| *child != name);
        children.push((name, node));
        true
    }

    fn check_access(tree: &Tree, dir: &Path) -> Result<()> {
        if tree.denied.contains(dir) {
            exn::bail!(ErrorKind::PermissionDenied(dir.to_path_buf()));
        }
        Ok(())
    }
}

#[async_trait]
impl Scanner for MockScanner {
    async fn modified(&self, dir: &Path) -> Result<OffsetDateTime> {
        let tree = self.tree.read().expect("mock tree lock poisoned");
        Self::check_access(&tree, dir)?;
        match tree.dirs.get(dir) {
            Some((modified, _)) => Ok(*modified),
            None => exn::bail!(ErrorKind::NotFound(dir.to_path_buf())),
        }
    }

    async fn scan(&self, dir: &Path) -> Result<Vec<ListingEntry>> {
        self.total_scans.fetch_add(1, Ordering::SeqCst);
        {
            let mut tree = self.tree.write().expect("mock tree lock poisoned");
            *tree.scans.entry(dir.to_path_buf()).or_default() += 1;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        // Snapshot under the lock after the delay, so that the result reflects
        // the tree at the time the scan "finished".
        let tree = self.tree.read().expect("mock tree lock poisoned");
        Self::check_access(&tree, dir)?;
        if tree.broken.contains(dir) {
            exn::bail!(ErrorKind::Io(std::io::Error::other("injected scan failure")));
        }
        let Some((_, children)) = tree.dirs.get(dir) else {
            exn::bail!(ErrorKind::NotFound(dir.to_path_buf()));
        };
        Ok(children
            .iter()
            .filter_map(|(name, node)| match node {
                Node::Entry(EntryType::File, _, _) if !self.extensions.allows(name) => None,
                Node::Entry(entry_type, size, modified) => {
                    Some(ListingEntry::new(dir, name.clone(), *modified, *size, *entry_type))
                },
                Node::Symlink => None,
            })
            .collect())
    }
}
