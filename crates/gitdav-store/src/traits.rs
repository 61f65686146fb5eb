use std::io::Read;

use gitdav_types::{ObjectId, RepositoryLocator};

use crate::error::StoreResult;
use crate::object::{CommitInfo, Tree, TreeEntry};

/// Sequential byte stream over one blob's content.
///
/// Dropping the reader releases whatever storage handle backs it.
pub type BlobReader = Box<dyn Read + Send>;

/// Locates repositories by owner and name.
///
/// Implementations must be thread-safe: one storage instance serves every
/// request, while each request gets its own [`StoredRepository`] handle.
pub trait RepositoryStorage: Send + Sync {
    /// Open a repository.
    ///
    /// Returns `Ok(None)` if no such repository exists.
    fn open(&self, locator: &RepositoryLocator) -> StoreResult<Option<Box<dyn StoredRepository>>>;
}

/// Read-only handle on one opened repository.
///
/// A handle is owned by a single request and released when dropped. Every
/// lookup reports absence as `Ok(None)` and reserves `Err` for I/O failure or
/// corruption.
pub trait StoredRepository: Send {
    /// Resolve a local branch to its head commit.
    fn branch_head(&self, branch: &str) -> StoreResult<Option<CommitInfo>>;

    /// Find the entry at a `/`-separated path below `tree`.
    ///
    /// `path` is non-empty and holds no `.` or `..` components.
    fn tree_entry_by_path(&self, tree: &ObjectId, path: &str) -> StoreResult<Option<TreeEntry>>;

    /// Read a tree object.
    fn read_tree(&self, tree: &ObjectId) -> StoreResult<Option<Tree>>;

    /// Open a blob for sequential reading.
    fn open_blob(&self, blob: &ObjectId) -> StoreResult<Option<BlobReader>>;

    /// Read the tree found at `path` below `tree`. An empty path is `tree`
    /// itself; a path naming a file yields `Ok(None)`.
    fn subtree_by_path(&self, tree: &ObjectId, path: &str) -> StoreResult<Option<Tree>> {
        if path.is_empty() {
            return self.read_tree(tree);
        }
        match self.tree_entry_by_path(tree, path)? {
            Some(entry) if entry.is_directory() => self.read_tree(&entry.object_id),
            _ => Ok(None),
        }
    }
}
