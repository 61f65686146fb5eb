//! Opening repositories and pinning them to a branch head.
//!
//! Each step either produces the next handle or fails; nothing here falls
//! back to an empty or default result.

use std::sync::Arc;

use gitdav_store::{CommitInfo, RepositoryStorage, StoreError, StoredRepository, Tree, TreeEntry};
use gitdav_types::RepositoryLocator;

use crate::error::{VfsError, VfsResult};
use crate::node::{DirectoryNode, FileNode, Metadata, VirtualNode};
use crate::path::InternalPath;

/// Opens repositories from the storage collaborator.
#[derive(Clone)]
pub struct SnapshotProvider {
    storage: Arc<dyn RepositoryStorage>,
}

impl SnapshotProvider {
    pub fn new(storage: Arc<dyn RepositoryStorage>) -> Self {
        Self { storage }
    }

    pub fn open_repository(&self, locator: &RepositoryLocator) -> VfsResult<RepositorySource> {
        let repository = self
            .storage
            .open(locator)?
            .ok_or_else(|| VfsError::NotFound(locator.clone()))?;
        Ok(RepositorySource {
            locator: locator.clone(),
            repository,
        })
    }

    /// Pin `source` to the head commit of `branch`.
    pub fn head_snapshot(&self, source: RepositorySource, branch: &str) -> VfsResult<Snapshot> {
        let Some(commit) = source.repository.branch_head(branch)? else {
            return Err(VfsError::RefNotFound {
                locator: source.locator,
                branch: branch.to_string(),
            });
        };
        tracing::debug!(
            repository = %source.locator,
            branch,
            commit = %commit.id.short_hex(),
            "snapshot pinned"
        );
        Ok(Snapshot {
            locator: source.locator,
            commit,
            repository: source.repository,
        })
    }
}

impl std::fmt::Debug for SnapshotProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotProvider").finish_non_exhaustive()
    }
}

/// An opened repository not yet pinned to a commit.
pub struct RepositorySource {
    locator: RepositoryLocator,
    repository: Box<dyn StoredRepository>,
}

/// Where an internal path landed in a snapshot.
#[derive(Clone, Debug)]
pub struct ResolvedEntry {
    pub path: InternalPath,
    pub entry: TreeEntry,
    /// The entry's own listing, present exactly when it is a directory.
    pub children: Option<Tree>,
}

/// A repository pinned to one commit.
pub struct Snapshot {
    locator: RepositoryLocator,
    commit: CommitInfo,
    repository: Box<dyn StoredRepository>,
}

impl Snapshot {
    pub fn commit(&self) -> &CommitInfo {
        &self.commit
    }

    /// Find the entry at `path`. The root resolves to a directory entry
    /// named after the repository.
    pub fn resolve_path(&self, path: &InternalPath) -> VfsResult<ResolvedEntry> {
        let entry = if path.is_root() {
            TreeEntry::directory(self.locator.name.clone(), self.commit.tree_id)
        } else {
            self.repository
                .tree_entry_by_path(&self.commit.tree_id, &path.as_storage_path())?
                .ok_or_else(|| VfsError::PathNotFound(path.to_string()))?
        };
        let children = if entry.is_directory() {
            let tree = self
                .repository
                .read_tree(&entry.object_id)?
                .ok_or(StoreError::MissingObject(entry.object_id))?;
            Some(tree)
        } else {
            None
        };
        Ok(ResolvedEntry {
            path: path.clone(),
            entry,
            children,
        })
    }

    /// Resolve `path` and turn the result into a node that owns this snapshot's
    /// repository handle.
    pub fn open_node(self, path: &InternalPath) -> VfsResult<VirtualNode> {
        let resolved = self.resolve_path(path)?;
        let mod_time = self.commit.time;
        let metadata = Metadata::from_entry(&resolved.entry, mod_time);
        let display = resolved.path.to_string();
        let node = match resolved.children {
            Some(tree) => {
                let children = tree
                    .entries
                    .iter()
                    .map(|child| Metadata::from_entry(child, mod_time))
                    .collect();
                VirtualNode::Directory(DirectoryNode::new(display, metadata, children))
            }
            None => VirtualNode::File(FileNode::new(display, metadata, self.repository)),
        };
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gitdav_store::InMemoryRepositoryStorage;

    fn provider() -> SnapshotProvider {
        let storage = InMemoryRepositoryStorage::new();
        let repo = storage.create(&RepositoryLocator::new("org", "repo"));
        repo.commit_files(
            "master",
            &[("a.txt", "hello"), ("sub/b.txt", "bee"), ("sub/deep/c.txt", "sea")],
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            "initial",
        )
        .unwrap();
        storage.create(&RepositoryLocator::new("org", "empty"));
        SnapshotProvider::new(Arc::new(storage))
    }

    fn snapshot() -> Snapshot {
        let p = provider();
        let source = p.open_repository(&RepositoryLocator::new("org", "repo")).unwrap();
        p.head_snapshot(source, "master").unwrap()
    }

    fn path(s: &str) -> InternalPath {
        s.split('/')
            .filter(|s| !s.is_empty())
            .fold(InternalPath::root(), |p, seg| p.join(seg))
    }

    #[test]
    fn missing_repository() {
        let err = provider()
            .open_repository(&RepositoryLocator::new("org", "nope"))
            .err()
            .unwrap();
        assert!(matches!(err, VfsError::NotFound(_)));
    }

    #[test]
    fn branch_without_commit() {
        let p = provider();
        let source = p.open_repository(&RepositoryLocator::new("org", "empty")).unwrap();
        assert!(matches!(
            p.head_snapshot(source, "master"),
            Err(VfsError::RefNotFound { .. })
        ));
        let source = p.open_repository(&RepositoryLocator::new("org", "repo")).unwrap();
        assert!(matches!(
            p.head_snapshot(source, "develop"),
            Err(VfsError::RefNotFound { .. })
        ));
    }

    #[test]
    fn root_resolves_to_named_directory() {
        let snap = snapshot();
        let root = snap.resolve_path(&InternalPath::root()).unwrap();
        assert_eq!(root.entry.name, "repo");
        assert!(root.entry.is_directory());
        let names: Vec<_> = root.children.unwrap().entries.into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["a.txt", "sub"]);
    }

    #[test]
    fn nested_paths() {
        let snap = snapshot();
        let file = snap.resolve_path(&path("sub/deep/c.txt")).unwrap();
        assert!(!file.entry.is_directory());
        assert_eq!(file.entry.size, 3);
        assert!(file.children.is_none());

        let dir = snap.resolve_path(&path("sub/deep")).unwrap();
        assert_eq!(dir.children.unwrap().len(), 1);
    }

    #[test]
    fn absent_paths() {
        let snap = snapshot();
        for p in ["missing", "sub/missing", "a.txt/below"] {
            assert!(
                matches!(snap.resolve_path(&path(p)), Err(VfsError::PathNotFound(_))),
                "{p}"
            );
        }
    }

    #[test]
    fn open_node_stamps_commit_time() {
        let snap = snapshot();
        let commit_time = snap.commit().time;
        let node = snap.open_node(&path("sub")).unwrap();
        assert!(node.is_directory());
        assert_eq!(node.stat().mod_time, commit_time);
        assert_eq!(node.path(), "/sub");
    }
}
