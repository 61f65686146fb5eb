//! Bare git repositories on disk, read through libgit2.
//!
//! Repositories live at `<root>/<owner>/<name>.git`. Every request opens its
//! own `git2::Repository`; nothing is cached between requests.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use git2::{BranchType, ErrorCode, ObjectType, Oid, Repository};
use gitdav_types::{EntryMode, ObjectId, RepositoryLocator};

use crate::error::{StoreError, StoreResult};
use crate::object::{CommitInfo, Tree, TreeEntry};
use crate::traits::{BlobReader, RepositoryStorage, StoredRepository};

/// Storage over a directory of bare repositories.
#[derive(Clone, Debug)]
pub struct GitRepositoryStorage {
    root: PathBuf,
}

impl GitRepositoryStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of a repository.
    pub fn repository_path(&self, locator: &RepositoryLocator) -> PathBuf {
        self.root
            .join(&locator.owner)
            .join(format!("{}.git", locator.name))
    }
}

impl RepositoryStorage for GitRepositoryStorage {
    fn open(&self, locator: &RepositoryLocator) -> StoreResult<Option<Box<dyn StoredRepository>>> {
        let path = self.repository_path(locator);
        if !path.is_dir() {
            return Ok(None);
        }
        match Repository::open_bare(&path) {
            Ok(repo) => {
                tracing::debug!(path = %path.display(), "opened repository");
                Ok(Some(Box::new(GitRepository { repo })))
            }
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

struct GitRepository {
    repo: Repository,
}

fn to_object_id(oid: Oid) -> StoreResult<ObjectId> {
    Ok(ObjectId::from_slice(oid.as_bytes())?)
}

fn to_oid(id: &ObjectId) -> StoreResult<Oid> {
    Ok(Oid::from_bytes(id.as_bytes())?)
}

/// Map libgit2's NotFound to `None`, propagating every other failure.
fn found<T>(result: Result<T, git2::Error>) -> StoreResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl GitRepository {
    fn convert_entry(&self, name: &str, oid: Oid, filemode: i32) -> StoreResult<Option<TreeEntry>> {
        let mode = EntryMode::from_mode_bits(filemode as u32)?;
        let size = match mode {
            EntryMode::Regular | EntryMode::Executable | EntryMode::Symlink => {
                let (len, kind) = self.repo.odb()?.read_header(oid)?;
                if kind != ObjectType::Blob {
                    return Err(StoreError::CorruptObject {
                        id: to_object_id(oid)?,
                        reason: format!("file entry {name:?} points at a {kind}"),
                    });
                }
                len as u64
            }
            _ => 0,
        };
        let entry = TreeEntry::from_mode(name, mode, to_object_id(oid)?, size);
        if entry.is_none() {
            tracing::debug!(name, "skipping submodule entry");
        }
        Ok(entry)
    }
}

impl StoredRepository for GitRepository {
    fn branch_head(&self, branch: &str) -> StoreResult<Option<CommitInfo>> {
        let Some(branch) = found(self.repo.find_branch(branch, BranchType::Local))? else {
            return Ok(None);
        };
        let commit = branch.get().peel_to_commit()?;
        let id = to_object_id(commit.id())?;
        let seconds = commit.time().seconds();
        let time = DateTime::from_timestamp(seconds, 0).ok_or_else(|| StoreError::CorruptObject {
            id,
            reason: format!("commit time out of range: {seconds}"),
        })?;
        Ok(Some(CommitInfo {
            id,
            tree_id: to_object_id(commit.tree_id())?,
            time,
            summary: commit.summary().unwrap_or_default().to_string(),
        }))
    }

    fn tree_entry_by_path(&self, tree: &ObjectId, path: &str) -> StoreResult<Option<TreeEntry>> {
        let Some(tree) = found(self.repo.find_tree(to_oid(tree)?))? else {
            return Ok(None);
        };
        let Some(entry) = found(tree.get_path(Path::new(path)))? else {
            return Ok(None);
        };
        let name = entry.name().unwrap_or(path.rsplit('/').next().unwrap_or(path));
        self.convert_entry(name, entry.id(), entry.filemode())
    }

    fn read_tree(&self, tree: &ObjectId) -> StoreResult<Option<Tree>> {
        let Some(tree) = found(self.repo.find_tree(to_oid(tree)?))? else {
            return Ok(None);
        };
        let mut entries = Vec::with_capacity(tree.len());
        for entry in tree.iter() {
            let Some(name) = entry.name() else {
                tracing::warn!(id = %entry.id(), "skipping tree entry with non-UTF-8 name");
                continue;
            };
            if let Some(converted) = self.convert_entry(name, entry.id(), entry.filemode())? {
                entries.push(converted);
            }
        }
        Ok(Some(Tree::new(entries)))
    }

    fn open_blob(&self, blob: &ObjectId) -> StoreResult<Option<BlobReader>> {
        let Some(blob) = found(self.repo.find_blob(to_oid(blob)?))? else {
            return Ok(None);
        };
        // libgit2 has no streaming read for packed objects, so the blob is
        // inflated whole. `git2::Blob` borrows the repository, so the content
        // is copied once into an owned buffer; peak memory is twice the blob
        // size until `blob` drops at the end of this call.
        Ok(Some(Box::new(Cursor::new(blob.content().to_vec()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    /// Build `<root>/org/repo.git` with one commit on `master`.
    fn fixture() -> (tempfile::TempDir, GitRepositoryStorage, RepositoryLocator) {
        let dir = tempfile::tempdir().unwrap();
        let storage = GitRepositoryStorage::new(dir.path());
        let locator = RepositoryLocator::new("org", "repo");
        let repo = Repository::init_bare(storage.repository_path(&locator)).unwrap();

        let hello = repo.blob(b"hello").unwrap();
        let script = repo.blob(b"#!/bin/sh\n").unwrap();
        let mut sub = repo.treebuilder(None).unwrap();
        sub.insert("b.txt", repo.blob(b"bee").unwrap(), 0o100644).unwrap();
        sub.insert("run.sh", script, 0o100755).unwrap();
        let sub_id = sub.write().unwrap();

        let mut root = repo.treebuilder(None).unwrap();
        root.insert("a.txt", hello, 0o100644).unwrap();
        root.insert("sub", sub_id, 0o040000).unwrap();
        root.insert("vendored", hello, 0o160000).unwrap();
        let tree = repo.find_tree(root.write().unwrap()).unwrap();

        let sig = git2::Signature::new("Dev", "dev@example.com", &git2::Time::new(1_700_000_000, 0))
            .unwrap();
        repo.commit(Some("refs/heads/master"), &sig, &sig, "initial import", &tree, &[])
            .unwrap();
        (dir, storage, locator)
    }

    #[test]
    fn missing_repository_is_none() {
        let (_dir, storage, _) = fixture();
        assert!(storage
            .open(&RepositoryLocator::new("org", "absent"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn branch_head_uses_commit_time() {
        let (_dir, storage, locator) = fixture();
        let repo = storage.open(&locator).unwrap().unwrap();
        let head = repo.branch_head("master").unwrap().unwrap();
        assert_eq!(head.time.timestamp(), 1_700_000_000);
        assert_eq!(head.summary, "initial import");
        assert!(repo.branch_head("main").unwrap().is_none());
    }

    #[test]
    fn ids_agree_with_in_memory_hashing() {
        let (_dir, storage, locator) = fixture();
        let repo = storage.open(&locator).unwrap().unwrap();
        let root = repo.branch_head("master").unwrap().unwrap().tree_id;
        let entry = repo.tree_entry_by_path(&root, "a.txt").unwrap().unwrap();
        assert_eq!(entry.object_id, ObjectId::hash_object("blob", b"hello"));
        assert_eq!(entry.size, 5);
    }

    #[test]
    fn listing_skips_submodules_and_keeps_modes() {
        let (_dir, storage, locator) = fixture();
        let repo = storage.open(&locator).unwrap().unwrap();
        let root = repo.branch_head("master").unwrap().unwrap().tree_id;

        let top = repo.read_tree(&root).unwrap().unwrap();
        let names: Vec<_> = top.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a.txt", "sub"]);
        assert!(repo.tree_entry_by_path(&root, "vendored").unwrap().is_none());

        let sub = repo.subtree_by_path(&root, "sub").unwrap().unwrap();
        let script = sub.get("run.sh").unwrap();
        assert_eq!(script.mode, EntryMode::Executable);
    }

    #[test]
    fn nested_lookup_and_blob_read() {
        let (_dir, storage, locator) = fixture();
        let repo = storage.open(&locator).unwrap().unwrap();
        let root = repo.branch_head("master").unwrap().unwrap().tree_id;

        let entry = repo.tree_entry_by_path(&root, "sub/b.txt").unwrap().unwrap();
        assert_eq!(entry.name, "b.txt");
        let mut content = String::new();
        repo.open_blob(&entry.object_id)
            .unwrap()
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "bee");

        assert!(repo.tree_entry_by_path(&root, "sub/none").unwrap().is_none());
    }

    #[test]
    fn blob_reader_outlives_repository() {
        let (_dir, storage, locator) = fixture();
        let repo = storage.open(&locator).unwrap().unwrap();
        let head = repo.branch_head("master").unwrap().unwrap();
        let entry = repo.tree_entry_by_path(&head.tree_id, "a.txt").unwrap().unwrap();
        let mut reader = repo.open_blob(&entry.object_id).unwrap().unwrap();
        drop(repo);

        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello");
    }
}
