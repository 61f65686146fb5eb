use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use gitdav_types::{ObjectId, RepositoryLocator};

use crate::error::{StoreError, StoreResult};
use crate::names::validate_branch_name;
use crate::object::{Blob, CommitInfo, CommitObject, ObjectKind, StoredObject, Tree, TreeEntry};
use crate::traits::{BlobReader, RepositoryStorage, StoredRepository};

/// In-memory repository: a content-addressed object map plus local branches.
///
/// Intended for tests and embedding. The builder methods (`write_*`,
/// `set_branch`, `commit_files`) exist to seed content; the read-only view
/// only ever reaches a repository through [`StoredRepository`].
pub struct MemoryRepository {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
    branches: RwLock<BTreeMap<String, ObjectId>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            branches: RwLock::new(BTreeMap::new()),
        }
    }

    /// Store an object and return its ID. Writing an existing object is a no-op.
    pub fn write_object(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        let mut map = self.objects.write().expect("lock poisoned");
        map.entry(id).or_insert_with(|| object.clone());
        Ok(id)
    }

    pub fn read_object(&self, id: &ObjectId) -> Option<StoredObject> {
        self.objects.read().expect("lock poisoned").get(id).cloned()
    }

    pub fn write_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        self.write_object(&Blob::new(data.to_vec()).to_stored_object())
    }

    pub fn write_tree(&self, entries: Vec<TreeEntry>) -> StoreResult<ObjectId> {
        self.write_object(&Tree::new(entries).to_stored_object()?)
    }

    pub fn write_commit(&self, commit: &CommitObject) -> StoreResult<ObjectId> {
        if self.read_object(&commit.tree).is_none() {
            return Err(StoreError::MissingObject(commit.tree));
        }
        self.write_object(&commit.to_stored_object()?)
    }

    /// Point a branch at a commit, creating the branch if needed.
    pub fn set_branch(&self, name: &str, commit: ObjectId) -> StoreResult<()> {
        validate_branch_name(name)?;
        let object = self
            .read_object(&commit)
            .ok_or(StoreError::MissingObject(commit))?;
        CommitObject::from_stored_object(&object)?;
        self.branches
            .write()
            .expect("lock poisoned")
            .insert(name.to_string(), commit);
        Ok(())
    }

    pub fn branch(&self, name: &str) -> Option<ObjectId> {
        self.branches.read().expect("lock poisoned").get(name).copied()
    }

    /// Commit a complete set of files onto `branch` and return the commit ID.
    ///
    /// `files` are `/`-separated paths; intermediate directories are created
    /// as subtrees. The current branch head, if any, becomes the parent.
    pub fn commit_files<P, D>(
        &self,
        branch: &str,
        files: &[(P, D)],
        time: DateTime<Utc>,
        message: &str,
    ) -> StoreResult<ObjectId>
    where
        P: AsRef<str>,
        D: AsRef<[u8]>,
    {
        let mut root = BTreeMap::new();
        for (path, data) in files {
            insert_path(&mut root, path.as_ref(), data.as_ref())?;
        }
        let tree = self.write_dir(&root)?;
        let commit = self.write_commit(&CommitObject {
            tree,
            parents: self.branch(branch).into_iter().collect(),
            time,
            message: message.to_string(),
        })?;
        self.set_branch(branch, commit)?;
        Ok(commit)
    }

    fn write_dir(&self, dir: &BTreeMap<&str, PendingNode<'_>>) -> StoreResult<ObjectId> {
        let mut entries = Vec::with_capacity(dir.len());
        for (name, node) in dir {
            let entry = match node {
                PendingNode::File(data) => {
                    TreeEntry::file(*name, self.write_blob(data)?, data.len() as u64)
                }
                PendingNode::Dir(children) => TreeEntry::directory(*name, self.write_dir(children)?),
            };
            entries.push(entry);
        }
        self.write_tree(entries)
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Digest of every object ID and branch, for detecting any mutation.
    pub fn fingerprint(&self) -> ObjectId {
        let mut ids: Vec<ObjectId> = self
            .objects
            .read()
            .expect("lock poisoned")
            .keys()
            .copied()
            .collect();
        ids.sort();

        let mut payload = Vec::with_capacity(ids.len() * 20);
        for id in &ids {
            payload.extend_from_slice(id.as_bytes());
        }
        for (name, commit) in self.branches.read().expect("lock poisoned").iter() {
            payload.extend_from_slice(name.as_bytes());
            payload.push(0);
            payload.extend_from_slice(commit.as_bytes());
        }
        ObjectId::hash_object("fingerprint", &payload)
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let branches = self.branches.read().expect("lock poisoned").len();
        f.debug_struct("MemoryRepository")
            .field("object_count", &self.len())
            .field("branch_count", &branches)
            .finish()
    }
}

enum PendingNode<'a> {
    File(&'a [u8]),
    Dir(BTreeMap<&'a str, PendingNode<'a>>),
}

fn insert_path<'a>(
    root: &mut BTreeMap<&'a str, PendingNode<'a>>,
    path: &'a str,
    data: &'a [u8],
) -> StoreResult<()> {
    let invalid = |reason: &str| StoreError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let components: Vec<&str> = path.split('/').collect();
    if components
        .iter()
        .any(|c| c.is_empty() || *c == "." || *c == "..")
    {
        return Err(invalid("empty, '.' or '..' component"));
    }
    let Some((file_name, parents)) = components.split_last() else {
        return Err(invalid("empty path"));
    };

    let mut dir = root;
    for component in parents {
        let node = dir
            .entry(*component)
            .or_insert_with(|| PendingNode::Dir(BTreeMap::new()));
        dir = match node {
            PendingNode::Dir(children) => children,
            PendingNode::File(_) => return Err(invalid("a file is in the way of a directory")),
        };
    }
    if dir.contains_key(file_name) {
        return Err(invalid("duplicate path"));
    }
    dir.insert(*file_name, PendingNode::File(data));
    Ok(())
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// In-memory repository storage keyed by `(owner, name)`.
pub struct InMemoryRepositoryStorage {
    repos: RwLock<HashMap<RepositoryLocator, Arc<MemoryRepository>>>,
}

impl InMemoryRepositoryStorage {
    pub fn new() -> Self {
        Self {
            repos: RwLock::new(HashMap::new()),
        }
    }

    /// Return the repository at `locator`, creating an empty one if needed.
    pub fn create(&self, locator: &RepositoryLocator) -> Arc<MemoryRepository> {
        let mut repos = self.repos.write().expect("lock poisoned");
        Arc::clone(repos.entry(locator.clone()).or_default())
    }

    pub fn get(&self, locator: &RepositoryLocator) -> Option<Arc<MemoryRepository>> {
        self.repos.read().expect("lock poisoned").get(locator).cloned()
    }

    pub fn len(&self) -> usize {
        self.repos.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryRepositoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryRepositoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRepositoryStorage")
            .field("repository_count", &self.len())
            .finish()
    }
}

impl RepositoryStorage for InMemoryRepositoryStorage {
    fn open(&self, locator: &RepositoryLocator) -> StoreResult<Option<Box<dyn StoredRepository>>> {
        Ok(self.get(locator).map(|repo| {
            Box::new(MemoryRepositoryHandle { repo }) as Box<dyn StoredRepository>
        }))
    }
}

struct MemoryRepositoryHandle {
    repo: Arc<MemoryRepository>,
}

impl StoredRepository for MemoryRepositoryHandle {
    fn branch_head(&self, branch: &str) -> StoreResult<Option<CommitInfo>> {
        let Some(id) = self.repo.branch(branch) else {
            return Ok(None);
        };
        let object = self
            .repo
            .read_object(&id)
            .ok_or(StoreError::MissingObject(id))?;
        let commit = CommitObject::from_stored_object(&object)?;
        Ok(Some(CommitInfo {
            id,
            tree_id: commit.tree,
            time: commit.time,
            summary: commit.message.lines().next().unwrap_or_default().to_string(),
        }))
    }

    fn tree_entry_by_path(&self, tree: &ObjectId, path: &str) -> StoreResult<Option<TreeEntry>> {
        let mut current = *tree;
        let mut components = path.split('/').peekable();
        while let Some(component) = components.next() {
            let Some(listing) = self.read_tree(&current)? else {
                return Ok(None);
            };
            let Some(entry) = listing.get(component) else {
                return Ok(None);
            };
            if components.peek().is_none() {
                return Ok(Some(entry.clone()));
            }
            if !entry.is_directory() {
                return Ok(None);
            }
            current = entry.object_id;
        }
        Ok(None)
    }

    fn read_tree(&self, tree: &ObjectId) -> StoreResult<Option<Tree>> {
        match self.repo.read_object(tree) {
            Some(object) => Tree::from_stored_object(&object).map(Some),
            None => Ok(None),
        }
    }

    fn open_blob(&self, blob: &ObjectId) -> StoreResult<Option<BlobReader>> {
        let Some(object) = self.repo.read_object(blob) else {
            return Ok(None);
        };
        if object.kind != ObjectKind::Blob {
            return Err(StoreError::CorruptObject {
                id: *blob,
                reason: format!("expected blob, got {}", object.kind),
            });
        }
        let blob = Blob::from_stored_object(&object)?;
        Ok(Some(Box::new(Cursor::new(blob.data))))
    }
}
