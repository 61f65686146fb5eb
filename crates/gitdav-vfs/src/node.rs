//! File and directory nodes handed to the protocol layer.
//!
//! A node is opened for one request and owns everything it needs: a file
//! node owns the repository handle its blob is streamed from, and a
//! directory node owns its child listing. Dropping the node releases both.

use std::io::{self, Read};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use gitdav_store::{BlobReader, StoreError, StoredRepository, TreeEntry};
use gitdav_types::{EntryMode, ObjectId};

use crate::error::{VfsError, VfsResult};

/// Upper bound on the buffer `read_to_end` reserves from the recorded size.
const PREALLOC_LIMIT: usize = 16 * 1024 * 1024;

/// Stat result for a single entry.
///
/// `mod_time` is the pinned commit's time for every entry of a snapshot.
/// Directories report a `size` of 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
    pub mode: EntryMode,
    pub mod_time: DateTime<Utc>,
    #[serde(serialize_with = "serialize_hex")]
    pub object_id: ObjectId,
}

impl Metadata {
    pub fn from_entry(entry: &TreeEntry, mod_time: DateTime<Utc>) -> Self {
        let is_directory = entry.is_directory();
        Self {
            name: entry.name.clone(),
            is_directory,
            size: if is_directory { 0 } else { entry.size },
            mode: entry.mode,
            mod_time,
            object_id: entry.object_id,
        }
    }
}

fn serialize_hex<S: Serializer>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_hex())
}

enum BlobSource {
    /// Blob not opened yet; holds the repository handle to open it from.
    Pending(Box<dyn StoredRepository>),
    Streaming(BlobReader),
    Exhausted,
}

/// A regular file, symlink, or executable backed by one blob.
pub struct FileNode {
    path: String,
    metadata: Metadata,
    source: BlobSource,
}

impl FileNode {
    pub(crate) fn new(path: String, metadata: Metadata, repository: Box<dyn StoredRepository>) -> Self {
        Self {
            path,
            metadata,
            source: BlobSource::Pending(repository),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Read the next chunk of content. Returns 0 once the blob is exhausted,
    /// and keeps returning 0 on every later call.
    pub fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        loop {
            match &mut self.source {
                BlobSource::Pending(repository) => {
                    let id = self.metadata.object_id;
                    let reader = repository
                        .open_blob(&id)?
                        .ok_or(StoreError::MissingObject(id))?;
                    tracing::debug!(path = %self.path, blob = %id.short_hex(), "blob opened");
                    self.source = BlobSource::Streaming(reader);
                }
                BlobSource::Streaming(reader) => {
                    let n = reader.read(buf)?;
                    if n == 0 && !buf.is_empty() {
                        self.source = BlobSource::Exhausted;
                    }
                    return Ok(n);
                }
                BlobSource::Exhausted => return Ok(0),
            }
        }
    }

    /// Read the remaining content into memory.
    pub fn read_to_end(&mut self) -> VfsResult<Vec<u8>> {
        let hint = usize::try_from(self.metadata.size).unwrap_or(0);
        let mut content = Vec::with_capacity(hint.min(PREALLOC_LIMIT));
        let mut chunk = [0u8; 8192];
        loop {
            let n = self.read(&mut chunk)?;
            if n == 0 {
                return Ok(content);
            }
            content.extend_from_slice(&chunk[..n]);
        }
    }
}

impl Read for FileNode {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        FileNode::read(self, buf).map_err(|err| match err {
            VfsError::Read(io) => io,
            other => io::Error::other(other),
        })
    }
}

impl std::fmt::Debug for FileNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileNode")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// A tree, with its immediate children and a private paging cursor.
#[derive(Debug)]
pub struct DirectoryNode {
    path: String,
    metadata: Metadata,
    children: Vec<Metadata>,
    cursor: usize,
}

impl DirectoryNode {
    pub(crate) fn new(path: String, metadata: Metadata, mut children: Vec<Metadata>) -> Self {
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            path,
            metadata,
            children,
            cursor: 0,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// List children in name order.
    ///
    /// `max_entries <= 0` returns every child and leaves the cursor alone.
    /// A positive value returns up to that many children following the last
    /// one returned by an earlier paged call, and an empty page at the end.
    pub fn list(&mut self, max_entries: i64) -> Vec<Metadata> {
        if max_entries <= 0 {
            return self.children.clone();
        }
        let take = usize::try_from(max_entries).unwrap_or(usize::MAX);
        let end = self.cursor.saturating_add(take).min(self.children.len());
        let page = self.children[self.cursor..end].to_vec();
        self.cursor = end;
        page
    }
}

/// An opened entry: exactly one of file or directory.
#[derive(Debug)]
pub enum VirtualNode {
    File(FileNode),
    Directory(DirectoryNode),
}

impl VirtualNode {
    pub fn stat(&self) -> Metadata {
        self.metadata().clone()
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            Self::File(file) => file.metadata(),
            Self::Directory(dir) => dir.metadata(),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// Internal path the node was opened at, `/`-rooted.
    pub fn path(&self) -> &str {
        match self {
            Self::File(file) => &file.path,
            Self::Directory(dir) => &dir.path,
        }
    }

    pub fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        match self {
            Self::File(file) => file.read(buf),
            Self::Directory(dir) => Err(VfsError::NotABlob(dir.path.clone())),
        }
    }

    pub fn list(&mut self, max_entries: i64) -> VfsResult<Vec<Metadata>> {
        match self {
            Self::Directory(dir) => Ok(dir.list(max_entries)),
            Self::File(file) => Err(VfsError::NotADirectory(file.path.clone())),
        }
    }

    pub fn into_file(self) -> VfsResult<FileNode> {
        match self {
            Self::File(file) => Ok(file),
            Self::Directory(dir) => Err(VfsError::NotABlob(dir.path)),
        }
    }
}
