//! The read/write surface a protocol server expects, served read-only.
//!
//! [`VirtualNode`] has no mutating operations at all. [`ReadOnlyFs`] and
//! [`ReadOnlyFile`] fill in the full [`DavFileSystem`] / [`DavFile`]
//! interface by sending every mutating call to [`reject`].

use std::fmt;
use std::io::SeekFrom;

use gitdav_gate::Requester;

use crate::error::{VfsError, VfsResult};
use crate::fs::VirtualFileSystem;
use crate::node::{Metadata, VirtualNode};

/// A mutating operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mutation {
    Write,
    Create,
    Truncate,
    Mkdir,
    Remove,
    Rename,
    Copy,
    SetProperties,
    Lock,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Write => "write",
            Self::Create => "create",
            Self::Truncate => "truncate",
            Self::Mkdir => "mkdir",
            Self::Remove => "remove",
            Self::Rename => "rename",
            Self::Copy => "copy",
            Self::SetProperties => "set-properties",
            Self::Lock => "lock",
        };
        f.write_str(name)
    }
}

/// Answer to every mutation.
pub fn reject<T>(mutation: Mutation) -> VfsResult<T> {
    tracing::debug!(%mutation, "mutation rejected");
    Err(VfsError::ReadOnlyViolation(mutation))
}

/// Flags a protocol server opens a file with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpenOptions {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub create: bool,
    pub truncate: bool,
}

impl OpenOptions {
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// The first mutation these flags ask for, if any.
    pub fn mutation(&self) -> Option<Mutation> {
        if self.create {
            Some(Mutation::Create)
        } else if self.truncate {
            Some(Mutation::Truncate)
        } else if self.write || self.append {
            Some(Mutation::Write)
        } else {
            None
        }
    }
}

/// An open file or directory as a protocol server sees it.
pub trait DavFile: Send {
    fn stat(&self) -> VfsResult<Metadata>;
    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize>;
    fn list(&mut self, max_entries: i64) -> VfsResult<Vec<Metadata>>;
    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64>;
    fn write(&mut self, buf: &[u8]) -> VfsResult<usize>;
    fn mkdir(&mut self, name: &str) -> VfsResult<()>;
    fn remove(&mut self) -> VfsResult<()>;
    fn rename(&mut self, to: &str) -> VfsResult<()>;
}

/// The filesystem surface a protocol server programs against.
pub trait DavFileSystem {
    type File: DavFile;

    fn open_file(&self, path: &str, options: OpenOptions) -> VfsResult<Self::File>;
    fn stat(&self, path: &str) -> VfsResult<Metadata>;
    fn mkdir(&self, path: &str) -> VfsResult<()>;
    fn remove(&self, path: &str) -> VfsResult<()>;
    fn rename(&self, from: &str, to: &str) -> VfsResult<()>;
    fn copy(&self, from: &str, to: &str) -> VfsResult<()>;
    fn set_properties(&self, path: &str) -> VfsResult<()>;
    fn lock(&self, path: &str) -> VfsResult<()>;
}

/// A [`VirtualNode`] behind the full [`DavFile`] interface.
#[derive(Debug)]
pub struct ReadOnlyFile {
    node: VirtualNode,
}

impl ReadOnlyFile {
    pub fn new(node: VirtualNode) -> Self {
        Self { node }
    }
}

impl DavFile for ReadOnlyFile {
    fn stat(&self) -> VfsResult<Metadata> {
        Ok(self.node.stat())
    }

    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        self.node.read(buf)
    }

    fn list(&mut self, max_entries: i64) -> VfsResult<Vec<Metadata>> {
        self.node.list(max_entries)
    }

    fn seek(&mut self, _pos: SeekFrom) -> VfsResult<u64> {
        Err(VfsError::UnsupportedOperation("seek"))
    }

    fn write(&mut self, _buf: &[u8]) -> VfsResult<usize> {
        reject(Mutation::Write)
    }

    fn mkdir(&mut self, _name: &str) -> VfsResult<()> {
        reject(Mutation::Mkdir)
    }

    fn remove(&mut self) -> VfsResult<()> {
        reject(Mutation::Remove)
    }

    fn rename(&mut self, _to: &str) -> VfsResult<()> {
        reject(Mutation::Rename)
    }
}

/// The facade behind the full [`DavFileSystem`] interface, acting as one requester.
#[derive(Debug)]
pub struct ReadOnlyFs<'a> {
    vfs: &'a VirtualFileSystem,
    requester: Requester,
}

impl<'a> ReadOnlyFs<'a> {
    pub fn new(vfs: &'a VirtualFileSystem, requester: Requester) -> Self {
        Self { vfs, requester }
    }

    pub fn requester(&self) -> &Requester {
        &self.requester
    }
}

impl DavFileSystem for ReadOnlyFs<'_> {
    type File = ReadOnlyFile;

    fn open_file(&self, path: &str, options: OpenOptions) -> VfsResult<ReadOnlyFile> {
        if let Some(mutation) = options.mutation() {
            return reject(mutation);
        }
        self.vfs
            .open_entry(&self.requester, path)
            .map(ReadOnlyFile::new)
    }

    fn stat(&self, path: &str) -> VfsResult<Metadata> {
        self.vfs.stat(&self.requester, path)
    }

    fn mkdir(&self, _path: &str) -> VfsResult<()> {
        reject(Mutation::Mkdir)
    }

    fn remove(&self, _path: &str) -> VfsResult<()> {
        reject(Mutation::Remove)
    }

    fn rename(&self, _from: &str, _to: &str) -> VfsResult<()> {
        reject(Mutation::Rename)
    }

    fn copy(&self, _from: &str, _to: &str) -> VfsResult<()> {
        reject(Mutation::Copy)
    }

    fn set_properties(&self, _path: &str) -> VfsResult<()> {
        reject(Mutation::SetProperties)
    }

    fn lock(&self, _path: &str) -> VfsResult<()> {
        reject(Mutation::Lock)
    }
}
