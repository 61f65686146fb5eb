//! Repository storage for gitdav.
//!
//! This crate is the storage collaborator of the read-only view: it opens a
//! named repository, resolves a branch to its head commit, and walks the
//! commit's trees and blobs. Every operation is pure inspection; nothing in
//! the [`RepositoryStorage`] / [`StoredRepository`] traits can create, modify,
//! or delete objects or refs.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw file content
//! - [`Tree`] -- directory listing mapping names to [`TreeEntry`] values
//! - [`CommitObject`] -- root tree, parents, committer time, and message
//!
//! # Storage Backends
//!
//! - [`InMemoryRepositoryStorage`] -- `HashMap`-based repositories for tests and embedding
//! - [`GitRepositoryStorage`] -- bare git repositories on disk via libgit2 (feature `git`)
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Concurrent reads are always safe; handles are never shared between requests.
//! 3. A missing repository, ref, path, or object is `Ok(None)`, not an error.
//! 4. All I/O errors are propagated, never silently ignored.

#[cfg(feature = "git")]
pub mod git;
pub mod error;
pub mod memory;
pub mod names;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
#[cfg(feature = "git")]
pub use git::GitRepositoryStorage;
pub use memory::{InMemoryRepositoryStorage, MemoryRepository};
pub use names::validate_branch_name;
pub use object::{Blob, CommitInfo, CommitObject, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::{BlobReader, RepositoryStorage, StoredRepository};
