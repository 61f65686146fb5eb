//! Read-only virtual filesystem over a git repository.
//!
//! A request path such as `/org/repo/_dav/src/main.rs` is decomposed by the
//! [`PathGrammar`], authorized by the permission gate, and resolved against
//! the head commit of a configured branch. The result is a [`VirtualNode`]:
//! a file whose blob can be streamed once, or a directory whose children can
//! be listed in full or page by page.
//!
//! Nothing in this crate can change a repository. Protocol servers that need
//! a read/write interface use [`ReadOnlyFs`], which answers every mutation
//! with [`VfsError::ReadOnlyViolation`].
//!
//! # Request flow
//!
//! ```text
//! path ──► PathGrammar::resolve ──► PermissionGate ──► SnapshotProvider
//!                                                        │ open_repository
//!                                                        │ head_snapshot
//!                                                        ▼
//!                                               Snapshot::open_node ──► VirtualNode
//! ```

pub mod config;
pub mod error;
pub mod fs;
pub mod node;
pub mod path;
pub mod readonly;
pub mod snapshot;

pub use config::VfsConfig;
pub use error::{ErrorClass, PathDefect, VfsError, VfsResult};
pub use fs::VirtualFileSystem;
pub use node::{DirectoryNode, FileNode, Metadata, VirtualNode};
pub use path::{InternalPath, PathGrammar, RequestPath};
pub use readonly::{reject, DavFile, DavFileSystem, Mutation, OpenOptions, ReadOnlyFile, ReadOnlyFs};
pub use snapshot::{RepositorySource, ResolvedEntry, Snapshot, SnapshotProvider};
