//! Foundation types for gitdav.
//!
//! This crate provides the identifiers shared by every other gitdav crate.
//! It has no knowledge of storage, authorization, or protocols.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Git object identifier (SHA-1 over the loose-object header and payload)
//! - [`RepositoryLocator`] -- `(owner, repository)` pair naming the repository a request targets
//! - [`EntryKind`] -- File or directory
//! - [`EntryMode`] -- Git file mode of a tree entry

pub mod entry;
pub mod error;
pub mod locator;
pub mod object;

pub use entry::{EntryKind, EntryMode};
pub use error::TypeError;
pub use locator::RepositoryLocator;
pub use object::ObjectId;
