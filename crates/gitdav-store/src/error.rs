use gitdav_types::{ObjectId, TypeError};

/// Errors from repository storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The object data is malformed or has the wrong kind.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// A referenced object is absent from the repository.
    #[error("missing object: {0}")]
    MissingObject(ObjectId),

    /// The branch name is invalid.
    #[error("invalid branch name: {name}: {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// A path handed to a builder operation is unusable.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Identifier or mode decoding failure.
    #[error("type error: {0}")]
    Type(#[from] TypeError),

    /// Error reported by libgit2.
    #[cfg(feature = "git")]
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
