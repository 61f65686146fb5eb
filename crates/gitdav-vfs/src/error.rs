use std::fmt;

use gitdav_gate::GateError;
use gitdav_store::StoreError;
use gitdav_types::RepositoryLocator;

use crate::readonly::Mutation;

/// The grammar rule a request path broke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathDefect {
    NotAbsolute,
    MountPrefixMismatch,
    MissingOwner,
    MissingRepository,
    MissingBrowseMarker,
    ParentTraversal,
    InvalidSegment,
}

impl fmt::Display for PathDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotAbsolute => "path is not absolute",
            Self::MountPrefixMismatch => "mount prefix does not match",
            Self::MissingOwner => "owner segment missing",
            Self::MissingRepository => "repository segment missing",
            Self::MissingBrowseMarker => "browse marker missing",
            Self::ParentTraversal => "parent traversal",
            Self::InvalidSegment => "invalid segment",
        };
        f.write_str(text)
    }
}

/// Errors from the virtual filesystem.
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    #[error("malformed path {path:?}: {defect}")]
    MalformedPath { path: String, defect: PathDefect },

    #[error("unauthorized")]
    Unauthorized,

    /// The repository is absent from storage.
    #[error("repository not found: {0}")]
    NotFound(RepositoryLocator),

    #[error("branch {branch:?} of {locator} has no commit")]
    RefNotFound {
        locator: RepositoryLocator,
        branch: String,
    },

    /// No entry at this internal path in the pinned snapshot.
    #[error("path not found: {0:?}")]
    PathNotFound(String),

    #[error("not a blob: {0:?}")]
    NotABlob(String),

    #[error("not a directory: {0:?}")]
    NotADirectory(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("read-only filesystem: {0} rejected")]
    ReadOnlyViolation(Mutation),

    /// Streaming blob content failed mid-transfer.
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("authorization error: {0}")]
    Gate(#[from] GateError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type VfsResult<T> = Result<T, VfsError>;

/// How a protocol layer should answer an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Unauthorized,
    DoesNotExist,
    ReadOnly,
    Unsupported,
    Conflict,
    Internal,
}

impl VfsError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Unauthorized => ErrorClass::Unauthorized,
            Self::MalformedPath { .. }
            | Self::NotFound(_)
            | Self::RefNotFound { .. }
            | Self::PathNotFound(_) => ErrorClass::DoesNotExist,
            Self::ReadOnlyViolation(_) => ErrorClass::ReadOnly,
            Self::UnsupportedOperation(_) => ErrorClass::Unsupported,
            Self::NotABlob(_) | Self::NotADirectory(_) => ErrorClass::Conflict,
            Self::Read(_) | Self::Storage(_) | Self::Gate(_) | Self::Config(_) => {
                ErrorClass::Internal
            }
        }
    }

    pub(crate) fn malformed(path: &str, defect: PathDefect) -> Self {
        Self::MalformedPath {
            path: path.to_string(),
            defect,
        }
    }
}
