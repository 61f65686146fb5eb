use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Whether a tree entry is a file (blob) or a directory (tree).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn is_directory(self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// Git file mode of a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
    /// Symbolic link (0o120000). The blob holds the link target.
    Symlink,
    /// Subtree / directory (0o040000).
    Directory,
    /// Submodule commit reference (0o160000).
    Gitlink,
}

impl EntryMode {
    /// Octal mode value as stored in git trees.
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Directory => 0o040000,
            Self::Gitlink => 0o160000,
        }
    }

    /// Parse from an octal mode value.
    ///
    /// Accepts the legacy group-writable file mode (0o100664) that old git
    /// versions wrote, folding it into [`EntryMode::Regular`].
    pub fn from_mode_bits(bits: u32) -> Result<Self, TypeError> {
        match bits {
            0o100644 | 0o100664 => Ok(Self::Regular),
            0o100755 => Ok(Self::Executable),
            0o120000 => Ok(Self::Symlink),
            0o040000 => Ok(Self::Directory),
            0o160000 => Ok(Self::Gitlink),
            other => Err(TypeError::UnknownMode(other)),
        }
    }

    /// The entry kind this mode maps to, or `None` for submodules, which are
    /// neither a readable file nor a listable directory in the snapshot.
    pub fn kind(&self) -> Option<EntryKind> {
        match self {
            Self::Regular | Self::Executable | Self::Symlink => Some(EntryKind::File),
            Self::Directory => Some(EntryKind::Directory),
            Self::Gitlink => None,
        }
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}
