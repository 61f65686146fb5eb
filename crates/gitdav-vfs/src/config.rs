use serde::{Deserialize, Serialize};

use gitdav_store::validate_branch_name;

use crate::error::{VfsError, VfsResult};
use crate::path::PathGrammar;

/// Where the view is mounted and which branch it pins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Leading segments stripped before the owner segment.
    pub mount_prefix: String,
    /// Literal segment separating the repository from the internal path.
    pub browse_marker: String,
    /// Branch whose head commit every request is served from.
    pub branch: String,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            mount_prefix: String::new(),
            browse_marker: "_dav".to_string(),
            branch: "master".to_string(),
        }
    }
}

impl VfsConfig {
    /// Check the configuration and build the path grammar it describes.
    pub fn grammar(&self) -> VfsResult<PathGrammar> {
        validate_branch_name(&self.branch).map_err(|e| VfsError::Config(e.to_string()))?;
        PathGrammar::new(&self.mount_prefix, &self.browse_marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = VfsConfig::default();
        assert_eq!(config.browse_marker, "_dav");
        assert_eq!(config.branch, "master");
        assert!(config.grammar().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: VfsConfig = toml::from_str(r#"branch = "main""#).unwrap();
        assert_eq!(config.branch, "main");
        assert_eq!(config.browse_marker, "_dav");
    }

    #[test]
    fn invalid_branch_is_rejected() {
        let config = VfsConfig {
            branch: "bad..name".into(),
            ..VfsConfig::default()
        };
        assert!(matches!(config.grammar(), Err(VfsError::Config(_))));
    }
}
