use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use gitdav_gate::{DirectoryConfig, GateConfig};
use gitdav_vfs::VfsConfig;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding `<owner>/<repo>.git` bare repositories.
    pub repos_root: PathBuf,
    pub allow_anonymous_read: bool,
    pub vfs: VfsConfig,
    pub directory: DirectoryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8780)),
            repos_root: PathBuf::from("."),
            allow_anonymous_read: true,
            vfs: VfsConfig::default(),
            directory: DirectoryConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            allow_anonymous_read: self.allow_anonymous_read,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8780".parse::<SocketAddr>().unwrap());
        assert!(c.allow_anonymous_read);
        assert_eq!(c.vfs.browse_marker, "_dav");
        assert!(c.directory.repositories.is_empty());
    }

    #[test]
    fn parses_full_file() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:9000"
            repos_root = "/srv/git"
            allow_anonymous_read = false

            [vfs]
            mount_prefix = "/dav"
            branch = "main"

            [[directory.users]]
            name = "alice"
            token = "s3cret"

            [[directory.repositories]]
            owner = "org"
            name = "repo"
            private = true
            collaborators = ["alice"]
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.repos_root, PathBuf::from("/srv/git"));
        assert!(!c.gate_config().allow_anonymous_read);
        assert_eq!(c.vfs.branch, "main");
        assert_eq!(c.vfs.browse_marker, "_dav");
        assert_eq!(c.directory.users[0].name, "alice");
        assert_eq!(c.directory.repositories[0].collaborators, ["alice"]);
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitdav.toml");
        std::fs::write(&path, "repos_root = \"/tmp/repos\"\n").unwrap();
        let c = ServerConfig::load(&path).unwrap();
        assert_eq!(c.repos_root, PathBuf::from("/tmp/repos"));

        assert!(matches!(
            ServerConfig::load(dir.path().join("missing.toml")),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(matches!(
            ServerConfig::from_toml_str("bind_addr = 12"),
            Err(ServerError::Config(_))
        ));
    }
}
