use serde::{Deserialize, Serialize};

/// Gate-wide policy switches.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// When `false`, anonymous requesters are denied even on public repositories.
    pub allow_anonymous_read: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { allow_anonymous_read: true }
    }
}

/// Users and repositories known to the static authorization directory.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub users: Vec<UserConfig>,
    pub repositories: Vec<RepositoryConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserConfig {
    pub name: String,
    /// Bearer token the user authenticates with.
    pub token: String,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub private: bool,
    /// Users granted read access to a private repository.
    #[serde(default)]
    pub collaborators: Vec<String>,
}

impl RepositoryConfig {
    pub fn public(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            private: false,
            collaborators: Vec::new(),
        }
    }

    pub fn private(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            private: true,
            ..Self::public(owner, name)
        }
    }
}
