use std::collections::{BTreeMap, BTreeSet, HashMap};

use gitdav_types::RepositoryLocator;

use crate::config::DirectoryConfig;
use crate::error::{GateError, GateResult};
use crate::requester::Requester;

/// Opaque identifier of a repository owner (user or organization).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(pub u64);

/// What the authorization directory knows about one repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositoryRecord {
    pub id: u64,
    pub owner_id: OwnerId,
    pub owner_name: String,
    pub name: String,
    pub private: bool,
    pub collaborators: Vec<String>,
}

impl RepositoryRecord {
    pub fn locator(&self) -> RepositoryLocator {
        RepositoryLocator::new(&self.owner_name, &self.name)
    }
}

/// The authorization collaborator consulted by the gate.
///
/// Absence is `Ok(None)`; `Err` is reserved for the directory itself failing.
pub trait AuthorizationService: Send + Sync {
    fn find_owner_id(&self, owner: &str) -> GateResult<Option<OwnerId>>;

    fn find_repository(&self, owner: OwnerId, name: &str) -> GateResult<Option<RepositoryRecord>>;

    /// Whether `requester` may see the repository's content.
    fn can_read(&self, requester: &Requester, record: &RepositoryRecord) -> GateResult<bool>;
}

/// Authorization directory built once from configuration.
///
/// Owners are every configured user plus every repository owner; they get
/// stable IDs in name order. Public repositories are readable by everyone.
/// Private ones are readable by admins, their owner, and collaborators.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    owners: BTreeMap<String, OwnerId>,
    repositories: HashMap<(OwnerId, String), RepositoryRecord>,
    tokens: HashMap<String, Requester>,
}

impl StaticDirectory {
    pub fn from_config(config: &DirectoryConfig) -> GateResult<Self> {
        let mut owner_names = BTreeSet::new();
        let mut tokens = HashMap::new();
        for user in &config.users {
            if user.name.is_empty() || user.token.is_empty() {
                return Err(GateError::Config("users need a name and a token".into()));
            }
            let requester = if user.admin {
                Requester::admin(&user.name)
            } else {
                Requester::user(&user.name)
            };
            if tokens.insert(user.token.clone(), requester).is_some() {
                return Err(GateError::Config(format!(
                    "token of user {:?} is shared with another user",
                    user.name
                )));
            }
            owner_names.insert(user.name.clone());
        }
        for repo in &config.repositories {
            if repo.owner.is_empty() || repo.name.is_empty() {
                return Err(GateError::Config("repositories need an owner and a name".into()));
            }
            owner_names.insert(repo.owner.clone());
        }

        let owners: BTreeMap<String, OwnerId> = owner_names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| (name, OwnerId(idx as u64 + 1)))
            .collect();

        let mut repositories = HashMap::new();
        for (idx, repo) in config.repositories.iter().enumerate() {
            let owner_id = owners[&repo.owner];
            let record = RepositoryRecord {
                id: idx as u64 + 1,
                owner_id,
                owner_name: repo.owner.clone(),
                name: repo.name.clone(),
                private: repo.private,
                collaborators: repo.collaborators.clone(),
            };
            if repositories.insert((owner_id, repo.name.clone()), record).is_some() {
                return Err(GateError::Config(format!(
                    "repository {}/{} is declared twice",
                    repo.owner, repo.name
                )));
            }
        }

        Ok(Self { owners, repositories, tokens })
    }

    /// Resolve a bearer token to the user it belongs to.
    pub fn requester_for_token(&self, token: &str) -> Option<Requester> {
        self.tokens.get(token).cloned()
    }
}

impl AuthorizationService for StaticDirectory {
    fn find_owner_id(&self, owner: &str) -> GateResult<Option<OwnerId>> {
        Ok(self.owners.get(owner).copied())
    }

    fn find_repository(&self, owner: OwnerId, name: &str) -> GateResult<Option<RepositoryRecord>> {
        Ok(self.repositories.get(&(owner, name.to_string())).cloned())
    }

    fn can_read(&self, requester: &Requester, record: &RepositoryRecord) -> GateResult<bool> {
        if !record.private || requester.is_admin() {
            return Ok(true);
        }
        Ok(match requester.name() {
            Some(name) => {
                name == record.owner_name || record.collaborators.iter().any(|c| c == name)
            }
            None => false,
        })
    }
}
