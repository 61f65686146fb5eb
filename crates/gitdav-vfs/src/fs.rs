use std::sync::Arc;

use gitdav_gate::{AccessDecision, PermissionGate, RepositoryRecord, Requester};
use gitdav_store::RepositoryStorage;
use tracing::{debug, instrument};

use crate::config::VfsConfig;
use crate::error::{VfsError, VfsResult};
use crate::node::{Metadata, VirtualNode};
use crate::path::{PathGrammar, RequestPath};
use crate::readonly::ReadOnlyFs;
use crate::snapshot::SnapshotProvider;

/// The entry point a protocol server calls.
///
/// Holds only immutable configuration and shared collaborators; every call
/// opens its own repository handle and hands it to the returned node.
#[derive(Debug)]
pub struct VirtualFileSystem {
    grammar: PathGrammar,
    branch: String,
    gate: PermissionGate,
    snapshots: SnapshotProvider,
}

impl VirtualFileSystem {
    pub fn new(
        config: &VfsConfig,
        gate: PermissionGate,
        storage: Arc<dyn RepositoryStorage>,
    ) -> VfsResult<Self> {
        Ok(Self {
            grammar: config.grammar()?,
            branch: config.branch.clone(),
            gate,
            snapshots: SnapshotProvider::new(storage),
        })
    }

    pub fn grammar(&self) -> &PathGrammar {
        &self.grammar
    }

    /// Branch every request is served from.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn resolve(&self, path: &str) -> VfsResult<RequestPath> {
        self.grammar.resolve(path)
    }

    /// Run the permission gate for an already decomposed path. Every denial
    /// becomes the same [`VfsError::Unauthorized`].
    pub fn authorize(
        &self,
        requester: &Requester,
        request: &RequestPath,
    ) -> VfsResult<RepositoryRecord> {
        let locator = &request.locator;
        match self.gate.check_access(requester, &locator.owner, &locator.name)? {
            AccessDecision::Allowed(record) => Ok(record),
            AccessDecision::Denied(_) => Err(VfsError::Unauthorized),
        }
    }

    /// Open the entry `path` names.
    ///
    /// The path is decomposed first without any I/O, then the gate runs, and
    /// only an authorized request reaches repository storage. The first
    /// failing step aborts the call.
    #[instrument(level = "debug", skip(self, requester), fields(requester = %requester))]
    pub fn open_entry(&self, requester: &Requester, path: &str) -> VfsResult<VirtualNode> {
        let request = self.grammar.resolve(path)?;
        self.authorize(requester, &request)?;
        let source = self.snapshots.open_repository(&request.locator)?;
        let snapshot = self.snapshots.head_snapshot(source, &self.branch)?;
        let node = snapshot.open_node(&request.internal)?;
        debug!(
            repository = %request.locator,
            entry = node.path(),
            directory = node.is_directory(),
            "entry opened"
        );
        Ok(node)
    }

    pub fn stat(&self, requester: &Requester, path: &str) -> VfsResult<Metadata> {
        self.open_entry(requester, path).map(|node| node.stat())
    }

    /// The full read/write interface for `requester`, with writes rejected.
    pub fn read_only(&self, requester: Requester) -> ReadOnlyFs<'_> {
        ReadOnlyFs::new(self, requester)
    }
}
