use std::fmt;
use std::sync::Arc;

use crate::config::GateConfig;
use crate::directory::{AuthorizationService, RepositoryRecord};
use crate::error::GateResult;
use crate::requester::Requester;

/// Why access was refused. For logs only, never for responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    AnonymousDisallowed,
    OwnerNotFound,
    RepositoryNotFound,
    NotVisible,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnonymousDisallowed => write!(f, "anonymous access disabled"),
            Self::OwnerNotFound => write!(f, "owner not found"),
            Self::RepositoryNotFound => write!(f, "repository not found"),
            Self::NotVisible => write!(f, "repository not visible to requester"),
        }
    }
}

/// Outcome of a gate check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed(RepositoryRecord),
    Denied(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }
}

/// Authorizes requests against `(owner, repository)` before any repository I/O.
#[derive(Clone)]
pub struct PermissionGate {
    directory: Arc<dyn AuthorizationService>,
    config: GateConfig,
}

impl PermissionGate {
    pub fn new(directory: Arc<dyn AuthorizationService>, config: GateConfig) -> Self {
        Self { directory, config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Evaluate access, stopping at the first negative answer.
    pub fn check_access(
        &self,
        requester: &Requester,
        owner: &str,
        repository: &str,
    ) -> GateResult<AccessDecision> {
        let decision = self.evaluate(requester, owner, repository)?;
        if let AccessDecision::Denied(reason) = &decision {
            tracing::debug!(%requester, owner, repository, %reason, "access denied");
        }
        Ok(decision)
    }

    fn evaluate(
        &self,
        requester: &Requester,
        owner: &str,
        repository: &str,
    ) -> GateResult<AccessDecision> {
        if requester.is_anonymous() && !self.config.allow_anonymous_read {
            return Ok(AccessDecision::Denied(DenyReason::AnonymousDisallowed));
        }
        let Some(owner_id) = self.directory.find_owner_id(owner)? else {
            return Ok(AccessDecision::Denied(DenyReason::OwnerNotFound));
        };
        let Some(record) = self.directory.find_repository(owner_id, repository)? else {
            return Ok(AccessDecision::Denied(DenyReason::RepositoryNotFound));
        };
        if !self.directory.can_read(requester, &record)? {
            return Ok(AccessDecision::Denied(DenyReason::NotVisible));
        }
        Ok(AccessDecision::Allowed(record))
    }
}

impl fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionGate")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
