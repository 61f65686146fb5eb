//! Permission gate for gitdav.
//!
//! Every request passes through the [`PermissionGate`] before any repository
//! storage is touched. The gate asks the authorization collaborator three
//! questions in order (does the owner exist, does the repository exist, may
//! the requester read it) and stops at the first negative answer. Denials
//! carry a [`DenyReason`] for logs only; callers must answer every denial the
//! same way so repository existence never leaks.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use gitdav_gate::{DirectoryConfig, GateConfig, PermissionGate, Requester, StaticDirectory};
//!
//! let mut config = DirectoryConfig::default();
//! config.repositories.push(gitdav_gate::RepositoryConfig::public("org", "repo"));
//! let directory = StaticDirectory::from_config(&config).unwrap();
//! let gate = PermissionGate::new(Arc::new(directory), GateConfig::default());
//!
//! let decision = gate.check_access(&Requester::anonymous(), "org", "repo").unwrap();
//! assert!(decision.is_allowed());
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod gate;
pub mod requester;

pub use config::{DirectoryConfig, GateConfig, RepositoryConfig, UserConfig};
pub use directory::{AuthorizationService, OwnerId, RepositoryRecord, StaticDirectory};
pub use error::{GateError, GateResult};
pub use gate::{AccessDecision, DenyReason, PermissionGate};
pub use requester::Requester;
