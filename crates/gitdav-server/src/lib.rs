//! HTTP server for gitdav.
//!
//! Serves a read-only, WebDAV-flavoured view of bare git repositories: each
//! request is pinned to the head of the configured branch, authorized through
//! the permission gate, and answered from the virtual filesystem. Mutating
//! DAV methods are accepted on the wire and always refused.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod multistatus;
pub mod router;
pub mod server;

pub use auth::{CredentialResolver, Credentials, TokenAuth};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use server::DavServer;
