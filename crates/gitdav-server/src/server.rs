use std::sync::Arc;

use tokio::net::TcpListener;

use gitdav_gate::{PermissionGate, StaticDirectory};
use gitdav_store::GitRepositoryStorage;
use gitdav_vfs::VirtualFileSystem;

use crate::auth::TokenAuth;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Read-only DAV server over a directory of bare git repositories.
pub struct DavServer {
    config: ServerConfig,
    state: AppState,
}

impl DavServer {
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let directory = Arc::new(StaticDirectory::from_config(&config.directory)?);
        let gate = PermissionGate::new(directory.clone(), config.gate_config());
        let storage = Arc::new(GitRepositoryStorage::new(&config.repos_root));
        let vfs = VirtualFileSystem::new(&config.vfs, gate, storage)?;
        let state = AppState::new(Arc::new(vfs), Arc::new(TokenAuth::new(directory)));
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            repos_root = %self.config.repos_root.display(),
            branch = %self.config.vfs.branch,
            "gitdav server listening"
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
