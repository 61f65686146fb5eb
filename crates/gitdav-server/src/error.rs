use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use gitdav_vfs::{ErrorClass, VfsError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("filesystem error: {0}")]
    Vfs(#[from] VfsError),

    #[error("authorization error: {0}")]
    Gate(#[from] gitdav_gate::GateError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthFailed(_) => StatusCode::UNAUTHORIZED,
            Self::Vfs(err) => match err.class() {
                ErrorClass::Unauthorized => StatusCode::UNAUTHORIZED,
                ErrorClass::DoesNotExist => StatusCode::NOT_FOUND,
                ErrorClass::ReadOnly => StatusCode::FORBIDDEN,
                ErrorClass::Unsupported => StatusCode::NOT_IMPLEMENTED,
                ErrorClass::Conflict => StatusCode::METHOD_NOT_ALLOWED,
                ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Gate(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Error responses carry no body, so nothing about repository layout or
/// existence reaches the client beyond the status code.
impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request refused");
        }
        status.into_response()
    }
}
