use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use gitdav_gate::{Requester, StaticDirectory};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Read credentials from the `Authorization` header.
    ///
    /// `Bearer <token>` is taken as is. `Basic` carries the token as its
    /// password, so stock WebDAV clients can log in; the user part is ignored.
    pub fn from_headers(headers: &HeaderMap) -> ServerResult<Self> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(Self::Anonymous);
        };
        let value = value
            .to_str()
            .map_err(|_| ServerError::AuthFailed("authorization header is not ASCII".into()))?;
        let (scheme, rest) = value.split_once(' ').unwrap_or((value, ""));
        let rest = rest.trim();
        if scheme.eq_ignore_ascii_case("bearer") && !rest.is_empty() {
            return Ok(Self::Bearer(rest.to_string()));
        }
        if scheme.eq_ignore_ascii_case("basic") {
            let decoded = STANDARD
                .decode(rest)
                .map_err(|_| ServerError::AuthFailed("malformed basic credentials".into()))?;
            let decoded = String::from_utf8(decoded)
                .map_err(|_| ServerError::AuthFailed("malformed basic credentials".into()))?;
            return match decoded.split_once(':') {
                Some((_, token)) if !token.is_empty() => Ok(Self::Bearer(token.to_string())),
                _ => Err(ServerError::AuthFailed("basic credentials lack a token".into())),
            };
        }
        Err(ServerError::AuthFailed(format!("unsupported scheme {scheme:?}")))
    }
}

/// Maps request credentials to the requester the permission gate sees.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Requester>;
}

/// Resolves bearer tokens against the users of a [`StaticDirectory`].
pub struct TokenAuth {
    directory: Arc<StaticDirectory>,
}

impl TokenAuth {
    pub fn new(directory: Arc<StaticDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl CredentialResolver for TokenAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Requester> {
        match credentials {
            Credentials::Anonymous => Ok(Requester::anonymous()),
            Credentials::Bearer(token) => self
                .directory
                .requester_for_token(token)
                .ok_or_else(|| ServerError::AuthFailed("unknown token".into())),
        }
    }
}
