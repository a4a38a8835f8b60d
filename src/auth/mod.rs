//! Authentication and token lifecycle
//!
//! Exchanges authorization codes and refresh tokens with the open platform,
//! persists the resulting token pair, and hands out a currently valid access
//! token on demand.

pub mod manager;
pub mod oauth;
pub mod storage;
pub mod tokens;

use async_trait::async_trait;
use thiserror::Error;

use crate::api::transport::TransportError;

pub use manager::{TokenManager, TokenManagerError, DEFAULT_REFRESH_BUFFER_SECONDS};
pub use oauth::XhsAuthClient;
pub use storage::{FileTokenStorage, MemoryTokenStorage, StorageError, TokenStorage};
pub use tokens::TokenInfo;

/// Failure of an authorization-code exchange or a token refresh.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The platform answered but refused the request.
    #[error("authorization rejected (code {code}): {message}")]
    Rejected { code: String, message: String },

    #[error("authorization response carried no token data")]
    MissingData,
}

/// Network side of token acquisition.
///
/// [`XhsAuthClient`] talks to the open platform; tests and embedders can
/// supply their own implementation.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Trade a one-time authorization code for a fresh token pair.
    async fn exchange_auth_code(&self, code: &str) -> Result<TokenInfo, AuthError>;

    /// Obtain a new token pair using a still-valid refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenInfo, AuthError>;
}
