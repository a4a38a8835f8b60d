//! Authenticated client for the open platform
//!
//! Every business call asks the [`TokenManager`] for a valid access token
//! right before the request is built, so callers never pass tokens around.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::data::DataApi;
use super::order::OrderApi;
use super::product::ProductApi;
use super::transport::{Transport, TransportError};
use crate::auth::{AuthClient, TokenInfo, TokenManager, TokenManagerError, XhsAuthClient};
use crate::config::ClientConfig;
use crate::models::BaseResponse;

/// Failure of a business call before a platform verdict was obtained.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable access token; no request was sent.
    #[error(transparent)]
    Token(#[from] TokenManagerError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Client for one seller authorization.
///
/// Safe to share across tasks (`Arc<XhsClient>`); token refresh is
/// coordinated internally.
pub struct XhsClient {
    transport: Arc<Transport>,
    tokens: TokenManager,
}

impl XhsClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(TransportError::from)?;
        Self::with_http_client(config, http)
    }

    /// Build on a caller-supplied HTTP client (proxies, custom TLS, tests).
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Result<Self, ApiError> {
        let transport = Arc::new(Transport::new(http, &config)?);
        let auth = Arc::new(XhsAuthClient::new(Arc::clone(&transport)));
        Ok(Self::assemble(config, transport, auth))
    }

    /// Build with a custom [`AuthClient`] in place of the platform's oauth methods.
    pub fn with_auth_client(
        config: ClientConfig,
        http: reqwest::Client,
        auth: Arc<dyn AuthClient>,
    ) -> Result<Self, ApiError> {
        let transport = Arc::new(Transport::new(http, &config)?);
        Ok(Self::assemble(config, transport, auth))
    }

    fn assemble(config: ClientConfig, transport: Arc<Transport>, auth: Arc<dyn AuthClient>) -> Self {
        let tokens = TokenManager::new(
            auth,
            config.token_storage,
            config.token_refresh_buffer_seconds,
        );
        Self { transport, tokens }
    }

    pub fn product(&self) -> ProductApi<'_> {
        ProductApi::new(self)
    }

    pub fn order(&self) -> OrderApi<'_> {
        OrderApi::new(self)
    }

    pub fn data(&self) -> DataApi<'_> {
        DataApi::new(self)
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    pub async fn is_token_valid(&self) -> bool {
        self.tokens.is_token_valid().await
    }

    pub async fn get_current_tokens(&self) -> Option<TokenInfo> {
        self.tokens.get_current_tokens().await
    }

    pub async fn set_tokens_from_auth_code(
        &self,
        code: &str,
    ) -> Result<TokenInfo, TokenManagerError> {
        self.tokens.set_tokens_from_auth_code(code).await
    }

    pub async fn set_tokens_manually(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        access_token_expires_at: i64,
        refresh_token_expires_at: i64,
        seller_id: impl Into<String>,
        seller_name: impl Into<String>,
    ) -> Result<TokenInfo, TokenManagerError> {
        self.tokens
            .set_tokens_manually(
                access_token,
                refresh_token,
                access_token_expires_at,
                refresh_token_expires_at,
                seller_id,
                seller_name,
            )
            .await
    }

    pub async fn clear_tokens(&self) -> Result<(), TokenManagerError> {
        self.tokens.clear_tokens().await
    }

    pub async fn force_refresh(&self) -> Result<TokenInfo, TokenManagerError> {
        self.tokens.force_refresh().await
    }

    /// Call `method` with a freshly obtained access token.
    ///
    /// A token failure aborts before any request is sent.
    pub(crate) async fn call<P, T>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<BaseResponse<T>, ApiError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.tokens.get_valid_access_token().await?;
        let resp = self.transport.call(method, params, Some(token.as_str())).await?;
        if !resp.success {
            tracing::warn!(
                "{} failed: {}",
                method,
                resp.error_message().unwrap_or("unknown error")
            );
        }
        Ok(resp)
    }
}
