//! Xiaohongshu e-commerce open platform client
//!
//! Tokens are managed automatically: authorize once with an authorization
//! code (or install a token pair manually), then call business methods
//! without ever passing an access token. Tokens are refreshed before they
//! expire, concurrent refreshes are collapsed into one, and every new pair
//! is persisted through a pluggable [`TokenStorage`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use xhs_ecommerce::{ClientConfig, FileTokenStorage, XhsClient};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("app-id", "app-secret")
//!     .with_token_storage(Arc::new(FileTokenStorage::new("tokens.json")));
//! let client = XhsClient::new(config)?;
//!
//! if !client.is_token_valid().await {
//!     client.set_tokens_from_auth_code("code-from-redirect").await?;
//! }
//!
//! let skus = client.product().get_detail_sku_list(1, 20, Some(true)).await?;
//! println!("{} SKUs", skus.data.map_or(0, |d| d.total));
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, TransportError, XhsClient};
pub use auth::{
    AuthClient, AuthError, FileTokenStorage, MemoryTokenStorage, StorageError, TokenInfo,
    TokenManager, TokenManagerError, TokenStorage,
};
pub use config::ClientConfig;
pub use models::BaseResponse;
