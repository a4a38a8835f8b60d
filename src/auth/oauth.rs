//! Authorization-code exchange and token refresh against the open platform

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{AuthClient, AuthError, TokenInfo};
use crate::api::transport::Transport;
use crate::models::BaseResponse;

const METHOD_GET_ACCESS_TOKEN: &str = "oauth.getAccessToken";
const METHOD_REFRESH_TOKEN: &str = "oauth.refreshToken";

#[derive(Serialize)]
struct CodeRequest<'a> {
    code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Token payload returned by both oauth methods.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
    access_token_expires_at: i64,
    refresh_token: String,
    refresh_token_expires_at: i64,
    #[serde(default)]
    seller_id: String,
    #[serde(default)]
    seller_name: String,
}

impl From<TokenResponse> for TokenInfo {
    fn from(r: TokenResponse) -> Self {
        TokenInfo::new(
            r.access_token,
            r.refresh_token,
            r.access_token_expires_at,
            r.refresh_token_expires_at,
            r.seller_id,
            r.seller_name,
        )
    }
}

/// [`AuthClient`] backed by the platform's `oauth.*` methods.
pub struct XhsAuthClient {
    transport: Arc<Transport>,
}

impl XhsAuthClient {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }
}

fn into_tokens(resp: BaseResponse<TokenResponse>) -> Result<TokenInfo, AuthError> {
    if !resp.success {
        return Err(AuthError::Rejected {
            code: resp.code.unwrap_or_default(),
            message: resp.msg.unwrap_or_default(),
        });
    }
    resp.data.map(TokenInfo::from).ok_or(AuthError::MissingData)
}

#[async_trait]
impl AuthClient for XhsAuthClient {
    async fn exchange_auth_code(&self, code: &str) -> Result<TokenInfo, AuthError> {
        tracing::info!("Exchanging authorization code for tokens...");
        let resp = self
            .transport
            .call(METHOD_GET_ACCESS_TOKEN, &CodeRequest { code }, None)
            .await?;
        let tokens = into_tokens(resp)?;
        tracing::info!("Authorized seller {}", tokens.seller_id);
        Ok(tokens)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenInfo, AuthError> {
        tracing::info!("Refreshing access token...");
        let resp = self
            .transport
            .call(METHOD_REFRESH_TOKEN, &RefreshRequest { refresh_token }, None)
            .await?;
        into_tokens(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_into_info() {
        let resp: TokenResponse = serde_json::from_value(serde_json::json!({
            "accessToken": "at-1",
            "accessTokenExpiresAt": 1_700_000_000_000i64,
            "refreshToken": "rt-1",
            "refreshTokenExpiresAt": 1_702_000_000_000i64,
            "sellerId": "s-1",
            "sellerName": "Shop"
        }))
        .unwrap();

        let info = TokenInfo::from(resp);
        assert_eq!(info.access_token, "at-1");
        assert_eq!(info.refresh_token_expires_at, 1_702_000_000_000);
        assert_eq!(info.seller_name, "Shop");
    }

    #[test]
    fn test_rejected_envelope() {
        let resp: BaseResponse<TokenResponse> = BaseResponse {
            success: false,
            code: Some("-100".into()),
            msg: Some("invalid code".into()),
            data: None,
        };
        match into_tokens(resp) {
            Err(AuthError::Rejected { code, message }) => {
                assert_eq!(code, "-100");
                assert_eq!(message, "invalid code");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_success_without_data() {
        let resp: BaseResponse<TokenResponse> = BaseResponse {
            success: true,
            code: None,
            msg: None,
            data: None,
        };
        assert!(matches!(into_tokens(resp), Err(AuthError::MissingData)));
    }
}
