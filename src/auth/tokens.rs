//! Token pair snapshot and expiry arithmetic

use serde::{Deserialize, Serialize};

/// Current wall-clock time as epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One authorized seller session: an access/refresh token pair plus
/// absolute expiry timestamps (epoch milliseconds).
///
/// A `TokenInfo` is always fully populated. "No token" is modelled as
/// `Option::<TokenInfo>::None` by every component that can lack one.
///
/// The serialized form keeps every field name verbatim so that a token
/// file written by one client instance can be read back by another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: i64,
    pub refresh_token_expires_at: i64,
    pub seller_id: String,
    pub seller_name: String,
}

impl TokenInfo {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        access_token_expires_at: i64,
        refresh_token_expires_at: i64,
        seller_id: impl Into<String>,
        seller_name: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            access_token_expires_at,
            refresh_token_expires_at,
            seller_id: seller_id.into(),
            seller_name: seller_name.into(),
        }
    }

    /// Seconds until the access token expires, clamped to zero.
    pub fn access_token_expires_in_seconds(&self) -> i64 {
        seconds_until(self.access_token_expires_at, now_millis())
    }

    /// Seconds until the refresh token expires, clamped to zero.
    pub fn refresh_token_expires_in_seconds(&self) -> i64 {
        seconds_until(self.refresh_token_expires_at, now_millis())
    }

    /// True when the access token expires within `buffer_seconds`
    /// (boundary inclusive). Already-expired tokens always qualify.
    pub fn should_refresh(&self, buffer_seconds: i64) -> bool {
        self.should_refresh_at(buffer_seconds, now_millis())
    }

    /// True while the access token has not passed its expiry.
    pub fn is_access_token_valid(&self) -> bool {
        self.access_token_expires_at > now_millis()
    }

    pub fn is_refresh_token_expired(&self) -> bool {
        self.is_refresh_token_expired_at(now_millis())
    }

    pub(crate) fn should_refresh_at(&self, buffer_seconds: i64, now_ms: i64) -> bool {
        seconds_until(self.access_token_expires_at, now_ms) <= buffer_seconds
    }

    pub(crate) fn is_refresh_token_expired_at(&self, now_ms: i64) -> bool {
        self.refresh_token_expires_at <= now_ms
    }
}

fn seconds_until(expires_at_ms: i64, now_ms: i64) -> i64 {
    (expires_at_ms.saturating_sub(now_ms) / 1000).max(0)
}
