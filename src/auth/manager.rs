//! Token manager with automatic refresh
//!
//! Owns the in-memory copy of the current [`TokenInfo`] and keeps it valid:
//! - lazily hydrates from [`TokenStorage`] when the cache is empty
//! - refreshes proactively once the access token enters the refresh buffer
//! - collapses concurrent refreshes into a single network call
//! - persists every new token pair

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use super::storage::{StorageError, TokenStorage};
use super::tokens::{now_millis, TokenInfo};
use super::{AuthClient, AuthError};

/// Refresh this many seconds before the access token expires.
pub const DEFAULT_REFRESH_BUFFER_SECONDS: i64 = 300;

/// Token lifecycle failure.
#[derive(Debug, Error)]
pub enum TokenManagerError {
    /// No token has been established (or it was cleared).
    #[error("no token available, authorize with an authorization code first")]
    NoToken,

    /// The refresh token itself expired; only a new authorization code helps.
    #[error("refresh token expired, re-authorization required")]
    RefreshTokenExpired,

    #[error("token refresh failed: {0}")]
    RefreshFailed(#[source] AuthError),

    #[error("authorization code exchange failed: {0}")]
    AuthorizationFailed(#[source] AuthError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TokenManagerError {
    /// True when the caller must obtain a new authorization code to recover.
    pub fn requires_reauthorization(&self) -> bool {
        matches!(self, Self::NoToken | Self::RefreshTokenExpired)
    }
}

/// Keeps one seller's access token valid.
///
/// Cheap reads go through the cache's read lock only. The refresh-and-persist
/// sequence runs under `refresh_lock`, so N tasks that see a stale token at
/// the same time produce exactly one refresh call; the rest wait and then
/// pick up the new pair.
pub struct TokenManager {
    auth: Arc<dyn AuthClient>,
    storage: Arc<dyn TokenStorage>,
    current: RwLock<Option<Arc<TokenInfo>>>,
    refresh_lock: Mutex<()>,
    refresh_buffer_seconds: i64,
}

impl TokenManager {
    pub fn new(
        auth: Arc<dyn AuthClient>,
        storage: Arc<dyn TokenStorage>,
        refresh_buffer_seconds: i64,
    ) -> Self {
        Self {
            auth,
            storage,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            refresh_buffer_seconds,
        }
    }

    pub fn refresh_buffer_seconds(&self) -> i64 {
        self.refresh_buffer_seconds
    }

    /// Current token pair, loading it from storage if the cache is empty.
    pub async fn get_current_tokens(&self) -> Option<TokenInfo> {
        self.current().await.map(|t| (*t).clone())
    }

    /// True iff a token exists and its access token has not expired.
    pub async fn is_token_valid(&self) -> bool {
        self.current()
            .await
            .map_or(false, |t| t.is_access_token_valid())
    }

    /// Return an access token that is outside the refresh buffer,
    /// refreshing first if necessary.
    pub async fn get_valid_access_token(&self) -> Result<String, TokenManagerError> {
        let tokens = self.current().await.ok_or(TokenManagerError::NoToken)?;
        if !tokens.should_refresh(self.refresh_buffer_seconds) {
            return Ok(tokens.access_token.clone());
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed (or cleared) while we waited.
        let tokens = self.current().await.ok_or(TokenManagerError::NoToken)?;
        if !tokens.should_refresh(self.refresh_buffer_seconds) {
            tracing::debug!("Token already refreshed by a concurrent caller");
            return Ok(tokens.access_token.clone());
        }

        let refreshed = self.refresh_locked(&tokens).await?;
        Ok(refreshed.access_token.clone())
    }

    /// Refresh now regardless of the access token's remaining lifetime.
    pub async fn force_refresh(&self) -> Result<TokenInfo, TokenManagerError> {
        let _guard = self.refresh_lock.lock().await;
        let tokens = self.current().await.ok_or(TokenManagerError::NoToken)?;
        let refreshed = self.refresh_locked(&tokens).await?;
        Ok((*refreshed).clone())
    }

    /// Exchange an authorization code and make the result current.
    pub async fn set_tokens_from_auth_code(
        &self,
        code: &str,
    ) -> Result<TokenInfo, TokenManagerError> {
        let _guard = self.refresh_lock.lock().await;
        let tokens = self
            .auth
            .exchange_auth_code(code)
            .await
            .map_err(TokenManagerError::AuthorizationFailed)?;
        self.install(tokens).await
    }

    /// Install a token pair without contacting the platform.
    ///
    /// Intended for tests and for migrating tokens obtained elsewhere.
    pub async fn set_tokens_manually(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        access_token_expires_at: i64,
        refresh_token_expires_at: i64,
        seller_id: impl Into<String>,
        seller_name: impl Into<String>,
    ) -> Result<TokenInfo, TokenManagerError> {
        let tokens = TokenInfo::new(
            access_token,
            refresh_token,
            access_token_expires_at,
            refresh_token_expires_at,
            seller_id,
            seller_name,
        );
        let _guard = self.refresh_lock.lock().await;
        tracing::info!("Tokens set manually for seller {}", tokens.seller_id);
        self.install(tokens).await
    }

    /// Forget the current token and clear storage. Idempotent.
    pub async fn clear_tokens(&self) -> Result<(), TokenManagerError> {
        let _guard = self.refresh_lock.lock().await;
        // Hold the cache write guard until storage is empty, so hydration
        // cannot pick up the pair that is being removed.
        let mut slot = self.current.write().await;
        *slot = None;
        self.storage.clear_tokens().await?;
        drop(slot);
        tracing::info!("Tokens cleared");
        Ok(())
    }

    /// Cached token, hydrating from storage when the cache is empty.
    async fn current(&self) -> Option<Arc<TokenInfo>> {
        if let Some(tokens) = self.current.read().await.as_ref() {
            return Some(Arc::clone(tokens));
        }

        // Load under the write guard: a clear running concurrently either
        // finishes before the load or starts after the install.
        let mut slot = self.current.write().await;
        if let Some(tokens) = slot.as_ref() {
            return Some(Arc::clone(tokens));
        }

        let loaded = match self.storage.load_tokens().await {
            Ok(Some(tokens)) => tokens,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to load stored tokens, treating as absent: {}", e);
                return None;
            }
        };
        tracing::debug!("Loaded tokens for seller {} from storage", loaded.seller_id);
        let loaded = Arc::new(loaded);
        *slot = Some(Arc::clone(&loaded));
        Some(loaded)
    }

    /// Refresh `stale` and install the result. Caller holds `refresh_lock`.
    async fn refresh_locked(
        &self,
        stale: &TokenInfo,
    ) -> Result<Arc<TokenInfo>, TokenManagerError> {
        if stale.is_refresh_token_expired_at(now_millis()) {
            tracing::warn!(
                "Refresh token for seller {} has expired; re-authorization required",
                stale.seller_id
            );
            return Err(TokenManagerError::RefreshTokenExpired);
        }

        let mut tokens = self
            .auth
            .refresh(&stale.refresh_token)
            .await
            .map_err(TokenManagerError::RefreshFailed)?;

        // The refresh payload may omit the seller; it is the same authorization.
        if tokens.seller_id.is_empty() {
            tokens.seller_id = stale.seller_id.clone();
        }
        if tokens.seller_name.is_empty() {
            tokens.seller_name = stale.seller_name.clone();
        }

        let tokens = Arc::new(tokens);
        *self.current.write().await = Some(Arc::clone(&tokens));

        // The new pair is already live; a storage hiccup must not discard it.
        if let Err(e) = self.storage.save_tokens(&tokens).await {
            tracing::warn!("Failed to persist refreshed tokens: {}", e);
        }

        tracing::info!(
            "Access token refreshed, expires in {}s",
            tokens.access_token_expires_in_seconds()
        );
        Ok(tokens)
    }

    /// Make `tokens` current, then persist. Caller holds `refresh_lock`.
    async fn install(&self, tokens: TokenInfo) -> Result<TokenInfo, TokenManagerError> {
        *self.current.write().await = Some(Arc::new(tokens.clone()));
        self.storage.save_tokens(&tokens).await?;
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStorage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    const HOUR_MS: i64 = 3_600_000;

    /// Auth client that counts calls and can be slowed down or made to fail.
    #[derive(Default)]
    struct FakeAuth {
        refresh_calls: AtomicUsize,
        exchange_calls: AtomicUsize,
        delay: Duration,
        fail: bool,
        omit_seller: bool,
    }

    impl FakeAuth {
        fn fresh_pair(prefix: &str, n: usize) -> TokenInfo {
            let now = now_millis();
            TokenInfo::new(
                format!("{}-access-{}", prefix, n),
                format!("{}-refresh-{}", prefix, n),
                now + 2 * HOUR_MS,
                now + 24 * HOUR_MS,
                "seller-1",
                "Shop",
            )
        }
    }

    #[async_trait]
    impl AuthClient for FakeAuth {
        async fn exchange_auth_code(&self, code: &str) -> Result<TokenInfo, AuthError> {
            let n = self.exchange_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if code == "bad" {
                return Err(AuthError::Rejected {
                    code: "-1".into(),
                    message: "invalid code".into(),
                });
            }
            Ok(Self::fresh_pair("code", n))
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<TokenInfo, AuthError> {
            let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(AuthError::Rejected {
                    code: "-2".into(),
                    message: "refresh token revoked".into(),
                });
            }
            let mut pair = Self::fresh_pair("new", n);
            if self.omit_seller {
                pair.seller_id.clear();
                pair.seller_name.clear();
            }
            Ok(pair)
        }
    }

    /// Storage that refuses every operation.
    struct BrokenStorage;

    #[async_trait]
    impl TokenStorage for BrokenStorage {
        async fn load_tokens(&self) -> Result<Option<TokenInfo>, StorageError> {
            Err(StorageError::Backend("disk on fire".into()))
        }
        async fn save_tokens(&self, _tokens: &TokenInfo) -> Result<(), StorageError> {
            Err(StorageError::Backend("disk on fire".into()))
        }
        async fn clear_tokens(&self) -> Result<(), StorageError> {
            Err(StorageError::Backend("disk on fire".into()))
        }
    }

    fn manager_with(auth: Arc<FakeAuth>) -> (TokenManager, Arc<MemoryTokenStorage>) {
        let storage = Arc::new(MemoryTokenStorage::new());
        let manager = TokenManager::new(auth, storage.clone(), DEFAULT_REFRESH_BUFFER_SECONDS);
        (manager, storage)
    }

    async fn install_stale(manager: &TokenManager) {
        let now = now_millis();
        manager
            .set_tokens_manually("old-access", "old-refresh", now + 60_000, now + HOUR_MS, "seller-1", "Shop")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_no_token() {
        let (manager, _) = manager_with(Arc::new(FakeAuth::default()));
        assert!(manager.get_current_tokens().await.is_none());
        assert!(!manager.is_token_valid().await);

        let err = manager.get_valid_access_token().await.unwrap_err();
        assert!(matches!(err, TokenManagerError::NoToken));
        assert!(err.requires_reauthorization());
    }

    #[tokio::test]
    async fn test_fresh_token_skips_refresh() {
        let auth = Arc::new(FakeAuth::default());
        let (manager, _) = manager_with(auth.clone());
        let now = now_millis();
        manager
            .set_tokens_manually("live", "rt", now + HOUR_MS, now + 24 * HOUR_MS, "s", "n")
            .await
            .unwrap();

        assert_eq!(manager.get_valid_access_token().await.unwrap(), "live");
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_token_refreshes_and_persists() {
        let auth = Arc::new(FakeAuth::default());
        let (manager, storage) = manager_with(auth.clone());
        install_stale(&manager).await;

        let token = manager.get_valid_access_token().await.unwrap();
        assert_eq!(token, "new-access-1");
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 1);

        let stored = storage.load_tokens().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "new-access-1");

        // Second call hits the fast path.
        assert_eq!(manager.get_valid_access_token().await.unwrap(), "new-access-1");
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_access_token_refreshes() {
        let auth = Arc::new(FakeAuth::default());
        let (manager, _) = manager_with(auth.clone());
        let now = now_millis();
        manager
            .set_tokens_manually("dead", "rt", now - 1_000, now + HOUR_MS, "s", "n")
            .await
            .unwrap();
        assert!(!manager.is_token_valid().await);

        assert_eq!(manager.get_valid_access_token().await.unwrap(), "new-access-1");
        assert!(manager.is_token_valid().await);
    }

    #[tokio::test]
    async fn test_expired_refresh_token_does_not_call_refresh() {
        let auth = Arc::new(FakeAuth::default());
        let (manager, _) = manager_with(auth.clone());
        let now = now_millis();
        manager
            .set_tokens_manually("dead", "dead-rt", now - HOUR_MS, now - 1, "s", "n")
            .await
            .unwrap();

        let err = manager.get_valid_access_token().await.unwrap_err();
        assert!(matches!(err, TokenManagerError::RefreshTokenExpired));
        assert!(err.requires_reauthorization());
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_cause_and_releases_lock() {
        let auth = Arc::new(FakeAuth {
            fail: true,
            ..Default::default()
        });
        let (manager, _) = manager_with(auth.clone());
        install_stale(&manager).await;

        let err = manager.get_valid_access_token().await.unwrap_err();
        match &err {
            TokenManagerError::RefreshFailed(AuthError::Rejected { code, .. }) => {
                assert_eq!(code, "-2")
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.requires_reauthorization());

        // The lock was released: a second attempt refreshes again instead of hanging.
        let again = tokio::time::timeout(Duration::from_secs(1), manager.get_valid_access_token())
            .await
            .expect("refresh lock was not released");
        assert_err!(again);
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 2);

        // The stale pair is still cached.
        let current = manager.get_current_tokens().await.unwrap();
        assert_eq!(current.access_token, "old-access");
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_single_flight() {
        let auth = Arc::new(FakeAuth {
            delay: Duration::from_millis(100),
            ..Default::default()
        });
        let (manager, _) = manager_with(auth.clone());
        let manager = Arc::new(manager);
        install_stale(&manager).await;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                manager.get_valid_access_token().await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "new-access-1");
        }
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hydrates_from_storage() {
        let auth = Arc::new(FakeAuth::default());
        let storage = Arc::new(MemoryTokenStorage::new());
        let now = now_millis();
        let saved = TokenInfo::new("persisted", "rt", now + HOUR_MS, now + 24 * HOUR_MS, "s", "n");
        storage.save_tokens(&saved).await.unwrap();

        let manager = TokenManager::new(auth, storage, DEFAULT_REFRESH_BUFFER_SECONDS);
        assert_eq!(manager.get_current_tokens().await, Some(saved));
        assert_eq!(manager.get_valid_access_token().await.unwrap(), "persisted");
    }

    #[tokio::test]
    async fn test_storage_load_error_degrades_to_absent() {
        let manager = TokenManager::new(
            Arc::new(FakeAuth::default()),
            Arc::new(BrokenStorage),
            DEFAULT_REFRESH_BUFFER_SECONDS,
        );
        assert!(manager.get_current_tokens().await.is_none());
        assert!(matches!(
            manager.get_valid_access_token().await,
            Err(TokenManagerError::NoToken)
        ));
    }

    #[tokio::test]
    async fn test_save_error_on_refresh_is_not_fatal() {
        let auth = Arc::new(FakeAuth::default());
        let manager = TokenManager::new(auth.clone(), Arc::new(BrokenStorage), 300);

        // Explicit installs report the storage failure but still update the cache.
        let now = now_millis();
        let err = manager
            .set_tokens_manually("old", "rt", now + 1_000, now + HOUR_MS, "s", "n")
            .await
            .unwrap_err();
        assert!(matches!(err, TokenManagerError::Storage(_)));
        assert!(manager.is_token_valid().await);

        assert_eq!(manager.get_valid_access_token().await.unwrap(), "new-access-1");
    }

    #[tokio::test]
    async fn test_set_tokens_from_auth_code() {
        let auth = Arc::new(FakeAuth::default());
        let (manager, storage) = manager_with(auth.clone());

        let tokens = manager.set_tokens_from_auth_code("good").await.unwrap();
        assert_eq!(tokens.access_token, "code-access-1");
        assert_eq!(manager.get_current_tokens().await, Some(tokens.clone()));
        assert_eq!(storage.load_tokens().await.unwrap(), Some(tokens));
    }

    #[tokio::test]
    async fn test_bad_auth_code_leaves_state_untouched() {
        let (manager, storage) = manager_with(Arc::new(FakeAuth::default()));
        let err = manager.set_tokens_from_auth_code("bad").await.unwrap_err();
        assert!(matches!(err, TokenManagerError::AuthorizationFailed(_)));
        assert!(manager.get_current_tokens().await.is_none());
        assert!(storage.load_tokens().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_tokens() {
        let (manager, storage) = manager_with(Arc::new(FakeAuth::default()));
        install_stale(&manager).await;

        assert_ok!(manager.clear_tokens().await);
        assert!(manager.get_current_tokens().await.is_none());
        assert!(storage.load_tokens().await.unwrap().is_none());

        assert_ok!(manager.clear_tokens().await);
    }

    #[tokio::test]
    async fn test_refresh_keeps_seller_when_payload_omits_it() {
        let auth = Arc::new(FakeAuth {
            omit_seller: true,
            ..Default::default()
        });
        let (manager, storage) = manager_with(auth);
        let now = now_millis();
        manager
            .set_tokens_manually("old", "rt", now + 1_000, now + HOUR_MS, "seller-42", "小店")
            .await
            .unwrap();

        assert_eq!(manager.get_valid_access_token().await.unwrap(), "new-access-1");
        let current = manager.get_current_tokens().await.unwrap();
        assert_eq!(current.seller_id, "seller-42");
        assert_eq!(current.seller_name, "小店");

        let stored = storage.load_tokens().await.unwrap().unwrap();
        assert_eq!(stored.seller_id, "seller-42");
    }

    #[tokio::test]
    async fn test_force_refresh_on_fresh_token() {
        let auth = Arc::new(FakeAuth::default());
        let (manager, _) = manager_with(auth.clone());
        let now = now_millis();
        manager
            .set_tokens_manually("live", "rt", now + HOUR_MS, now + 24 * HOUR_MS, "s", "n")
            .await
            .unwrap();

        let refreshed = manager.force_refresh().await.unwrap();
        assert_eq!(refreshed.access_token, "new-access-1");
        assert_eq!(auth.refresh_calls.load(Ordering::SeqCst), 1);
    }
}
