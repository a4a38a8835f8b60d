//! Token persistence backends
//!
//! A [`TokenStorage`] is a pass-through to some durable medium. It never owns
//! the "current" token; [`TokenManager`](super::TokenManager) does. Storage is
//! read when the manager's cache is empty and written on every update.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use super::tokens::TokenInfo;

/// Failure of a storage medium.
///
/// Missing or unparsable data is *not* an error: `load_tokens` reports it as
/// `Ok(None)`. These variants cover the medium itself misbehaving.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("token storage I/O failed for {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize tokens: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Free-form failure from a custom backend (database, keychain, ...).
    #[error("token storage backend failed: {0}")]
    Backend(String),
}

/// Token storage trait for different persistence backends.
///
/// Implementations must report missing or corrupt data as `Ok(None)` rather
/// than as an error.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    async fn load_tokens(&self) -> Result<Option<TokenInfo>, StorageError>;
    async fn save_tokens(&self, tokens: &TokenInfo) -> Result<(), StorageError>;
    /// Remove stored tokens. Clearing empty storage succeeds.
    async fn clear_tokens(&self) -> Result<(), StorageError>;
}

/// Process-local storage. Lost when the process exits; never fails.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    tokens: Mutex<Option<TokenInfo>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<TokenInfo>> {
        // A panic while holding the guard cannot leave a half-written
        // TokenInfo behind, so a poisoned lock is still usable.
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn load_tokens(&self) -> Result<Option<TokenInfo>, StorageError> {
        Ok(self.slot().clone())
    }

    async fn save_tokens(&self, tokens: &TokenInfo) -> Result<(), StorageError> {
        *self.slot() = Some(tokens.clone());
        Ok(())
    }

    async fn clear_tokens(&self) -> Result<(), StorageError> {
        *self.slot() = None;
        Ok(())
    }
}

/// JSON file storage at a fixed path.
///
/// Writes go to a uniquely named sibling temp file which is then renamed over
/// the target, so readers never observe a half-written document.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn load_tokens(&self) -> Result<Option<TokenInfo>, StorageError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::warn!("Token file {} is not UTF-8, ignoring", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        match serde_json::from_str(&content) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(e) => {
                tracing::warn!(
                    "Token file {} is corrupt, treating as empty: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    async fn save_tokens(&self, tokens: &TokenInfo) -> Result<(), StorageError> {
        let dir = self.dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| self.io_error(e))?;

        let content = serde_json::to_string_pretty(tokens)?;
        let path = self.path.clone();

        // Each save gets its own temp file, so concurrent writers never share one.
        let written = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::Builder::new()
                .prefix(".tokens")
                .suffix(".tmp")
                .tempfile_in(&dir)?;
            tmp.write_all(content.as_bytes())?;

            // Set restrictive permissions on the token file before it becomes visible
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                tmp.as_file()
                    .set_permissions(std::fs::Permissions::from_mode(0o600))?;
            }

            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| self.io_error(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        written.map_err(|e| self.io_error(e))?;

        tracing::debug!("Tokens written to {}", self.path.display());
        Ok(())
    }

    async fn clear_tokens(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
