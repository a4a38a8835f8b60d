//! Client configuration and the on-disk CLI profile

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::auth::{
    FileTokenStorage, MemoryTokenStorage, TokenStorage, DEFAULT_REFRESH_BUFFER_SECONDS,
};

pub const DEFAULT_BASE_URL: &str = "https://openapi.xiaohongshu.com";
pub const DEFAULT_VERSION: &str = "2.0";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything an [`XhsClient`](crate::XhsClient) needs to talk to the platform
/// and manage tokens.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub app_id: String,
    pub app_secret: String,
    pub version: String,
    pub timeout: Duration,
    /// Refresh once the access token has this many seconds or fewer left.
    pub token_refresh_buffer_seconds: i64,
    pub token_storage: Arc<dyn TokenStorage>,
}

impl ClientConfig {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            version: DEFAULT_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            token_refresh_buffer_seconds: DEFAULT_REFRESH_BUFFER_SECONDS,
            token_storage: Arc::new(MemoryTokenStorage::new()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_refresh_buffer_seconds(mut self, seconds: i64) -> Self {
        self.token_refresh_buffer_seconds = seconds;
        self
    }

    pub fn with_token_storage(mut self, storage: Arc<dyn TokenStorage>) -> Self {
        self.token_storage = storage;
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("version", &self.version)
            .field("timeout", &self.timeout)
            .field(
                "token_refresh_buffer_seconds",
                &self.token_refresh_buffer_seconds,
            )
            .finish_non_exhaustive()
    }
}

/// Persistent profile used by the `xhs` command-line tool
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    /// Open platform base URL (defaults to production)
    pub base_url: Option<String>,
    pub version: Option<String>,
    pub refresh_buffer_seconds: Option<i64>,
    /// Where tokens are persisted (defaults to the data directory)
    pub token_file: Option<PathBuf>,
}

impl Config {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "xhs-ecommerce", "xhs-ecommerce")
            .context("Could not determine config directory")
    }

    /// Default profile path
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Default token file path
    pub fn default_token_file() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("tokens.json"))
    }

    /// Load the profile from `path`, or defaults if it does not exist
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Save the profile to `path`
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains the app secret)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    pub fn token_file(&self) -> Result<PathBuf> {
        match &self.token_file {
            Some(path) => Ok(path.clone()),
            None => Self::default_token_file(),
        }
    }

    /// Build a library config backed by file token storage
    pub fn to_client_config(&self) -> Result<ClientConfig> {
        let app_id = self
            .app_id
            .clone()
            .context("No app_id configured. Run 'xhs configure'.")?;
        let app_secret = self
            .app_secret
            .clone()
            .context("No app_secret configured. Run 'xhs configure'.")?;

        let mut config = ClientConfig::new(app_id, app_secret)
            .with_token_storage(Arc::new(FileTokenStorage::new(self.token_file()?)));
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(version) = &self.version {
            config = config.with_version(version.clone());
        }
        if let Some(buffer) = self.refresh_buffer_seconds {
            config = config.with_refresh_buffer_seconds(buffer);
        }
        Ok(config)
    }
}
