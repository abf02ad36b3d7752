use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Catalog cache configuration
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        Ok(())
    }
}

/// Catalog cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Shared remote store. When absent the cache never leaves process memory.
    #[serde(default)]
    pub remote: Option<RemoteStoreConfig>,

    /// TTL for product listing pages, in seconds
    #[serde(default = "default_product_list_ttl_secs")]
    pub product_list_ttl_secs: u64,

    /// TTL for category trees, in seconds
    #[serde(default = "default_category_tree_ttl_secs")]
    pub category_tree_ttl_secs: u64,

    /// Interval of the background expiry sweep for in-process storage.
    /// Default: none (expired entries are dropped lazily on read)
    #[serde(default)]
    pub sweep_interval_secs: Option<u64>,
}

fn default_product_list_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_category_tree_ttl_secs() -> u64 {
    1800 // 30 minutes
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            remote: None,
            product_list_ttl_secs: default_product_list_ttl_secs(),
            category_tree_ttl_secs: default_category_tree_ttl_secs(),
            sweep_interval_secs: None,
        }
    }
}

impl CacheSettings {
    /// In-process only settings with default TTLs.
    pub fn in_process() -> Self {
        Self::default()
    }

    /// Default settings pointed at a remote store.
    pub fn with_remote(url: impl Into<String>) -> Self {
        Self {
            remote: Some(RemoteStoreConfig {
                url: url.into(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn product_list_ttl(&self) -> Duration {
        Duration::from_secs(self.product_list_ttl_secs)
    }

    pub fn category_tree_ttl(&self) -> Duration {
        Duration::from_secs(self.category_tree_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.product_list_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.product_list_ttl_secs must be > 0".into(),
            ));
        }
        if self.category_tree_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.category_tree_ttl_secs must be > 0".into(),
            ));
        }
        if self.sweep_interval_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "cache.sweep_interval_secs must be > 0 when set".into(),
            ));
        }
        if let Some(ref remote) = self.remote {
            remote.validate()?;
        }
        Ok(())
    }
}

/// Remote store (Redis) connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStoreConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_remote_pool_size")]
    pub pool_size: usize,

    /// Bound on the connect step and on every remote operation, in milliseconds
    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,

    /// Keys requested per SCAN step during prefix deletes
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,
}

fn default_remote_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_remote_pool_size() -> usize {
    10
}

fn default_remote_timeout_ms() -> u64 {
    2000
}

fn default_scan_batch_size() -> usize {
    100
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            url: default_remote_url(),
            pool_size: default_remote_pool_size(),
            timeout_ms: default_remote_timeout_ms(),
            scan_batch_size: default_scan_batch_size(),
        }
    }
}

impl RemoteStoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The URL with any credentials masked, for logging.
    pub fn display_url(&self) -> String {
        match (self.url.find("://"), self.url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}://***{}", &self.url[..scheme_end], &self.url[at..])
            }
            _ => self.url.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "cache.remote.url must not be empty".into(),
            ));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::Invalid(
                "cache.remote.pool_size must be > 0".into(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "cache.remote.timeout_ms must be > 0".into(),
            ));
        }
        if self.scan_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "cache.remote.scan_batch_size must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::{AppConfig, ConfigError};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "storefront.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                // An explicit path must exist.
                builder = builder.add_source(File::from(PathBuf::from(p)));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., STOREFRONT__CACHE__REMOTE__URL=redis://cache:6379
        builder = builder.add_source(
            Environment::with_prefix("STOREFRONT")
                .try_parsing(true)
                .separator("__"),
        );
        let merged: AppConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }
}
