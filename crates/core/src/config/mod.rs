//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BUNDLECACHE_*)
//! 2. TOML config file (if BUNDLECACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// All policy durations are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding resources and metadata.
    ///
    /// Set via BUNDLECACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin that same-origin manifest paths and request paths resolve against.
    ///
    /// Set via BUNDLECACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Optional JSON asset manifest. The built-in manifest is used when unset.
    ///
    /// Set via BUNDLECACHE_MANIFEST_PATH environment variable.
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,

    /// Cache generation tag. Changing it drops every other generation on startup.
    ///
    /// Set via BUNDLECACHE_CACHE_TAG environment variable.
    #[serde(default = "default_cache_tag")]
    pub cache_tag: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via BUNDLECACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Age after which a cached entry is refreshed (CACHE_EXPIRY).
    #[serde(default = "default_cache_expiry_ms")]
    pub cache_expiry_ms: i64,

    /// Age after which a navigation gets the sentinel instead of a stale copy (MAX_OFFLINE_DAYS).
    #[serde(default = "default_max_offline_ms")]
    pub max_offline_ms: i64,

    /// Bound on every policy-driven network attempt (SLOW_NET_TIMEOUT).
    #[serde(default = "default_slow_net_timeout_ms")]
    pub slow_net_timeout_ms: u64,

    /// How long a failed attempt keeps the network distrusted (SLOW_NET_REMEMBER).
    #[serde(default = "default_slow_net_remember_ms")]
    pub slow_net_remember_ms: i64,

    /// Advisory retry point recorded alongside the slow flag (SLOW_NET_RETRY_DELAY).
    #[serde(default = "default_slow_net_retry_delay_ms")]
    pub slow_net_retry_delay_ms: i64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./bundlecache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_cache_tag() -> String {
    "bundlecache-v1".into()
}

fn default_user_agent() -> String {
    "bundlecache/0.1".into()
}

fn default_cache_expiry_ms() -> i64 {
    86_400_000 // 1 day
}

fn default_max_offline_ms() -> i64 {
    1_209_600_000 // 14 days
}

fn default_slow_net_timeout_ms() -> u64 {
    2_500
}

fn default_slow_net_remember_ms() -> i64 {
    5_400_000 // 1.5 hours
}

fn default_slow_net_retry_delay_ms() -> i64 {
    7_200_000 // 2 hours
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            manifest_path: None,
            cache_tag: default_cache_tag(),
            user_agent: default_user_agent(),
            cache_expiry_ms: default_cache_expiry_ms(),
            max_offline_ms: default_max_offline_ms(),
            slow_net_timeout_ms: default_slow_net_timeout_ms(),
            slow_net_remember_ms: default_slow_net_remember_ms(),
            slow_net_retry_delay_ms: default_slow_net_retry_delay_ms(),
        }
    }
}

impl AppConfig {
    /// Bounded-fetch timeout as Duration for use with tokio.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.slow_net_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BUNDLECACHE_`
    /// 2. TOML file from `BUNDLECACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be read or parsed, or if
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BUNDLECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("BUNDLECACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
