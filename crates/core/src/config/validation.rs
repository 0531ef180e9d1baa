//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

/// Longest accepted policy duration: one year.
pub const MAX_POLICY_DURATION_MS: i64 = 365 * 24 * 60 * 60 * 1000;

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - any policy duration is zero or negative, or longer than a year
    /// - `max_offline_ms` is shorter than `cache_expiry_ms`
    /// - `slow_net_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `origin` is not an absolute http(s) URL
    /// - `user_agent` is empty
    ///
    /// Returns `ConfigError::Missing` if `cache_tag` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("cache_expiry_ms", self.cache_expiry_ms),
            ("max_offline_ms", self.max_offline_ms),
            ("slow_net_remember_ms", self.slow_net_remember_ms),
            ("slow_net_retry_delay_ms", self.slow_net_retry_delay_ms),
        ] {
            if value <= 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
            if value > MAX_POLICY_DURATION_MS {
                return Err(invalid(field, "must not exceed one year (31536000000ms)"));
            }
        }

        if self.max_offline_ms < self.cache_expiry_ms {
            return Err(invalid("max_offline_ms", "must not be shorter than cache_expiry_ms"));
        }

        if self.slow_net_timeout_ms < 100 {
            return Err(invalid("slow_net_timeout_ms", "must be at least 100ms"));
        }
        if self.slow_net_timeout_ms > 300_000 {
            return Err(invalid("slow_net_timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.cache_tag.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_tag".into(),
                hint: "Set BUNDLECACHE_CACHE_TAG environment variable".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(_) => return Err(invalid("origin", "must use http or https")),
            Err(e) => return Err(invalid("origin", &e.to_string())),
        }

        if self.slow_net_retry_delay_ms < self.slow_net_remember_ms {
            tracing::warn!(
                remember_ms = self.slow_net_remember_ms,
                retry_delay_ms = self.slow_net_retry_delay_ms,
                "slow_net_retry_delay_ms is shorter than slow_net_remember_ms; retryAt is advisory only"
            );
        }

        Ok(())
    }
}
