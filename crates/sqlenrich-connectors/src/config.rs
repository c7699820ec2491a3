//! Connection pool configuration.
//!
//! [`PoolConfig`] is deserialized from the host's configuration or built
//! programmatically; every field except `connection_string` has a default.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use sqlenrich_core::ConfigError;

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_driver() -> String {
    "postgres".to_owned()
}

fn default_pool_name() -> String {
    "sqlenrich.lookup".to_owned()
}

/// One connection per available core, plus one.
fn default_max_size() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get) + 1
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_size() -> usize {
    250
}

fn default_cache_sql_limit() -> usize {
    2048
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Per-connection prepared statement cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementCacheConfig {
    /// Whether statements are cached at all.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Cached statements per connection before the cache is cleared.
    #[serde(default = "default_cache_size")]
    pub size: usize,
    /// Statements longer than this many bytes are never cached.
    #[serde(default = "default_cache_sql_limit")]
    pub sql_limit: usize,
}

impl Default for StatementCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            size: default_cache_size(),
            sql_limit: default_cache_sql_limit(),
        }
    }
}

impl StatementCacheConfig {
    /// Whether `sql` should go through the cache.
    #[must_use]
    pub fn caches(&self, sql: &str) -> bool {
        self.enabled && sql.len() <= self.sql_limit
    }
}

/// Lookup database connection and pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Driver name; `postgres` (or `postgresql`).
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Driver connection string (key-value or URI form).
    pub connection_string: String,
    /// User name; applied only together with `password`.
    #[serde(default)]
    pub username: Option<String>,
    /// Password; applied only together with `username`.
    #[serde(default)]
    pub password: Option<String>,
    /// Driver library paths. Drivers are linked in, so these are ignored.
    #[serde(default)]
    pub driver_libraries: Vec<String>,
    /// Pool name, reported to the server as the application name.
    #[serde(default = "default_pool_name")]
    pub pool_name: String,
    /// Maximum pooled connections.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Prepared statement cache.
    #[serde(default)]
    pub statement_cache: StatementCacheConfig,
    /// Maximum wait for a free connection, in milliseconds.
    #[serde(default)]
    pub wait_timeout_ms: Option<u64>,
    /// Maximum time to establish a connection, in milliseconds.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            connection_string: String::new(),
            username: None,
            password: None,
            driver_libraries: Vec::new(),
            pool_name: default_pool_name(),
            max_size: default_max_size(),
            statement_cache: StatementCacheConfig::default(),
            wait_timeout_ms: None,
            connect_timeout_ms: None,
        }
    }
}

impl PoolConfig {
    /// Config for `connection_string` with every other field defaulted.
    #[must_use]
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            ..Self::default()
        }
    }

    /// Username and password, when both are set and non-empty.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let user = self.username.as_deref().filter(|u| !u.is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((user, password))
    }

    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingOption`] for an empty connection string
    /// and [`ConfigError::InvalidOption`] for a zero pool size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection_string.trim().is_empty() {
            return Err(ConfigError::MissingOption("connection_string".into()));
        }
        if self.max_size == 0 {
            return Err(ConfigError::InvalidOption {
                key: "max_size".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
