//! `PostgreSQL` lookup pool.
//!
//! [`PgLookupPool`] implements the engine's pool seam with
//! `deadpool-postgres`. Statements are compiled to `$n` markers, prepared
//! per connection (through deadpool's statement cache when the statement
//! is short enough) and bound by coercing each value to the parameter
//! type the server inferred.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sqlenrich_connectors::{connect, PoolConfig};
//! use sqlenrich_core::{LookupOptions, MemoryRecord};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut fetcher = connect(&PoolConfig::new("host=localhost dbname=app user=app")).await?;
//! fetcher.add_lookup(
//!     &LookupOptions::new("users", "SELECT name FROM users WHERE id = :id", "user")
//!         .with_parameter("id", "[user_id]"),
//! )?;
//! let mut record = MemoryRecord::new().with("user_id", 1_i64);
//! let failures = fetcher.fetch_and_update("users", &mut record).await?;
//! assert!(failures.is_successful());
//! # Ok(())
//! # }
//! ```

pub mod params;
pub mod types;

use std::time::Duration;

use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use sqlenrich_core::lookup::param_conv::bind_all;
use sqlenrich_core::lookup::{LookupConnection, LookupPool, PlaceholderStyle, QueryRows};
use sqlenrich_core::{ConfigError, DriverError, Fetcher, Value};
use tracing::{debug, info, warn};

use crate::config::{PoolConfig, StatementCacheConfig};
use params::PgParams;
use types::{column_meta, PgRow};

const SUPPORTED_DRIVERS: [&str; 2] = ["postgres", "postgresql"];

/// Pooled `PostgreSQL` connections for lookups.
pub struct PgLookupPool {
    pool: Pool,
    name: String,
    statement_cache: StatementCacheConfig,
}

impl PgLookupPool {
    /// Build the pool. No connection is opened until first use.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the driver is not `PostgreSQL`, the
    /// connection string does not parse or the pool cannot be built.
    pub fn new(config: &PoolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        if !SUPPORTED_DRIVERS.contains(&config.driver.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::UnsupportedDriver(config.driver.clone()));
        }
        if !config.driver_libraries.is_empty() {
            warn!(
                libraries = ?config.driver_libraries,
                "driver libraries are ignored; the PostgreSQL driver is built in"
            );
        }

        let mut pg_config: tokio_postgres::Config =
            config
                .connection_string
                .parse()
                .map_err(|e| ConfigError::InvalidOption {
                    key: "connection_string".into(),
                    message: format!("{e}"),
                })?;
        if let Some((user, password)) = config.credentials() {
            pg_config.user(user);
            pg_config.password(password);
        }
        if let Some(ms) = config.connect_timeout_ms {
            pg_config.connect_timeout(Duration::from_millis(ms));
        }
        pg_config.application_name(&config.pool_name);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);

        let mut builder = Pool::builder(mgr)
            .max_size(config.max_size)
            .runtime(Runtime::Tokio1);
        if let Some(ms) = config.wait_timeout_ms {
            builder = builder.wait_timeout(Some(Duration::from_millis(ms)));
        }
        let pool = builder
            .build()
            .map_err(|e| ConfigError::Pool(e.to_string()))?;

        Ok(Self {
            pool,
            name: config.pool_name.clone(),
            statement_cache: config.statement_cache.clone(),
        })
    }

    /// Configured maximum number of connections.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.pool.status().max_size
    }

    /// Connections currently open, idle or checked out.
    #[must_use]
    pub fn size(&self) -> usize {
        self.pool.status().size
    }

    /// Whether [`close`](LookupPool::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

impl LookupPool for PgLookupPool {
    type Connection = PgConnection;

    async fn acquire(&self) -> Result<PgConnection, DriverError> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| DriverError::Connection(format!("pool get failed: {e}")))?;
        Ok(PgConnection {
            client,
            statement_cache: self.statement_cache.clone(),
        })
    }

    async fn health_check(&self) -> Result<(), DriverError> {
        let client = self.pool.get().await.map_err(|e| {
            DriverError::Connection(format!("health check pool get failed: {e}"))
        })?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| DriverError::Query(Box::new(e)))?;
        Ok(())
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    fn close(&self) {
        self.pool.close();
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

/// A checked-out `PostgreSQL` connection; returned to the pool on drop.
pub struct PgConnection {
    client: Object,
    statement_cache: StatementCacheConfig,
}

impl LookupConnection for PgConnection {
    type Row = PgRow;

    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryRows<PgRow>, DriverError> {
        let prepared = if self.statement_cache.caches(sql) {
            let cache = &self.client.statement_cache;
            if cache.size() >= self.statement_cache.size {
                debug!(size = cache.size(), "clearing prepared statement cache");
                cache.clear();
            }
            self.client.prepare_cached(sql).await
        } else {
            self.client.prepare(sql).await
        };
        let statement = prepared.map_err(|e| DriverError::Prepare(Box::new(e)))?;

        let mut bound = PgParams::new(statement.params());
        bind_all(&mut bound, params)?;
        let rows = self
            .client
            .query(&statement, &bound.as_refs()?)
            .await
            .map_err(|e| DriverError::Query(Box::new(e)))?;

        Ok(QueryRows {
            columns: statement.columns().iter().map(column_meta).collect(),
            rows: rows.into_iter().map(PgRow::new).collect(),
        })
    }
}

/// Build a `PostgreSQL` pool from `config` and return a connected
/// [`Fetcher`].
///
/// # Errors
///
/// Returns [`ConfigError`] if the configuration is invalid or the
/// validation probe (`SELECT 1`) fails.
pub async fn connect(config: &PoolConfig) -> Result<Fetcher<PgLookupPool>, ConfigError> {
    let pool = PgLookupPool::new(config)?;
    let fetcher = Fetcher::connect(pool).await?;
    info!(pool = %config.pool_name, max_size = config.max_size, "lookup pool ready");
    Ok(fetcher)
}
