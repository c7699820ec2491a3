//! # sqlenrich connectors
//!
//! Database drivers for `sqlenrich-core` lookups.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Connection pool configuration
pub mod config;

/// `PostgreSQL` lookups - pooled via `deadpool-postgres`
#[cfg(feature = "postgres")]
pub mod postgres;

pub use config::{PoolConfig, StatementCacheConfig};

#[cfg(feature = "postgres")]
pub use postgres::{connect, PgLookupPool};
