//! # sqlenrich core
//!
//! Lookup engine that enriches records with the results of parameterized
//! SQL statements.
//!
//! A lookup is configured once (statement, named parameters, target field)
//! and executed per record: parameters are resolved from the record,
//! bound positionally, the statement runs on a pooled connection and the
//! converted rows are written back to the record. Expected problems
//! (missing fields, unsupported column types, unknown lookup ids) are
//! reported through [`LookupFailures`](lookup::LookupFailures) rather than
//! as errors.
//!
//! The database side is abstracted by the traits in [`lookup::source`];
//! `sqlenrich-connectors` provides the `PostgreSQL` implementation.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Lookup configuration types
pub mod config;

/// Record enrichment - applies every configured lookup with tagging and defaults
pub mod enrich;

/// Error types
pub mod error;

/// Lookup execution - statements, binders, converters, registry
pub mod lookup;

/// Record interface and an in-memory implementation
pub mod record;

/// Dynamic value model exchanged between records and the database
pub mod value;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{EnrichConfig, LookupOptions, LookupSpec};
pub use enrich::{EnrichOutcome, Enricher};
pub use error::{ConfigError, DriverError, FetchError, FormatError};
pub use lookup::{Fetcher, LookupDefinition, LookupFailures};
pub use record::{MemoryRecord, Record};
pub use value::{Timestamp, Value};
