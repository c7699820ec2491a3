//! Error types for the lookup engine.
//!
//! Three layers of errors exist:
//!
//! - [`ConfigError`]: fatal, raised while building a [`Fetcher`](crate::Fetcher)
//!   or registering lookups.
//! - [`DriverError`]: raised by the database seams while a lookup executes.
//!   These never reach callers of `fetch_and_update`; they are logged and
//!   replaced by [`FetchError`].
//! - [`FormatError`]: template interpolation failures from
//!   [`Record::format`](crate::Record::format).

use thiserror::Error;

use std::error::Error as StdError;

/// Boxed error used for wrapped driver failures.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors raised while configuring lookups or connecting the pool.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required lookup option is absent.
    #[error("Required option '{0}' is missing")]
    MissingOption(String),

    /// Two lookups were registered under the same id.
    #[error("a lookup with id '{0}' is already registered")]
    DuplicateLookup(String),

    /// An option has an unusable value.
    #[error("invalid option '{key}': {message}")]
    InvalidOption {
        /// The option name.
        key: String,
        /// What was wrong with the value.
        message: String,
    },

    /// The configured driver is not one this build links.
    #[error("unsupported driver: {0}")]
    UnsupportedDriver(String),

    /// The validation probe could not reach the database.
    #[error("Could not connect to the lookup database, check the connection string: {0}")]
    Connection(String),

    /// The connection pool could not be created.
    #[error("pool creation failed: {0}")]
    Pool(String),

    /// Several lookup definitions are invalid; messages are joined with `"; "`.
    #[error("{0}")]
    Validation(String),
}

/// Errors raised by a database driver while a lookup executes.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A connection could not be obtained from the pool.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The statement could not be prepared.
    #[error("prepare failed")]
    Prepare(#[source] BoxError),

    /// A parameter could not be bound.
    #[error("bind failed at position {position}: {message}")]
    Bind {
        /// 1-based parameter position.
        position: usize,
        /// What was wrong with the value.
        message: String,
    },

    /// The statement failed to execute.
    #[error("query failed")]
    Query(#[source] BoxError),

    /// A column value could not be read from a result row.
    #[error("read failed for column {column}: {message}")]
    Read {
        /// 0-based column index.
        column: usize,
        /// Driver detail.
        message: String,
    },
}

impl DriverError {
    /// This error followed by its first `limit` causes, joined with `": "`.
    #[must_use]
    pub fn detail(&self, limit: usize) -> String {
        std::iter::once(self.to_string())
            .chain(causes(self, limit))
            .collect::<Vec<_>>()
            .join(": ")
    }
}

/// Number of error causes reported for a driver failure.
pub(crate) const MAX_CAUSES: usize = 10;

/// Display strings of the first `limit` entries of `err`'s source chain.
pub(crate) fn causes(err: &dyn StdError, limit: usize) -> Vec<String> {
    std::iter::successors(err.source(), |&e| e.source())
        .take(limit)
        .map(ToString::to_string)
        .collect()
}

/// A lookup hit a database error.
///
/// The driver detail has already been logged together with the lookup id;
/// this error deliberately carries nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lookup '{lookup_id}': a database error occurred, it has been logged already")]
pub struct FetchError {
    lookup_id: String,
}

impl FetchError {
    pub(crate) fn new(lookup_id: impl Into<String>) -> Self {
        Self {
            lookup_id: lookup_id.into(),
        }
    }

    /// The id of the lookup that failed.
    #[must_use]
    pub fn lookup_id(&self) -> &str {
        &self.lookup_id
    }
}

/// Errors raised while interpolating a `%{field}` template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// A `%{` was never closed.
    #[error("unterminated reference at byte {0}")]
    Unterminated(usize),

    /// A reference names an unusable field path.
    #[error("invalid field reference '{0}'")]
    InvalidReference(String),
}
