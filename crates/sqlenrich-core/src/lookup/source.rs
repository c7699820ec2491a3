//! Database seams for lookup execution.
//!
//! [`LookupPool`] hands out scoped connections; a [`LookupConnection`]
//! prepares, binds and runs one statement and returns typed rows. Both use
//! RPITIT (Rust 1.75+) so implementations can be plain `async fn`s.
//!
//! Connections are returned to the pool when dropped, so every exit path
//! of a lookup releases its connection.

use std::future::Future;

use crate::error::DriverError;
use crate::lookup::sql_type::ColumnMeta;
use crate::lookup::statement::PlaceholderStyle;
use crate::lookup::type_conv::ResultRow;
use crate::value::Value;

/// Rows returned by one statement execution.
#[derive(Debug, Clone, Default)]
pub struct QueryRows<R> {
    /// Column metadata, in select-list order.
    pub columns: Vec<ColumnMeta>,
    /// Result rows, read forward once.
    pub rows: Vec<R>,
}

/// A shared pool of database connections.
pub trait LookupPool: Send + Sync {
    /// Connection type handed out by [`acquire`](Self::acquire).
    type Connection: LookupConnection;

    /// Check out a connection, waiting if the pool is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Connection`] if no connection can be obtained.
    fn acquire(&self) -> impl Future<Output = Result<Self::Connection, DriverError>> + Send;

    /// Run a trivial statement to confirm the database is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the probe fails.
    fn health_check(&self) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Marker syntax statements must be compiled to.
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Close the pool; subsequent acquisitions fail.
    fn close(&self);

    /// Name of the backing database, for logs.
    fn source_name(&self) -> &str;
}

/// One checked-out connection.
pub trait LookupConnection: Send {
    /// Row type produced by [`query`](Self::query).
    type Row: ResultRow + Send;

    /// Prepare `sql`, bind `params` at positions `1..=n` and execute it.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] on prepare, bind, execute or fetch failure.
    fn query(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<QueryRows<Self::Row>, DriverError>> + Send;
}
