//! # Lookup Module
//!
//! Named SQL lookups executed against a pooled connection.
//!
//! ## Module Overview
//!
//! - [`statement`]: `:name` placeholder compilation to positional markers
//! - [`binder`]: resolving parameter values from a record
//! - [`param_conv`]: binding [`Value`](crate::Value)s to a statement
//! - [`type_conv`]: converting result columns into [`Value`](crate::Value)s
//! - [`failures`]: per-call failure accumulator
//! - [`definition`]: one compiled lookup and its execution
//! - [`fetcher`]: registry of lookups sharing a pool
//! - [`source`]: pool / connection traits implemented by drivers

pub mod binder;
pub mod definition;
pub mod failures;
pub mod fetcher;
pub mod param_conv;
pub mod source;
pub mod sql_type;
pub mod statement;
pub mod type_conv;

pub use binder::ParameterBinder;
pub use definition::{LookupDefinition, ParameterSpec};
pub use failures::LookupFailures;
pub use fetcher::Fetcher;
pub use param_conv::BindTarget;
pub use source::{LookupConnection, LookupPool, QueryRows};
pub use sql_type::{ColumnMeta, SqlType};
pub use statement::{CompiledStatement, PlaceholderStyle};
pub use type_conv::{ConvertResult, ResultRow};
