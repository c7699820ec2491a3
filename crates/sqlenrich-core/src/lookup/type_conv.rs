//! SQL column to [`Value`] conversion.
//!
//! Dispatch is a static table from [`SqlType`] to a reader function.
//! Every reader maps SQL `NULL` to [`Value::Null`], except the boolean
//! readers: drivers report a `NULL` boolean as `false`, and that is what
//! ends up in the record.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime};
use num_bigint::BigInt;

use crate::error::DriverError;
use crate::lookup::sql_type::{ColumnMeta, SqlType};
use crate::value::{Timestamp, Value};

/// Typed read access to one result row.
///
/// Column indexes are 0-based. Each accessor returns `Ok(None)` for SQL
/// `NULL`.
pub trait ResultRow {
    /// Read an integer column.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Read`] if the column cannot be read as an integer.
    fn get_i64(&self, index: usize) -> Result<Option<i64>, DriverError>;

    /// Read a floating point column.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Read`] if the column cannot be read as a float.
    fn get_f64(&self, index: usize) -> Result<Option<f64>, DriverError>;

    /// Read a column in its textual form.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Read`] if the column cannot be read as text.
    fn get_string(&self, index: usize) -> Result<Option<String>, DriverError>;

    /// Read a national character column.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Read`] if the column cannot be read as text.
    fn get_nstring(&self, index: usize) -> Result<Option<String>, DriverError> {
        self.get_string(index)
    }

    /// Read an exact numeric column.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Read`] if the column cannot be read as a decimal.
    fn get_decimal(&self, index: usize) -> Result<Option<BigDecimal>, DriverError>;

    /// Read a date column.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Read`] if the column cannot be read as a date.
    fn get_date(&self, index: usize) -> Result<Option<NaiveDate>, DriverError>;

    /// Read a time-of-day column.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Read`] if the column cannot be read as a time.
    fn get_time(&self, index: usize) -> Result<Option<NaiveTime>, DriverError>;

    /// Read a timestamp column, normalized to UTC.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Read`] if the column cannot be read as a timestamp.
    fn get_timestamp(&self, index: usize) -> Result<Option<Timestamp>, DriverError>;

    /// Read a boolean column; `NULL` reads as `false`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Read`] if the column cannot be read as a boolean.
    fn get_bool(&self, index: usize) -> Result<bool, DriverError>;
}

/// Outcome of converting one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertResult {
    /// The column converted; `field` is the column label.
    Success {
        /// Column label.
        field: String,
        /// Converted value.
        value: Value,
    },
    /// The column type has no converter.
    Failure(String),
}

/// Reader function for one SQL type.
pub type ConvertFn<R> = fn(&R, usize) -> Result<Value, DriverError>;

/// Converter registered for `sql_type`, if any.
#[must_use]
pub fn converter_for<R: ResultRow>(sql_type: SqlType) -> Option<ConvertFn<R>> {
    let f: ConvertFn<R> = match sql_type {
        SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer => read_integer::<R>,
        SqlType::Real | SqlType::Float | SqlType::Double => read_double::<R>,
        SqlType::BigInt => read_big_integer::<R>,
        SqlType::Numeric | SqlType::Decimal => read_decimal::<R>,
        SqlType::Date => read_date::<R>,
        SqlType::Time => read_time::<R>,
        SqlType::Timestamp => read_timestamp::<R>,
        SqlType::Boolean | SqlType::Bit => read_boolean::<R>,
        SqlType::Null => read_null::<R>,
        SqlType::Char | SqlType::VarChar => read_string::<R>,
        SqlType::NChar | SqlType::NVarChar => read_nstring::<R>,
        SqlType::Other => return None,
    };
    Some(f)
}

/// Convert column `index` of `row` according to `column`.
///
/// Unsupported types produce [`ConvertResult::Failure`] with a diagnostic
/// naming the column and the driver's type name.
///
/// # Errors
///
/// Returns [`DriverError`] only when the driver fails to read the value.
pub fn convert<R: ResultRow>(
    column: &ColumnMeta,
    index: usize,
    row: &R,
) -> Result<ConvertResult, DriverError> {
    let Some(read) = converter_for::<R>(column.sql_type) else {
        return Ok(ConvertResult::Failure(unsupported_type_message(column)));
    };
    Ok(ConvertResult::Success {
        field: column.label.clone(),
        value: read(row, index)?,
    })
}

/// Diagnostic recorded for a column whose type has no converter.
#[must_use]
pub fn unsupported_type_message(column: &ColumnMeta) -> String {
    format!(
        "Could not convert SQL Type into suitable Ruby type to store in the event, \
         column name is '{}', SQL type is '{}'",
        column.label, column.type_name
    )
}

fn read_integer<R: ResultRow>(row: &R, index: usize) -> Result<Value, DriverError> {
    Ok(row.get_i64(index)?.into())
}

fn read_double<R: ResultRow>(row: &R, index: usize) -> Result<Value, DriverError> {
    Ok(row.get_f64(index)?.into())
}

fn read_big_integer<R: ResultRow>(row: &R, index: usize) -> Result<Value, DriverError> {
    let Some(text) = row.get_string(index)? else {
        return Ok(Value::Null);
    };
    BigInt::from_str(text.trim())
        .map(Value::BigInteger)
        .map_err(|e| DriverError::Read {
            column: index,
            message: format!("'{text}' is not an integer: {e}"),
        })
}

fn read_decimal<R: ResultRow>(row: &R, index: usize) -> Result<Value, DriverError> {
    Ok(row.get_decimal(index)?.into())
}

fn read_date<R: ResultRow>(row: &R, index: usize) -> Result<Value, DriverError> {
    Ok(row.get_date(index)?.map(Timestamp::from_date).into())
}

fn read_time<R: ResultRow>(row: &R, index: usize) -> Result<Value, DriverError> {
    Ok(row.get_time(index)?.map(Timestamp::from_time).into())
}

fn read_timestamp<R: ResultRow>(row: &R, index: usize) -> Result<Value, DriverError> {
    Ok(row.get_timestamp(index)?.into())
}

fn read_boolean<R: ResultRow>(row: &R, index: usize) -> Result<Value, DriverError> {
    Ok(Value::Boolean(row.get_bool(index)?))
}

fn read_null<R: ResultRow>(_row: &R, _index: usize) -> Result<Value, DriverError> {
    Ok(Value::Null)
}

fn read_string<R: ResultRow>(row: &R, index: usize) -> Result<Value, DriverError> {
    Ok(row.get_string(index)?.into())
}

fn read_nstring<R: ResultRow>(row: &R, index: usize) -> Result<Value, DriverError> {
    Ok(row.get_nstring(index)?.into())
}
