//! `PostgreSQL` result columns.
//!
//! Maps server types onto [`SqlType`] codes and reads typed values out of
//! a [`tokio_postgres::Row`].

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlenrich_core::lookup::{ColumnMeta, ResultRow, SqlType};
use sqlenrich_core::{DriverError, Timestamp};
use pg_bigdecimal::PgNumeric;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{Column, Row};

/// Type code for a server type. Types without a converter map to
/// [`SqlType::Other`].
#[must_use]
pub fn sql_type_of(ty: &Type) -> SqlType {
    match *ty {
        Type::INT2 => SqlType::SmallInt,
        Type::INT4 => SqlType::Integer,
        Type::INT8 => SqlType::BigInt,
        Type::FLOAT4 => SqlType::Real,
        Type::FLOAT8 => SqlType::Double,
        Type::NUMERIC => SqlType::Numeric,
        Type::DATE => SqlType::Date,
        Type::TIME => SqlType::Time,
        Type::TIMESTAMP | Type::TIMESTAMPTZ => SqlType::Timestamp,
        Type::BOOL => SqlType::Boolean,
        Type::BPCHAR => SqlType::Char,
        Type::VARCHAR | Type::TEXT | Type::NAME => SqlType::VarChar,
        Type::VOID => SqlType::Null,
        _ => SqlType::Other,
    }
}

/// Column metadata for a prepared statement's output column.
#[must_use]
pub fn column_meta(column: &Column) -> ColumnMeta {
    ColumnMeta::new(column.name(), sql_type_of(column.type_()), column.type_().name())
}

/// One result row.
pub struct PgRow(Row);

impl PgRow {
    /// Wrap a driver row.
    #[must_use]
    pub fn new(row: Row) -> Self {
        Self(row)
    }

    fn column_type(&self, index: usize) -> Result<&Type, DriverError> {
        self.0
            .columns()
            .get(index)
            .map(Column::type_)
            .ok_or_else(|| DriverError::Read {
                column: index,
                message: format!("row has {} columns", self.0.len()),
            })
    }

    fn read<'a, T: FromSql<'a>>(&'a self, index: usize) -> Result<Option<T>, DriverError> {
        self.0
            .try_get::<_, Option<T>>(index)
            .map_err(|e| DriverError::Read {
                column: index,
                message: e.to_string(),
            })
    }

    fn unexpected(&self, index: usize, wanted: &str) -> DriverError {
        let found = self
            .column_type(index)
            .map_or_else(|_| "?".to_owned(), ToString::to_string);
        DriverError::Read {
            column: index,
            message: format!("cannot read {found} as {wanted}"),
        }
    }
}

impl ResultRow for PgRow {
    fn get_i64(&self, index: usize) -> Result<Option<i64>, DriverError> {
        match *self.column_type(index)? {
            Type::INT2 => Ok(self.read::<i16>(index)?.map(i64::from)),
            Type::INT4 => Ok(self.read::<i32>(index)?.map(i64::from)),
            Type::INT8 => self.read::<i64>(index),
            _ => Err(self.unexpected(index, "integer")),
        }
    }

    fn get_f64(&self, index: usize) -> Result<Option<f64>, DriverError> {
        match *self.column_type(index)? {
            Type::FLOAT4 => Ok(self.read::<f32>(index)?.map(f64::from)),
            Type::FLOAT8 => self.read::<f64>(index),
            _ => Err(self.unexpected(index, "float")),
        }
    }

    fn get_string(&self, index: usize) -> Result<Option<String>, DriverError> {
        match *self.column_type(index)? {
            Type::INT2 | Type::INT4 | Type::INT8 => {
                Ok(self.get_i64(index)?.map(|v| v.to_string()))
            }
            _ => self.read::<String>(index),
        }
    }

    fn get_decimal(&self, index: usize) -> Result<Option<BigDecimal>, DriverError> {
        let Some(numeric) = self.read::<PgNumeric>(index)? else {
            return Ok(None);
        };
        let Some(n) = numeric.n else {
            return Err(DriverError::Read {
                column: index,
                message: "NaN has no decimal representation".into(),
            });
        };
        BigDecimal::from_str(&n.to_string())
            .map(Some)
            .map_err(|e| DriverError::Read {
                column: index,
                message: e.to_string(),
            })
    }

    fn get_date(&self, index: usize) -> Result<Option<NaiveDate>, DriverError> {
        self.read::<NaiveDate>(index)
    }

    fn get_time(&self, index: usize) -> Result<Option<NaiveTime>, DriverError> {
        self.read::<NaiveTime>(index)
    }

    fn get_timestamp(&self, index: usize) -> Result<Option<Timestamp>, DriverError> {
        match *self.column_type(index)? {
            Type::TIMESTAMPTZ => Ok(self.read::<DateTime<Utc>>(index)?.map(Timestamp::from)),
            Type::TIMESTAMP => Ok(self
                .read::<NaiveDateTime>(index)?
                .map(Timestamp::from_datetime)),
            _ => Err(self.unexpected(index, "timestamp")),
        }
    }

    fn get_bool(&self, index: usize) -> Result<bool, DriverError> {
        Ok(self.read::<bool>(index)?.unwrap_or(false))
    }
}
