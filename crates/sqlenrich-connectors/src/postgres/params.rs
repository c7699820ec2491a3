//! Statement parameters for `tokio-postgres`.
//!
//! `PostgreSQL` infers a type for every `$n` when the statement is
//! prepared. [`PgParams`] receives the engine's typed setter calls and
//! coerces each value to the declared type, so a lookup parameter read
//! as a string can still be compared with an integer column.

use std::error::Error;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use num_traits::{FromPrimitive, ToPrimitive};
use sqlenrich_core::lookup::{BindTarget, SqlType};
use sqlenrich_core::{DriverError, Timestamp};
use pg_bigdecimal::PgNumeric;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

/// One bound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum PgParam {
    /// SQL `NULL`.
    Null,
    /// `bool`.
    Bool(bool),
    /// `int2`.
    Int2(i16),
    /// `int4`.
    Int4(i32),
    /// `int8`.
    Int8(i64),
    /// `float4`.
    Float4(f32),
    /// `float8`.
    Float8(f64),
    /// `numeric`.
    Numeric(BigDecimal),
    /// Any text type.
    Text(String),
    /// `date`.
    Date(NaiveDate),
    /// `timestamp`.
    Timestamp(NaiveDateTime),
    /// `timestamptz`.
    TimestampTz(DateTime<Utc>),
}

impl ToSql for PgParam {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Self::Null => Ok(IsNull::Yes),
            Self::Bool(v) => v.to_sql(ty, out),
            Self::Int2(v) => v.to_sql(ty, out),
            Self::Int4(v) => v.to_sql(ty, out),
            Self::Int8(v) => v.to_sql(ty, out),
            Self::Float4(v) => v.to_sql(ty, out),
            Self::Float8(v) => v.to_sql(ty, out),
            Self::Numeric(v) => to_pg_numeric(v)?.to_sql(ty, out),
            Self::Text(v) => v.to_sql(ty, out),
            Self::Date(v) => v.to_sql(ty, out),
            Self::Timestamp(v) => v.to_sql(ty, out),
            Self::TimestampTz(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// The wire codec's decimal may come from another `bigdecimal` release,
/// so values cross over in their textual form.
fn to_pg_numeric(v: &BigDecimal) -> Result<PgNumeric, Box<dyn Error + Sync + Send>> {
    Ok(PgNumeric::new(Some(v.to_string().parse()?)))
}

fn is_text(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

/// Parameters of one prepared statement, filled by position.
#[derive(Debug)]
pub struct PgParams {
    types: Vec<Type>,
    values: Vec<Option<PgParam>>,
}

impl PgParams {
    /// Empty parameters for a statement declaring `types`.
    #[must_use]
    pub fn new(types: &[Type]) -> Self {
        Self {
            types: types.to_vec(),
            values: vec![None; types.len()],
        }
    }

    /// The bound values, ready for `Client::query`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Bind`] naming the first unbound position.
    pub fn as_refs(&self) -> Result<Vec<&(dyn ToSql + Sync)>, DriverError> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_ref()
                    .map(|p| p as &(dyn ToSql + Sync))
                    .ok_or_else(|| DriverError::Bind {
                        position: i + 1,
                        message: "no value bound".into(),
                    })
            })
            .collect()
    }

    fn declared(&self, position: usize) -> Result<&Type, DriverError> {
        position
            .checked_sub(1)
            .and_then(|i| self.types.get(i))
            .ok_or_else(|| DriverError::Bind {
                position,
                message: format!("statement declares {} parameters", self.types.len()),
            })
    }

    fn put(&mut self, position: usize, param: PgParam) {
        self.values[position - 1] = Some(param);
    }

    fn coerce<F>(&mut self, position: usize, what: &str, f: F) -> Result<(), DriverError>
    where
        F: FnOnce(&Type) -> Option<PgParam>,
    {
        let ty = self.declared(position)?.clone();
        match f(&ty) {
            Some(param) => {
                self.put(position, param);
                Ok(())
            }
            None => Err(DriverError::Bind {
                position,
                message: format!("cannot bind {what} to parameter of type {ty}"),
            }),
        }
    }
}

fn from_i64(ty: &Type, v: i64) -> Option<PgParam> {
    match *ty {
        Type::INT8 => Some(PgParam::Int8(v)),
        Type::INT4 => i32::try_from(v).ok().map(PgParam::Int4),
        Type::INT2 => i16::try_from(v).ok().map(PgParam::Int2),
        Type::FLOAT8 => v.to_f64().map(PgParam::Float8),
        Type::FLOAT4 => v.to_f32().map(PgParam::Float4),
        Type::NUMERIC => Some(PgParam::Numeric(BigDecimal::from(v))),
        ref t if is_text(t) => Some(PgParam::Text(v.to_string())),
        _ => None,
    }
}

fn from_decimal(ty: &Type, v: &BigDecimal) -> Option<PgParam> {
    match *ty {
        Type::NUMERIC => Some(PgParam::Numeric(v.clone())),
        Type::FLOAT8 => v.to_f64().map(PgParam::Float8),
        Type::FLOAT4 => v.to_f32().map(PgParam::Float4),
        Type::INT8 | Type::INT4 | Type::INT2 if v.is_integer() => from_i64(ty, v.to_i64()?),
        ref t if is_text(t) => Some(PgParam::Text(v.to_string())),
        _ => None,
    }
}

fn from_f64(ty: &Type, v: f64) -> Option<PgParam> {
    match *ty {
        Type::FLOAT8 => Some(PgParam::Float8(v)),
        #[allow(clippy::cast_possible_truncation)]
        Type::FLOAT4 => Some(PgParam::Float4(v as f32)),
        Type::NUMERIC => BigDecimal::from_f64(v).map(PgParam::Numeric),
        ref t if is_text(t) => Some(PgParam::Text(v.to_string())),
        _ => None,
    }
}

fn from_timestamp(ty: &Type, v: Timestamp) -> Option<PgParam> {
    let dt = v.to_datetime()?;
    match *ty {
        Type::TIMESTAMPTZ => Some(PgParam::TimestampTz(dt)),
        Type::TIMESTAMP => Some(PgParam::Timestamp(dt.naive_utc())),
        Type::DATE => Some(PgParam::Date(dt.date_naive())),
        ref t if is_text(t) => Some(PgParam::Text(v.to_string())),
        _ => None,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn from_str(ty: &Type, s: &str) -> Option<PgParam> {
    match *ty {
        ref t if is_text(t) => Some(PgParam::Text(s.to_owned())),
        Type::INT8 | Type::INT4 | Type::INT2 => from_i64(ty, s.trim().parse().ok()?),
        Type::FLOAT8 | Type::FLOAT4 => from_f64(ty, s.trim().parse().ok()?),
        Type::NUMERIC => BigDecimal::from_str(s.trim()).ok().map(PgParam::Numeric),
        Type::BOOL => parse_bool(s).map(PgParam::Bool),
        Type::DATE => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .ok()
            .map(PgParam::Date),
        Type::TIMESTAMP => parse_datetime(s).map(|dt| PgParam::Timestamp(dt.naive_utc())),
        Type::TIMESTAMPTZ => parse_datetime(s).map(PgParam::TimestampTz),
        _ => None,
    }
}

impl BindTarget for PgParams {
    fn set_string(&mut self, position: usize, value: &str) -> Result<(), DriverError> {
        self.coerce(position, "string", |ty| from_str(ty, value))
    }

    fn set_decimal(&mut self, position: usize, value: &BigDecimal) -> Result<(), DriverError> {
        self.coerce(position, "decimal", |ty| from_decimal(ty, value))
    }

    fn set_long(&mut self, position: usize, value: i64) -> Result<(), DriverError> {
        self.coerce(position, "integer", |ty| from_i64(ty, value))
    }

    fn set_double(&mut self, position: usize, value: f64) -> Result<(), DriverError> {
        self.coerce(position, "double", |ty| from_f64(ty, value))
    }

    fn set_boolean(&mut self, position: usize, value: bool) -> Result<(), DriverError> {
        self.coerce(position, "boolean", |ty| match *ty {
            Type::BOOL => Some(PgParam::Bool(value)),
            ref t if is_text(t) => Some(PgParam::Text(value.to_string())),
            _ => None,
        })
    }

    fn set_timestamp(&mut self, position: usize, value: Timestamp) -> Result<(), DriverError> {
        self.coerce(position, "timestamp", |ty| from_timestamp(ty, value))
    }

    fn set_null(&mut self, position: usize, _sql_type: SqlType) -> Result<(), DriverError> {
        self.declared(position)?;
        self.put(position, PgParam::Null);
        Ok(())
    }
}
