//! Driver-independent SQL type codes and column metadata.

use std::fmt;

/// SQL type of a result column, as reported by the driver.
///
/// Drivers map their native type identifiers onto these codes; anything
/// without a converter is reported as [`SqlType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    /// 8-bit integer.
    TinyInt,
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Single precision float.
    Real,
    /// Float of driver-defined precision.
    Float,
    /// Double precision float.
    Double,
    /// Exact numeric.
    Numeric,
    /// Exact decimal.
    Decimal,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    Timestamp,
    /// Boolean.
    Boolean,
    /// Single bit.
    Bit,
    /// The `NULL` type.
    Null,
    /// Fixed-width character string.
    Char,
    /// Variable-width character string.
    VarChar,
    /// Fixed-width national character string.
    NChar,
    /// Variable-width national character string.
    NVarChar,
    /// Any type without a converter.
    Other,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Real => "REAL",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Numeric => "NUMERIC",
            Self::Decimal => "DECIMAL",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Boolean => "BOOLEAN",
            Self::Bit => "BIT",
            Self::Null => "NULL",
            Self::Char => "CHAR",
            Self::VarChar => "VARCHAR",
            Self::NChar => "NCHAR",
            Self::NVarChar => "NVARCHAR",
            Self::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Column label as returned by the query.
    pub label: String,
    /// Mapped type code.
    pub sql_type: SqlType,
    /// Driver's own name for the type, used in diagnostics.
    pub type_name: String,
}

impl ColumnMeta {
    /// Create column metadata.
    #[must_use]
    pub fn new(label: impl Into<String>, sql_type: SqlType, type_name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sql_type,
            type_name: type_name.into(),
        }
    }
}
