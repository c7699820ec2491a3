//! [`Value`] to statement parameter binding.
//!
//! [`bind`] dispatches on the value variant and calls the matching typed
//! setter of a [`BindTarget`]. Positions are 1-based.

use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;

use crate::error::DriverError;
use crate::lookup::sql_type::SqlType;
use crate::value::{Timestamp, Value};

/// Typed parameter setters of a prepared statement.
///
/// Every setter returns [`DriverError::Bind`] when the driver rejects the
/// value for the parameter at `position`.
#[allow(clippy::missing_errors_doc)]
pub trait BindTarget {
    /// Bind text.
    fn set_string(&mut self, position: usize, value: &str) -> Result<(), DriverError>;
    /// Bind an exact decimal.
    fn set_decimal(&mut self, position: usize, value: &BigDecimal) -> Result<(), DriverError>;
    /// Bind a 64-bit integer.
    fn set_long(&mut self, position: usize, value: i64) -> Result<(), DriverError>;
    /// Bind a double.
    fn set_double(&mut self, position: usize, value: f64) -> Result<(), DriverError>;
    /// Bind a boolean.
    fn set_boolean(&mut self, position: usize, value: bool) -> Result<(), DriverError>;
    /// Bind a timestamp.
    fn set_timestamp(&mut self, position: usize, value: Timestamp) -> Result<(), DriverError>;
    /// Bind SQL `NULL` typed as `sql_type`.
    fn set_null(&mut self, position: usize, sql_type: SqlType) -> Result<(), DriverError>;
}

/// Bind `value` at `position`.
///
/// Big integers that fit in 63 bits plus sign are bound as longs, larger
/// ones as decimals. `Null` and composite values are bound as a `NULL`
/// typed `INTEGER`.
///
/// # Errors
///
/// Propagates the setter's [`DriverError`].
pub fn bind<T: BindTarget + ?Sized>(
    position: usize,
    target: &mut T,
    value: &Value,
) -> Result<(), DriverError> {
    match value {
        Value::String(s) => target.set_string(position, s),
        Value::Decimal(d) => target.set_decimal(position, d),
        Value::Integer(i) => target.set_long(position, *i),
        Value::BigInteger(i) => match i.to_i64() {
            Some(small) => target.set_long(position, small),
            None => target.set_decimal(position, &BigDecimal::new(i.clone(), 0)),
        },
        Value::Double(d) => target.set_double(position, *d),
        Value::Boolean(b) => target.set_boolean(position, *b),
        Value::Timestamp(ts) => target.set_timestamp(position, *ts),
        Value::Null | Value::Array(_) | Value::Map(_) => {
            target.set_null(position, SqlType::Integer)
        }
    }
}

/// Bind `values` at positions `1..=values.len()`.
///
/// # Errors
///
/// Stops at and returns the first setter error.
pub fn bind_all<T: BindTarget + ?Sized>(target: &mut T, values: &[Value]) -> Result<(), DriverError> {
    for (i, value) in values.iter().enumerate() {
        bind(i + 1, target, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Bound, RecordingTarget};
    use num_bigint::BigInt;
    use std::collections::BTreeMap;

    fn bound(value: &Value) -> Bound {
        let mut target = RecordingTarget::default();
        bind(1, &mut target, value).unwrap();
        assert_eq!(target.calls.len(), 1);
        let (position, call) = target.calls.remove(0);
        assert_eq!(position, 1);
        call
    }

    #[test]
    fn test_big_integer_within_63_bits_binds_as_long() {
        let v = Value::BigInteger(BigInt::from(1_i64 << 62));
        assert_eq!(bound(&v), Bound::Long(1_i64 << 62));
    }

    #[test]
    fn test_big_integer_beyond_63_bits_binds_as_decimal() {
        let big = BigInt::from(1_u8) << 70_usize;
        let v = Value::BigInteger(big.clone());
        assert_eq!(bound(&v), Bound::Decimal(BigDecimal::new(big, 0)));
    }

    #[test]
    fn test_scalars_use_matching_setters() {
        assert_eq!(bound(&Value::from("x")), Bound::String("x".into()));
        assert_eq!(bound(&Value::from(7_i64)), Bound::Long(7));
        assert_eq!(bound(&Value::from(1.5)), Bound::Double(1.5));
        assert_eq!(bound(&Value::from(true)), Bound::Boolean(true));
        let ts = Timestamp::from_millis(1_000);
        assert_eq!(bound(&Value::Timestamp(ts)), Bound::Timestamp(ts));
    }

    #[test]
    fn test_null_and_composites_bind_null_integer() {
        assert_eq!(bound(&Value::Null), Bound::Null(SqlType::Integer));
        assert_eq!(bound(&Value::Array(vec![])), Bound::Null(SqlType::Integer));
        assert_eq!(
            bound(&Value::Map(BTreeMap::new())),
            Bound::Null(SqlType::Integer)
        );
    }

    #[test]
    fn test_bind_all_numbers_positions_from_one() {
        let mut target = RecordingTarget::default();
        bind_all(&mut target, &[Value::from("b"), Value::from("a")]).unwrap();
        assert_eq!(
            target.calls,
            vec![
                (1, Bound::String("b".into())),
                (2, Bound::String("a".into()))
            ]
        );
    }
}
