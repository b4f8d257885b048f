//! Type coercion between value kinds
//!
//! All conversions between value kinds go through this module: the cast
//! functions wrap these with yield-null-on-failure semantics, while the
//! INSERT/UPDATE and table-loading paths call [`coerce_value`] directly and
//! surface failures as errors.

use crate::error::{Error, Result};
use crate::types::{DataType, Value};

pub mod numeric;
pub mod string;
pub mod temporal;

/// Coerce a value to the target type, erroring when the conversion loses
/// information or the input does not parse. Null passes through every
/// target; nullability is checked separately by constraints.
pub fn coerce_value(value: Value, target: &DataType) -> Result<Value> {
    if value.is_null() || &value.data_type() == target {
        return Ok(value);
    }
    match (value, target) {
        (v, DataType::Object) => Ok(v),

        (Value::Integer(n), DataType::Real) => Ok(Value::real(n as f64)),
        (Value::Integer(n), DataType::Decimal) => Ok(Value::Decimal(n.into())),
        (v @ Value::Real(_), DataType::Decimal) => numeric::real_to_decimal(v),
        (v, DataType::Integer) => numeric::to_integer(v),
        (v, DataType::Real) => numeric::to_real(v),
        (v, DataType::Decimal) => numeric::to_decimal(v),
        (v, DataType::Boolean) => string::to_boolean(v),
        (v, DataType::Str) => Ok(Value::Str(v.to_string())),
        (Value::Str(s), DataType::DateTime) => temporal::parse_datetime(&s),
        (Value::Str(s), DataType::Interval) => temporal::parse_interval(&s),
        (Value::List(items), DataType::List(inner)) => {
            let coerced: Result<Vec<_>> = items
                .into_iter()
                .map(|item| coerce_value(item, inner))
                .collect();
            Ok(Value::List(coerced?))
        }

        (v, target) => Err(Error::TypeMismatch {
            expected: target.to_string(),
            found: v.data_type().to_string(),
        }),
    }
}

/// Whether a value of type `from` can in principle be coerced to `to`.
pub fn can_coerce(from: &DataType, to: &DataType) -> bool {
    if from == to || matches!(from, DataType::Null) || matches!(to, DataType::Object) {
        return true;
    }
    matches!(
        (from, to),
        (DataType::Integer, DataType::Real | DataType::Decimal)
            | (DataType::Real, DataType::Integer | DataType::Decimal)
            | (DataType::Decimal, DataType::Integer | DataType::Real)
            | (DataType::Str, DataType::DateTime | DataType::Interval)
            | (_, DataType::Str)
            | (DataType::List(_), DataType::List(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_integer_widening() {
        assert_eq!(
            coerce_value(Value::Integer(3), &DataType::Real).unwrap(),
            Value::Real(3.0)
        );
    }

    #[test]
    fn test_coerce_string_to_datetime() {
        let v = coerce_value(Value::string("2024-01-15"), &DataType::DateTime).unwrap();
        assert!(matches!(v, Value::DateTime(_)));
    }

    #[test]
    fn test_coerce_incompatible_errors() {
        assert!(coerce_value(Value::Boolean(true), &DataType::DateTime).is_err());
    }
}
