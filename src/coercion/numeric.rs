//! Numeric coercions

use crate::error::{Error, Result};
use crate::types::Value;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// Convert to Integer, truncating fractional parts toward zero.
pub fn to_integer(value: Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Integer(_) => Ok(value),
        Value::Real(n) => {
            if n.is_finite() && (i64::MIN as f64..=i64::MAX as f64).contains(&n.trunc()) {
                Ok(Value::Integer(n.trunc() as i64))
            } else {
                Err(Error::InvalidValue(format!(
                    "number {} is out of integer range",
                    n
                )))
            }
        }
        Value::Decimal(d) => d
            .trunc()
            .to_i64()
            .map(Value::Integer)
            .ok_or_else(|| Error::InvalidValue(format!("numeric {} is out of integer range", d))),
        Value::Boolean(b) => Ok(Value::Integer(b as i64)),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| Error::InvalidValue(format!("cannot parse '{}' as integer", s))),
        v => Err(Error::TypeMismatch {
            expected: "integer".into(),
            found: v.data_type().to_string(),
        }),
    }
}

/// Convert to Real.
pub fn to_real(value: Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Real(_) => Ok(value),
        Value::Integer(n) => Ok(Value::real(n as f64)),
        Value::Decimal(d) => d
            .to_f64()
            .map(Value::real)
            .ok_or_else(|| Error::InvalidValue(format!("cannot represent {} as number", d))),
        Value::Boolean(b) => Ok(Value::real(b as i64 as f64)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::real)
            .map_err(|_| Error::InvalidValue(format!("cannot parse '{}' as number", s))),
        Value::Interval(i) => Ok(Value::real(i.as_days())),
        v => Err(Error::TypeMismatch {
            expected: "number".into(),
            found: v.data_type().to_string(),
        }),
    }
}

/// Convert to Decimal, preserving the textual scale when parsing strings.
pub fn to_decimal(value: Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Decimal(_) => Ok(value),
        Value::Integer(n) => Ok(Value::Decimal(n.into())),
        v @ Value::Real(_) => real_to_decimal(v),
        Value::Str(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Value::Decimal)
            .map_err(|_| Error::InvalidValue(format!("cannot parse '{}' as numeric", s))),
        v => Err(Error::TypeMismatch {
            expected: "numeric".into(),
            found: v.data_type().to_string(),
        }),
    }
}

pub fn real_to_decimal(value: Value) -> Result<Value> {
    match value {
        Value::Real(n) => Decimal::from_f64(n)
            .map(Value::Decimal)
            .ok_or_else(|| Error::InvalidValue(format!("cannot represent {} as numeric", n))),
        v => Err(Error::TypeMismatch {
            expected: "number".into(),
            found: v.data_type().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_integer_truncates_toward_zero() {
        assert_eq!(to_integer(Value::Real(2.9)).unwrap(), Value::Integer(2));
        assert_eq!(to_integer(Value::Real(-2.9)).unwrap(), Value::Integer(-2));
    }

    #[test]
    fn test_to_decimal_preserves_scale() {
        let v = to_decimal(Value::string("1.500")).unwrap();
        assert_eq!(v.to_string(), "1.500");
    }

    #[test]
    fn test_to_integer_rejects_garbage() {
        assert!(to_integer(Value::string("pear")).is_err());
    }
}
