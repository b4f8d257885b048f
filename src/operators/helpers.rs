//! Shared numeric promotion and comparison helpers for operators

use crate::coercion::temporal;
use crate::error::Result;
use crate::types::{DataType, Signature, Value};
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// The standard overload set for a symmetric arithmetic operator: Integer
/// stays Integer, Decimal contaminates, everything else is Real.
pub fn numeric_signatures() -> Vec<Signature> {
    vec![
        Signature::new(vec![DataType::Integer, DataType::Integer], DataType::Integer),
        Signature::new(vec![DataType::Decimal, DataType::Decimal], DataType::Decimal),
        Signature::new(vec![DataType::Decimal, DataType::Real], DataType::Decimal),
        Signature::new(vec![DataType::Real, DataType::Decimal], DataType::Decimal),
        Signature::new(vec![DataType::Real, DataType::Real], DataType::Real),
    ]
}

/// Numeric pair promoted to a common representation for arithmetic.
pub enum NumericPair {
    Integers(i64, i64),
    Decimals(Decimal, Decimal),
    Reals(f64, f64),
}

/// Promotes two numeric values: Integer/Integer stays exact, any Decimal
/// promotes both sides to Decimal, otherwise both go to f64. Returns None
/// for non-numeric operands.
pub fn promote(left: &Value, right: &Value) -> Option<NumericPair> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(NumericPair::Integers(*a, *b)),
        (Value::Decimal(_), _) | (_, Value::Decimal(_)) => {
            Some(NumericPair::Decimals(left.to_decimal()?, right.to_decimal()?))
        }
        _ => Some(NumericPair::Reals(left.as_f64()?, right.as_f64()?)),
    }
}

/// Compares two values with the documented cross-type coercions:
/// datetime<->string/number and interval<->string/number. Returns None when
/// the values are incomparable or a coercion fails; the comparison
/// operators surface that as NULL.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (a, b) if a.data_type() == b.data_type() => Some(a.cmp(b)),
        (a, b) if a.is_numeric() && b.is_numeric() => Some(a.cmp(b)),

        (Value::DateTime(_), Value::Str(s)) => {
            let parsed = temporal::parse_datetime(s).ok()?;
            Some(left.cmp(&parsed))
        }
        (Value::Str(s), Value::DateTime(_)) => {
            let parsed = temporal::parse_datetime(s).ok()?;
            Some(parsed.cmp(right))
        }
        (Value::DateTime(_), b) if b.is_numeric() => {
            let coerced = temporal::datetime_from_days(b.as_f64()?).ok()?;
            Some(left.cmp(&coerced))
        }
        (a, Value::DateTime(_)) if a.is_numeric() => {
            let coerced = temporal::datetime_from_days(a.as_f64()?).ok()?;
            Some(coerced.cmp(right))
        }

        (Value::Interval(_), Value::Str(s)) => {
            let parsed = temporal::parse_interval(s).ok()?;
            Some(left.cmp(&parsed))
        }
        (Value::Str(s), Value::Interval(_)) => {
            let parsed = temporal::parse_interval(s).ok()?;
            Some(parsed.cmp(right))
        }
        (Value::Interval(i), b) if b.is_numeric() => {
            i.as_days().partial_cmp(&b.as_f64()?)
        }
        (a, Value::Interval(i)) if a.is_numeric() => {
            a.as_f64()?.partial_cmp(&i.as_days())
        }

        _ => None,
    }
}

/// Evaluates a comparison operator, mapping incomparable pairs to NULL.
pub fn compare_with(
    left: &Value,
    right: &Value,
    test: impl Fn(Ordering) -> bool,
) -> Result<Value> {
    Ok(match compare_values(left, right) {
        Some(ordering) => Value::Boolean(test(ordering)),
        None => Value::Null,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_datetime_with_string() {
        let dt = temporal::parse_datetime("2024-06-01").unwrap();
        assert_eq!(
            compare_values(&dt, &Value::string("2024-01-01")),
            Some(Ordering::Greater)
        );
        assert_eq!(compare_values(&dt, &Value::string("not a date")), None);
    }

    #[test]
    fn test_promote_decimal_contaminates() {
        let pair = promote(&Value::Integer(2), &Value::Decimal(Decimal::new(15, 1))).unwrap();
        assert!(matches!(pair, NumericPair::Decimals(_, _)));
    }
}
