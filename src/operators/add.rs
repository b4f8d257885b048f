//! Addition operator

use super::helpers::{self, NumericPair};
use super::traits::BinaryOperator;
use crate::coercion::temporal;
use crate::error::{Error, Result};
use crate::types::{DataType, Interval, Signature, Value};

/// `a + b`: numeric addition, string concatenation when either side is a
/// string, day offsets for datetime + number, and calendar arithmetic for
/// datetime/interval operands.
pub struct AddOperator;

impl BinaryOperator for AddOperator {
    fn symbol(&self) -> &'static str {
        "+"
    }

    fn signatures(&self) -> Vec<Signature> {
        let mut signatures = helpers::numeric_signatures();
        signatures.extend([
            Signature::new(vec![DataType::Str, DataType::Str], DataType::Str),
            Signature::new(vec![DataType::Str, DataType::Real], DataType::Str),
            Signature::new(vec![DataType::Real, DataType::Str], DataType::Str),
            Signature::new(vec![DataType::Str, DataType::Boolean], DataType::Str),
            Signature::new(vec![DataType::DateTime, DataType::Real], DataType::DateTime),
            Signature::new(vec![DataType::Real, DataType::DateTime], DataType::DateTime),
            Signature::new(
                vec![DataType::DateTime, DataType::Interval],
                DataType::DateTime,
            ),
            Signature::new(
                vec![DataType::Interval, DataType::DateTime],
                DataType::DateTime,
            ),
            Signature::new(
                vec![DataType::Interval, DataType::Interval],
                DataType::Interval,
            ),
            Signature::new(
                vec![DataType::List(Box::new(DataType::Object)), DataType::List(Box::new(DataType::Object))],
                DataType::List(Box::new(DataType::Object)),
            ),
        ]);
        signatures
    }

    fn execute(&self, left: &Value, right: &Value) -> Result<Value> {
        match (left, right) {
            (Value::Str(_), _) | (_, Value::Str(_)) => {
                Ok(Value::Str(format!("{}{}", left, right)))
            }

            (Value::DateTime(dt), n) | (n, Value::DateTime(dt)) if n.is_numeric() => {
                let days = n.as_f64().unwrap_or(0.0);
                let interval = Interval::new(0, 0, (days * 86_400_000_000.0) as i64);
                temporal::datetime_add_interval(*dt, &interval)
            }
            (Value::DateTime(dt), Value::Interval(i)) | (Value::Interval(i), Value::DateTime(dt)) => {
                temporal::datetime_add_interval(*dt, i)
            }
            (Value::Interval(a), Value::Interval(b)) => Ok(Value::Interval(*a + *b)),

            (Value::List(a), Value::List(b)) => {
                let mut items = a.clone();
                items.extend(b.iter().cloned());
                Ok(Value::List(items))
            }

            (a, b) => match helpers::promote(a, b) {
                Some(NumericPair::Integers(x, y)) => {
                    Ok(x.checked_add(y).map(Value::Integer).unwrap_or(Value::Null))
                }
                Some(NumericPair::Decimals(x, y)) => {
                    Ok(x.checked_add(y).map(Value::Decimal).unwrap_or(Value::Null))
                }
                Some(NumericPair::Reals(x, y)) => Ok(Value::real(x + y)),
                None => Err(Error::NotSupported(crate::types::render_call(
                    "+",
                    &[a.data_type(), b.data_type()],
                ))),
            },
        }
    }
}

/// Register the facade entry points.
pub fn operator() -> &'static AddOperator {
    static OP: AddOperator = AddOperator;
    &OP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_add() {
        assert_eq!(
            operator().apply(&Value::Integer(2), &Value::Integer(3)).unwrap(),
            Value::Integer(5)
        );
    }

    #[test]
    fn test_string_concat() {
        assert_eq!(
            operator().apply(&Value::string("a"), &Value::Integer(1)).unwrap(),
            Value::string("a1")
        );
    }

    #[test]
    fn test_null_propagates() {
        assert_eq!(
            operator().apply(&Value::Integer(2), &Value::Null).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_datetime_plus_days() {
        let Value::DateTime(dt) = crate::coercion::temporal::parse_datetime("2024-01-01").unwrap()
        else {
            panic!()
        };
        let result = operator()
            .apply(&Value::DateTime(dt), &Value::Integer(31))
            .unwrap();
        assert_eq!(result.to_string(), "2024-02-01 00:00:00");
    }
}
