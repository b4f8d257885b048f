//! Subtraction operator

use super::helpers::{self, NumericPair};
use super::traits::BinaryOperator;
use crate::coercion::temporal;
use crate::error::{Error, Result};
use crate::types::{DataType, Interval, Signature, Value};

/// `a - b`: numeric subtraction, day offsets for datetime - number, and
/// calendar arithmetic for datetime/interval operands. `datetime -
/// datetime` yields the interval between the instants.
pub struct SubtractOperator;

impl BinaryOperator for SubtractOperator {
    fn symbol(&self) -> &'static str {
        "-"
    }

    fn signatures(&self) -> Vec<Signature> {
        let mut signatures = helpers::numeric_signatures();
        signatures.extend([
            Signature::new(vec![DataType::DateTime, DataType::Real], DataType::DateTime),
            Signature::new(
                vec![DataType::DateTime, DataType::Interval],
                DataType::DateTime,
            ),
            Signature::new(
                vec![DataType::DateTime, DataType::DateTime],
                DataType::Interval,
            ),
            Signature::new(
                vec![DataType::Interval, DataType::Interval],
                DataType::Interval,
            ),
        ]);
        signatures
    }

    fn execute(&self, left: &Value, right: &Value) -> Result<Value> {
        match (left, right) {
            (Value::DateTime(dt), n) if n.is_numeric() => {
                let days = n.as_f64().unwrap_or(0.0);
                let interval = Interval::new(0, 0, -(days * 86_400_000_000.0) as i64);
                temporal::datetime_add_interval(*dt, &interval)
            }
            (Value::DateTime(dt), Value::Interval(i)) => {
                temporal::datetime_add_interval(*dt, &-*i)
            }
            (Value::DateTime(a), Value::DateTime(b)) => Ok(temporal::datetime_difference(*a, *b)),
            (Value::Interval(a), Value::Interval(b)) => Ok(Value::Interval(*a + -*b)),

            (a, b) => match helpers::promote(a, b) {
                Some(NumericPair::Integers(x, y)) => {
                    Ok(x.checked_sub(y).map(Value::Integer).unwrap_or(Value::Null))
                }
                Some(NumericPair::Decimals(x, y)) => {
                    Ok(x.checked_sub(y).map(Value::Decimal).unwrap_or(Value::Null))
                }
                Some(NumericPair::Reals(x, y)) => Ok(Value::real(x - y)),
                None => Err(Error::NotSupported(crate::types::render_call(
                    "-",
                    &[a.data_type(), b.data_type()],
                ))),
            },
        }
    }
}

pub fn operator() -> &'static SubtractOperator {
    static OP: SubtractOperator = SubtractOperator;
    &OP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_difference() {
        let Value::DateTime(a) = crate::coercion::temporal::parse_datetime("2024-02-01").unwrap()
        else {
            panic!()
        };
        let Value::DateTime(b) = crate::coercion::temporal::parse_datetime("2024-01-01").unwrap()
        else {
            panic!()
        };
        let result = operator()
            .apply(&Value::DateTime(a), &Value::DateTime(b))
            .unwrap();
        assert_eq!(result, Value::Interval(Interval::new(0, 31, 0)));
    }
}
