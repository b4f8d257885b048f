//! Remainder operator

use super::helpers::{self, NumericPair};
use super::traits::BinaryOperator;
use crate::error::{Error, Result};
use crate::types::{Signature, Value};

/// `a % b`, truncating toward zero (also for negative Decimal operands).
/// Remainder by zero yields NULL.
pub struct RemainderOperator;

impl BinaryOperator for RemainderOperator {
    fn symbol(&self) -> &'static str {
        "%"
    }

    fn signatures(&self) -> Vec<Signature> {
        helpers::numeric_signatures()
    }

    fn execute(&self, left: &Value, right: &Value) -> Result<Value> {
        match helpers::promote(left, right) {
            Some(NumericPair::Integers(_, 0)) => Ok(Value::Null),
            Some(NumericPair::Integers(x, y)) => {
                Ok(x.checked_rem(y).map(Value::Integer).unwrap_or(Value::Null))
            }
            Some(NumericPair::Decimals(x, y)) => {
                if y.is_zero() {
                    Ok(Value::Null)
                } else {
                    Ok(x.checked_rem(y).map(Value::Decimal).unwrap_or(Value::Null))
                }
            }
            Some(NumericPair::Reals(x, y)) => {
                if y == 0.0 {
                    Ok(Value::Null)
                } else {
                    Ok(Value::real(x % y))
                }
            }
            None => Err(Error::NotSupported(crate::types::render_call(
                "%",
                &[left.data_type(), right.data_type()],
            ))),
        }
    }
}

pub fn operator() -> &'static RemainderOperator {
    static OP: RemainderOperator = RemainderOperator;
    &OP
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_negative_decimal_truncates_toward_zero() {
        let result = operator()
            .apply(
                &Value::Decimal(Decimal::new(-7, 0)),
                &Value::Decimal(Decimal::new(2, 0)),
            )
            .unwrap();
        assert_eq!(result, Value::Decimal(Decimal::new(-1, 0)));
    }
}
