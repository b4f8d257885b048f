//! Division operator

use super::helpers::{self, NumericPair};
use super::traits::BinaryOperator;
use crate::error::{Error, Result};
use crate::types::{Signature, Value};

/// `a / b`. Integer division truncates toward zero; division by zero
/// yields NULL rather than an error.
pub struct DivideOperator;

impl BinaryOperator for DivideOperator {
    fn symbol(&self) -> &'static str {
        "/"
    }

    fn signatures(&self) -> Vec<Signature> {
        helpers::numeric_signatures()
    }

    fn execute(&self, left: &Value, right: &Value) -> Result<Value> {
        match helpers::promote(left, right) {
            Some(NumericPair::Integers(_, 0)) => Ok(Value::Null),
            Some(NumericPair::Integers(x, y)) => {
                Ok(x.checked_div(y).map(Value::Integer).unwrap_or(Value::Null))
            }
            Some(NumericPair::Decimals(x, y)) => {
                if y.is_zero() {
                    Ok(Value::Null)
                } else {
                    Ok(x.checked_div(y).map(Value::Decimal).unwrap_or(Value::Null))
                }
            }
            Some(NumericPair::Reals(x, y)) => {
                if y == 0.0 {
                    Ok(Value::Null)
                } else {
                    Ok(Value::real(x / y))
                }
            }
            None => Err(Error::NotSupported(crate::types::render_call(
                "/",
                &[left.data_type(), right.data_type()],
            ))),
        }
    }
}

pub fn operator() -> &'static DivideOperator {
    static OP: DivideOperator = DivideOperator;
    &OP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_division_truncates() {
        assert_eq!(
            operator().apply(&Value::Integer(7), &Value::Integer(2)).unwrap(),
            Value::Integer(3)
        );
        assert_eq!(
            operator().apply(&Value::Integer(-7), &Value::Integer(2)).unwrap(),
            Value::Integer(-3)
        );
    }

    #[test]
    fn test_division_by_zero_is_null() {
        assert_eq!(
            operator().apply(&Value::Integer(1), &Value::Integer(0)).unwrap(),
            Value::Null
        );
        assert_eq!(
            operator().apply(&Value::Real(1.0), &Value::Real(0.0)).unwrap(),
            Value::Null
        );
    }
}
