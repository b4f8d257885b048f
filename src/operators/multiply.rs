//! Multiplication operator

use super::helpers::{self, NumericPair};
use super::traits::BinaryOperator;
use crate::error::{Error, Result};
use crate::types::{Signature, Value};

/// `a * b` over the numeric types.
pub struct MultiplyOperator;

impl BinaryOperator for MultiplyOperator {
    fn symbol(&self) -> &'static str {
        "*"
    }

    fn signatures(&self) -> Vec<Signature> {
        helpers::numeric_signatures()
    }

    fn execute(&self, left: &Value, right: &Value) -> Result<Value> {
        match helpers::promote(left, right) {
            Some(NumericPair::Integers(x, y)) => {
                Ok(x.checked_mul(y).map(Value::Integer).unwrap_or(Value::Null))
            }
            Some(NumericPair::Decimals(x, y)) => {
                Ok(x.checked_mul(y).map(Value::Decimal).unwrap_or(Value::Null))
            }
            Some(NumericPair::Reals(x, y)) => Ok(Value::real(x * y)),
            None => Err(Error::NotSupported(crate::types::render_call(
                "*",
                &[left.data_type(), right.data_type()],
            ))),
        }
    }
}

pub fn operator() -> &'static MultiplyOperator {
    static OP: MultiplyOperator = MultiplyOperator;
    &OP
}
