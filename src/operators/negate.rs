//! Arithmetic negation

use super::traits::UnaryOperator;
use crate::error::{Error, Result};
use crate::types::{DataType, Interval, Signature, Value};

/// `-a` over numbers and intervals.
pub struct NegateOperator;

impl UnaryOperator for NegateOperator {
    fn symbol(&self) -> &'static str {
        "-"
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Integer], DataType::Integer),
            Signature::new(vec![DataType::Decimal], DataType::Decimal),
            Signature::new(vec![DataType::Real], DataType::Real),
            Signature::new(vec![DataType::Interval], DataType::Interval),
        ]
    }

    fn execute(&self, operand: &Value) -> Result<Value> {
        match operand {
            Value::Integer(n) => Ok(n.checked_neg().map(Value::Integer).unwrap_or(Value::Null)),
            Value::Real(n) => Ok(Value::real(-n)),
            Value::Decimal(d) => Ok(Value::Decimal(-d)),
            Value::Interval(i) => Ok(Value::Interval(-*i)),
            v => Err(Error::NotSupported(crate::types::render_call(
                "-",
                &[v.data_type()],
            ))),
        }
    }
}

pub fn operator() -> &'static NegateOperator {
    static OP: NegateOperator = NegateOperator;
    &OP
}

/// `+a`: the identity function on numbers.
pub struct IdentityOperator;

impl UnaryOperator for IdentityOperator {
    fn symbol(&self) -> &'static str {
        "+"
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Integer], DataType::Integer),
            Signature::new(vec![DataType::Decimal], DataType::Decimal),
            Signature::new(vec![DataType::Real], DataType::Real),
            Signature::new(vec![DataType::Interval], DataType::Interval),
        ]
    }

    fn execute(&self, operand: &Value) -> Result<Value> {
        Ok(operand.clone())
    }
}

pub fn identity() -> &'static IdentityOperator {
    static OP: IdentityOperator = IdentityOperator;
    &OP
}
