//! Logical NOT

use super::traits::UnaryOperator;
use crate::error::Result;
use crate::types::{DataType, Signature, Value};

/// `NOT a`: null-safe, NULL stays NULL.
pub struct NotOperator;

impl UnaryOperator for NotOperator {
    fn symbol(&self) -> &'static str {
        "NOT"
    }

    fn null_safe(&self) -> bool {
        true
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Boolean], DataType::Boolean).null_safe()]
    }

    fn execute(&self, operand: &Value) -> Result<Value> {
        Ok(match operand.to_bool_opt() {
            Some(b) => Value::Boolean(!b),
            None => Value::Null,
        })
    }
}

pub fn operator() -> &'static NotOperator {
    static OP: NotOperator = NotOperator;
    &OP
}
