//! Logical OR

use super::traits::BinaryOperator;
use crate::error::Result;
use crate::types::{DataType, Signature, Value};

/// `a OR b` with Kleene three-valued semantics: TRUE dominates NULL.
pub struct OrOperator;

impl BinaryOperator for OrOperator {
    fn symbol(&self) -> &'static str {
        "OR"
    }

    fn null_safe(&self) -> bool {
        true
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Boolean, DataType::Boolean], DataType::Boolean)
                .null_safe(),
        ]
    }

    fn execute(&self, left: &Value, right: &Value) -> Result<Value> {
        Ok(match (left.to_bool_opt(), right.to_bool_opt()) {
            (Some(true), _) | (_, Some(true)) => Value::Boolean(true),
            (Some(false), Some(false)) => Value::Boolean(false),
            _ => Value::Null,
        })
    }
}

pub fn operator() -> &'static OrOperator {
    static OP: OrOperator = OrOperator;
    &OP
}
