//! Logical AND

use super::traits::BinaryOperator;
use crate::error::Result;
use crate::types::{DataType, Signature, Value};

/// `a AND b` with Kleene three-valued semantics: FALSE dominates NULL.
pub struct AndOperator;

impl BinaryOperator for AndOperator {
    fn symbol(&self) -> &'static str {
        "AND"
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
            (Some(false), _) | (_, Some(false)) => Value::Boolean(false),
            (Some(true), Some(true)) => Value::Boolean(true),
            _ => Value::Null,
        })
    }
}

pub fn operator() -> &'static AndOperator {
    static OP: AndOperator = AndOperator;
    &OP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kleene_false_dominates() {
        assert_eq!(
            operator().apply(&Value::Null, &Value::Boolean(false)).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            operator().apply(&Value::Null, &Value::Boolean(true)).unwrap(),
            Value::Null
        );
    }
}
