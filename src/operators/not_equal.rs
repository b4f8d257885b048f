//! Inequality comparison

use super::helpers;
use super::traits::BinaryOperator;
use crate::error::Result;
use crate::types::{DataType, Signature, Value};

/// `a != b`, three-valued.
pub struct NotEqualOperator;

impl BinaryOperator for NotEqualOperator {
    fn symbol(&self) -> &'static str {
        "!="
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Object, DataType::Object],
            DataType::Boolean,
        )]
    }

    fn execute(&self, left: &Value, right: &Value) -> Result<Value> {
        helpers::compare_with(left, right, |o| o != std::cmp::Ordering::Equal)
    }
}

pub fn operator() -> &'static NotEqualOperator {
    static OP: NotEqualOperator = NotEqualOperator;
    &OP
}
