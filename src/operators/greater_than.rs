//! Greater-than comparison

use super::helpers;
use super::traits::BinaryOperator;
use crate::error::Result;
use crate::types::{DataType, Signature, Value};

pub struct GreaterThanOperator;

impl BinaryOperator for GreaterThanOperator {
    fn symbol(&self) -> &'static str {
        ">"
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Object, DataType::Object],
            DataType::Boolean,
        )]
    }

    fn execute(&self, left: &Value, right: &Value) -> Result<Value> {
        helpers::compare_with(left, right, |o| o == std::cmp::Ordering::Greater)
    }
}

pub fn operator() -> &'static GreaterThanOperator {
    static OP: GreaterThanOperator = GreaterThanOperator;
    &OP
}
