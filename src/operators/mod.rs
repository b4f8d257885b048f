//! Operator implementations
//!
//! Each operator lives in its own module and implements the
//! [`BinaryOperator`]/[`UnaryOperator`] traits, exposing typed overload
//! signatures for dispatch plus the value-level execution. The facade
//! functions below are what the planner and evaluator call.

pub mod helpers;
pub mod traits;

mod add;
mod divide;
mod multiply;
mod remainder;
mod subtract;

mod equal;
mod greater_than;
mod greater_than_equal;
mod less_than;
mod less_than_equal;
mod not_equal;

mod and;
mod negate;
mod not;
mod or;

mod regex_match;

pub use helpers::compare_values;
pub use regex_match::compile as compile_regex;
pub use traits::{BinaryOperator, UnaryOperator};

use crate::error::Result;
use crate::types::{DataType, Value};

/// Binary operator kinds as they appear in compiled expressions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Match {
        case_insensitive: bool,
        negated: bool,
        swapped: bool,
    },
}

/// Unary operator kinds as they appear in compiled expressions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Identity,
}

/// Resolves a binary operator kind to its implementation.
pub fn binary(op: BinaryOp) -> &'static dyn BinaryOperator {
    static MATCH_OPS: [regex_match::MatchOperator; 6] = [
        regex_match::MatchOperator::new(false, false, false),
        regex_match::MatchOperator::new(true, false, false),
        regex_match::MatchOperator::new(false, true, false),
        regex_match::MatchOperator::new(true, true, false),
        regex_match::MatchOperator::new(false, false, true),
        regex_match::MatchOperator::new(true, false, true),
    ];
    match op {
        BinaryOp::Add => add::operator(),
        BinaryOp::Subtract => subtract::operator(),
        BinaryOp::Multiply => multiply::operator(),
        BinaryOp::Divide => divide::operator(),
        BinaryOp::Remainder => remainder::operator(),
        BinaryOp::Equal => equal::operator(),
        BinaryOp::NotEqual => not_equal::operator(),
        BinaryOp::LessThan => less_than::operator(),
        BinaryOp::LessThanOrEqual => less_than_equal::operator(),
        BinaryOp::GreaterThan => greater_than::operator(),
        BinaryOp::GreaterThanOrEqual => greater_than_equal::operator(),
        BinaryOp::And => and::operator(),
        BinaryOp::Or => or::operator(),
        BinaryOp::Match {
            case_insensitive,
            negated,
            swapped,
        } => {
            let index = if swapped {
                4 + case_insensitive as usize
            } else {
                (negated as usize) * 2 + case_insensitive as usize
            };
            &MATCH_OPS[index]
        }
    }
}

/// Resolves a unary operator kind to its implementation.
pub fn unary(op: UnaryOp) -> &'static dyn UnaryOperator {
    match op {
        UnaryOp::Not => not::operator(),
        UnaryOp::Negate => negate::operator(),
        UnaryOp::Identity => negate::identity(),
    }
}

/// Validates a binary operator application, returning the result type.
pub fn validate_binary(op: BinaryOp, left: &DataType, right: &DataType) -> Result<DataType> {
    binary(op).validate(left, right)
}

/// Executes a binary operator with null propagation.
pub fn execute_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    binary(op).apply(left, right)
}

/// Validates a unary operator application, returning the result type.
pub fn validate_unary(op: UnaryOp, operand: &DataType) -> Result<DataType> {
    unary(op).validate(operand)
}

/// Executes a unary operator with null propagation.
pub fn execute_unary(op: UnaryOp, operand: &Value) -> Result<Value> {
    unary(op).apply(operand)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_signature() {
        let err = validate_binary(BinaryOp::Subtract, &DataType::Boolean, &DataType::Str)
            .unwrap_err();
        assert!(err.to_string().contains("-(boolean, text)"));
    }

    #[test]
    fn test_integer_overload_outranks_real() {
        assert_eq!(
            validate_binary(BinaryOp::Add, &DataType::Integer, &DataType::Integer).unwrap(),
            DataType::Integer
        );
        assert_eq!(
            validate_binary(BinaryOp::Add, &DataType::Integer, &DataType::Real).unwrap(),
            DataType::Real
        );
    }

    #[test]
    fn test_null_operand_types_as_null() {
        assert_eq!(
            validate_binary(BinaryOp::Add, &DataType::Null, &DataType::Integer).unwrap(),
            DataType::Null
        );
    }
}
