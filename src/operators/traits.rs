//! Core traits for operators

use crate::error::{Error, Result};
use crate::types::{DataType, Signature, Value, render_call, select_overload};

/// Trait for binary operators (two operands).
pub trait BinaryOperator: Send + Sync {
    /// Operator symbol for display and diagnostics.
    fn symbol(&self) -> &'static str;

    /// The operator's typed overloads, most general last.
    fn signatures(&self) -> Vec<Signature>;

    /// Execute the operation. Called with nulls already short-circuited
    /// unless the matched signature is null-safe.
    fn execute(&self, left: &Value, right: &Value) -> Result<Value>;

    /// Whether null operands short-circuit the whole call to null. Only the
    /// Kleene logic operators override this.
    fn null_safe(&self) -> bool {
        false
    }

    /// Validate operand types and return the result type by overload
    /// dispatch.
    fn validate(&self, left: &DataType, right: &DataType) -> Result<DataType> {
        let args = [left.clone(), right.clone()];
        if !self.null_safe() && args.iter().any(|t| matches!(t, DataType::Null)) {
            return Ok(DataType::Null);
        }
        let signatures = self.signatures();
        match select_overload(&signatures, &args) {
            Some(i) => Ok(signatures[i].returns.clone()),
            None => Err(Error::NotSupported(render_call(self.symbol(), &args))),
        }
    }

    /// Evaluate with null propagation applied.
    fn apply(&self, left: &Value, right: &Value) -> Result<Value> {
        if !self.null_safe() && (left.is_null() || right.is_null()) {
            return Ok(Value::Null);
        }
        self.execute(left, right)
    }
}

/// Trait for unary operators (one operand).
pub trait UnaryOperator: Send + Sync {
    /// Operator symbol for display and diagnostics.
    fn symbol(&self) -> &'static str;

    /// The operator's typed overloads.
    fn signatures(&self) -> Vec<Signature>;

    /// Execute the operation.
    fn execute(&self, operand: &Value) -> Result<Value>;

    /// Whether a null operand passes through to execute (NOT, IS NULL).
    fn null_safe(&self) -> bool {
        false
    }

    /// Validate the operand type and return the result type.
    fn validate(&self, operand: &DataType) -> Result<DataType> {
        let args = [operand.clone()];
        if !self.null_safe() && matches!(operand, DataType::Null) {
            return Ok(DataType::Null);
        }
        let signatures = self.signatures();
        match select_overload(&signatures, &args) {
            Some(i) => Ok(signatures[i].returns.clone()),
            None => Err(Error::NotSupported(render_call(self.symbol(), &args))),
        }
    }

    /// Evaluate with null propagation applied.
    fn apply(&self, operand: &Value) -> Result<Value> {
        if !self.null_safe() && operand.is_null() {
            return Ok(Value::Null);
        }
        self.execute(operand)
    }
}
