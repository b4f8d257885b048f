//! Null-handling functions

use super::{Function, FunctionMeta, FunctionRegistry};
use crate::error::Result;
use crate::types::{DataType, Signature, Value};
use std::sync::Arc;

/// COALESCE(...): the first non-null argument.
struct Coalesce;

impl Function for Coalesce {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("coalesce");
        &META
    }

    fn null_safe(&self) -> bool {
        true
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Object], DataType::Object).vararg(DataType::Object).null_safe()]
    }

    fn validate(&self, arg_types: &[DataType]) -> Result<DataType> {
        // Result type is the first non-null argument's type.
        Ok(arg_types
            .iter()
            .find(|t| !matches!(t, DataType::Null))
            .cloned()
            .unwrap_or(DataType::Null))
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(args
            .iter()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Value::Null))
    }
}

/// isnull(x): null-safe null test.
struct IsNullFn;

impl Function for IsNullFn {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("isnull");
        &META
    }

    fn null_safe(&self) -> bool {
        true
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Object], DataType::Boolean).null_safe()]
    }

    fn validate(&self, _arg_types: &[DataType]) -> Result<DataType> {
        Ok(DataType::Boolean)
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(Value::Boolean(args[0].is_null()))
    }
}

/// isnotnull(x): null-safe non-null test.
struct IsNotNullFn;

impl Function for IsNotNullFn {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("isnotnull");
        &META
    }

    fn null_safe(&self) -> bool {
        true
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Object], DataType::Boolean).null_safe()]
    }

    fn validate(&self, _arg_types: &[DataType]) -> Result<DataType> {
        Ok(DataType::Boolean)
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(Value::Boolean(!args[0].is_null()))
    }
}

/// ifnull(x, fallback): two-argument coalesce.
struct IfNull;

impl Function for IfNull {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("ifnull");
        &META
    }

    fn null_safe(&self) -> bool {
        true
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Object, DataType::Object], DataType::Object)
                .null_safe(),
        ]
    }

    fn validate(&self, arg_types: &[DataType]) -> Result<DataType> {
        Ok(arg_types
            .iter()
            .find(|t| !matches!(t, DataType::Null))
            .cloned()
            .unwrap_or(DataType::Null))
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        if args[0].is_null() {
            Ok(args[1].clone())
        } else {
            Ok(args[0].clone())
        }
    }
}

/// nullif(a, b): NULL when the arguments are equal, a otherwise.
struct NullIf;

impl Function for NullIf {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("nullif");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Object, DataType::Object],
            DataType::Object,
        )]
    }

    fn validate(&self, arg_types: &[DataType]) -> Result<DataType> {
        Ok(arg_types.first().cloned().unwrap_or(DataType::Null))
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        if args[0] == args[1] {
            Ok(Value::Null)
        } else {
            Ok(args[0].clone())
        }
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Arc::new(Coalesce));
    registry.register(Arc::new(IsNullFn));
    registry.register(Arc::new(IsNotNullFn));
    registry.register(Arc::new(IfNull));
    registry.register(Arc::new(NullIf));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::execute_function;

    #[test]
    fn test_coalesce_first_non_null() {
        assert_eq!(
            execute_function("coalesce", &[Value::Null, Value::Null, Value::Integer(3)]).unwrap(),
            Value::Integer(3)
        );
        assert_eq!(
            execute_function("coalesce", &[Value::Null]).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_isnull_is_null_safe() {
        assert_eq!(
            execute_function("isnull", &[Value::Null]).unwrap(),
            Value::Boolean(true)
        );
    }
}
