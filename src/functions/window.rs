//! Window-only function metadata
//!
//! These only make sense under an OVER clause; using one without a window
//! is a compile error. Their evaluation lives in `execution::window`.

use super::{Function, FunctionMeta, FunctionRegistry};
use crate::error::{Error, Result};
use crate::types::{DataType, Signature, Value, render_call};
use std::sync::Arc;

fn not_scalar(name: &str) -> Error {
    Error::Internal(format!("window function {} executed as a scalar", name))
}

/// row_number / rank / dense_rank: no arguments, integer result.
struct Ranking {
    meta: &'static FunctionMeta,
}

impl Function for Ranking {
    fn meta(&self) -> &FunctionMeta {
        self.meta
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![], DataType::Integer)]
    }

    fn execute(&self, _args: &[Value]) -> Result<Value> {
        Err(not_scalar(self.meta.name))
    }
}

/// first_value / last_value: result typed as the argument.
struct EdgeValue {
    meta: &'static FunctionMeta,
}

impl Function for EdgeValue {
    fn meta(&self) -> &FunctionMeta {
        self.meta
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Object], DataType::Object)]
    }

    fn validate(&self, arg_types: &[DataType]) -> Result<DataType> {
        match arg_types {
            [t] => Ok(t.clone()),
            _ => Err(Error::NotSupported(render_call(self.meta.name, arg_types))),
        }
    }

    fn execute(&self, _args: &[Value]) -> Result<Value> {
        Err(not_scalar(self.meta.name))
    }
}

/// nth_value(x, n).
struct NthValue;

impl Function for NthValue {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::window("nth_value");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Object, DataType::Integer],
            DataType::Object,
        )]
    }

    fn validate(&self, arg_types: &[DataType]) -> Result<DataType> {
        match arg_types {
            [t, n] if DataType::Real.accepts(n) => Ok(t.clone()),
            _ => Err(Error::NotSupported(render_call("nth_value", arg_types))),
        }
    }

    fn execute(&self, _args: &[Value]) -> Result<Value> {
        Err(not_scalar("nth_value"))
    }
}

/// lead(x, off = 1, default = NULL) / lag(...): offset row access within
/// the partition, frame-independent.
struct Shift {
    meta: &'static FunctionMeta,
}

impl Function for Shift {
    fn meta(&self) -> &FunctionMeta {
        self.meta
    }

    fn null_safe(&self) -> bool {
        true
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Object], DataType::Object).null_safe(),
            Signature::new(vec![DataType::Object, DataType::Integer], DataType::Object)
                .null_safe(),
            Signature::new(
                vec![DataType::Object, DataType::Integer, DataType::Object],
                DataType::Object,
            )
            .null_safe(),
        ]
    }

    fn validate(&self, arg_types: &[DataType]) -> Result<DataType> {
        match arg_types {
            [t] | [t, _] | [t, _, _] => Ok(t.clone()),
            _ => Err(Error::NotSupported(render_call(self.meta.name, arg_types))),
        }
    }

    fn execute(&self, _args: &[Value]) -> Result<Value> {
        Err(not_scalar(self.meta.name))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    static ROW_NUMBER: FunctionMeta = FunctionMeta::window("row_number");
    static RANK: FunctionMeta = FunctionMeta::window("rank");
    static DENSE_RANK: FunctionMeta = FunctionMeta::window("dense_rank");
    static FIRST_VALUE: FunctionMeta = FunctionMeta::window("first_value");
    static LAST_VALUE: FunctionMeta = FunctionMeta::window("last_value");
    static LEAD: FunctionMeta = FunctionMeta::window("lead");
    static LAG: FunctionMeta = FunctionMeta::window("lag");

    registry.register(Arc::new(Ranking { meta: &ROW_NUMBER }));
    registry.register(Arc::new(Ranking { meta: &RANK }));
    registry.register(Arc::new(Ranking { meta: &DENSE_RANK }));
    registry.register(Arc::new(EdgeValue { meta: &FIRST_VALUE }));
    registry.register(Arc::new(EdgeValue { meta: &LAST_VALUE }));
    registry.register(Arc::new(NthValue));
    registry.register(Arc::new(Shift { meta: &LEAD }));
    registry.register(Arc::new(Shift { meta: &LAG }));
}
