//! Aggregate function metadata
//!
//! Validation and result typing only; the accumulation itself lives in
//! `execution::aggregate`, which owns a state slot per (group, aggregate).

use super::{Function, FunctionMeta, FunctionRegistry};
use crate::error::{Error, Result};
use crate::types::{DataType, Signature, Value, render_call};
use std::sync::Arc;

fn not_scalar(name: &str) -> Error {
    Error::Internal(format!("aggregate {} executed as a scalar function", name))
}

struct Count;

impl Function for Count {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aggregate("count");
        &META
    }

    fn null_safe(&self) -> bool {
        // count(x) counts non-null inputs itself
        true
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Asterisk], DataType::Integer).null_safe(),
            Signature::new(vec![DataType::Object], DataType::Integer).null_safe(),
        ]
    }

    fn execute(&self, _args: &[Value]) -> Result<Value> {
        Err(not_scalar("count"))
    }
}

struct Sum;

impl Function for Sum {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aggregate("sum");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Integer], DataType::Integer),
            Signature::new(vec![DataType::Decimal], DataType::Decimal),
            Signature::new(vec![DataType::Real], DataType::Real),
            Signature::new(vec![DataType::Interval], DataType::Interval),
        ]
    }

    fn execute(&self, _args: &[Value]) -> Result<Value> {
        Err(not_scalar("sum"))
    }
}

/// avg accumulates in Decimal regardless of input kind; integers come back
/// as Real.
struct Avg;

impl Function for Avg {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aggregate("avg");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Decimal], DataType::Decimal),
            Signature::new(vec![DataType::Real], DataType::Real),
        ]
    }

    fn execute(&self, _args: &[Value]) -> Result<Value> {
        Err(not_scalar("avg"))
    }
}

/// min/max/first/last: any comparable input, result typed as the input.
struct Extremum {
    meta: &'static FunctionMeta,
}

impl Function for Extremum {
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

/// group_concat(x, sep = ','): stringified values joined by sep.
struct GroupConcat;

impl Function for GroupConcat {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aggregate("group_concat");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Object], DataType::Str),
            Signature::new(vec![DataType::Object, DataType::Str], DataType::Str),
        ]
    }

    fn execute(&self, _args: &[Value]) -> Result<Value> {
        Err(not_scalar("group_concat"))
    }
}

struct ArrayAgg;

impl Function for ArrayAgg {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aggregate("array_agg");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Object], DataType::Object)]
    }

    fn validate(&self, arg_types: &[DataType]) -> Result<DataType> {
        match arg_types {
            [t] => Ok(DataType::List(Box::new(t.clone()))),
            _ => Err(Error::NotSupported(render_call("array_agg", arg_types))),
        }
    }

    fn execute(&self, _args: &[Value]) -> Result<Value> {
        Err(not_scalar("array_agg"))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    static MIN: FunctionMeta = FunctionMeta::aggregate("min");
    static MAX: FunctionMeta = FunctionMeta::aggregate("max");
    static FIRST: FunctionMeta = FunctionMeta::aggregate("first");
    static LAST: FunctionMeta = FunctionMeta::aggregate("last");

    registry.register(Arc::new(Count));
    registry.register(Arc::new(Sum));
    registry.register(Arc::new(Avg));
    registry.register(Arc::new(Extremum { meta: &MIN }));
    registry.register(Arc::new(Extremum { meta: &MAX }));
    registry.register(Arc::new(Extremum { meta: &FIRST }));
    registry.register(Arc::new(Extremum { meta: &LAST }));
    registry.register(Arc::new(GroupConcat));
    registry.register(Arc::new(ArrayAgg));
}
