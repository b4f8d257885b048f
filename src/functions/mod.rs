//! Function definitions and registry
//!
//! A trait-based registry of builtin functions, separating
//! metadata/validation from execution. Scalar functions execute here;
//! aggregate and window functions only contribute their metadata and result
//! typing, their accumulation lives in the execution layer.

use crate::error::{Error, Result};
use crate::types::{DataType, Signature, Value, render_call, select_overload};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

mod aggregate;
pub mod casts;
mod conditional;
mod numeric;
mod string;
mod temporal;
mod window;

/// Metadata about a function.
#[derive(Debug, Clone)]
pub struct FunctionMeta {
    /// Canonical lowercase name.
    pub name: &'static str,
    /// Additional names resolving to the same function.
    pub aliases: &'static [&'static str],
    /// Whether this is an aggregate (accepts DISTINCT/FILTER, groups rows).
    pub is_aggregate: bool,
    /// Whether the function only makes sense with an OVER clause.
    pub window_only: bool,
}

impl FunctionMeta {
    pub const fn scalar(name: &'static str) -> Self {
        FunctionMeta {
            name,
            aliases: &[],
            is_aggregate: false,
            window_only: false,
        }
    }

    pub const fn aliased(name: &'static str, aliases: &'static [&'static str]) -> Self {
        FunctionMeta {
            name,
            aliases,
            is_aggregate: false,
            window_only: false,
        }
    }

    pub const fn aggregate(name: &'static str) -> Self {
        FunctionMeta {
            name,
            aliases: &[],
            is_aggregate: true,
            window_only: false,
        }
    }

    pub const fn window(name: &'static str) -> Self {
        FunctionMeta {
            name,
            aliases: &[],
            is_aggregate: true,
            window_only: true,
        }
    }
}

/// Trait for builtin functions.
pub trait Function: Send + Sync {
    /// The function's metadata.
    fn meta(&self) -> &FunctionMeta;

    /// The typed overloads used for dispatch and result typing.
    fn overloads(&self) -> Vec<Signature>;

    /// Whether null arguments reach execute instead of nulling the call.
    fn null_safe(&self) -> bool {
        false
    }

    /// Validate argument types and return the result type. The default
    /// dispatches over [`Function::overloads`]; functions whose result type
    /// depends on the argument type (min, coalesce, ...) override this.
    fn validate(&self, arg_types: &[DataType]) -> Result<DataType> {
        if !self.null_safe() && arg_types.iter().any(|t| matches!(t, DataType::Null)) {
            return Ok(DataType::Null);
        }
        let overloads = self.overloads();
        match select_overload(&overloads, arg_types) {
            Some(i) => Ok(overloads[i].returns.clone()),
            None => Err(Error::NotSupported(render_call(
                self.meta().name,
                arg_types,
            ))),
        }
    }

    /// Execute with runtime values. Aggregate and window functions are never
    /// executed through this path.
    fn execute(&self, args: &[Value]) -> Result<Value>;

    /// Evaluate with null propagation applied.
    fn apply(&self, args: &[Value]) -> Result<Value> {
        if !self.null_safe() && args.iter().any(|v| v.is_null()) {
            return Ok(Value::Null);
        }
        self.execute(args)
    }
}

/// Registry of all builtin functions, keyed by lowercase name.
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        casts::register(&mut registry);
        string::register(&mut registry);
        temporal::register(&mut registry);
        numeric::register(&mut registry);
        conditional::register(&mut registry);
        aggregate::register(&mut registry);
        window::register(&mut registry);

        registry
    }

    /// Register a function under its name and aliases.
    pub(crate) fn register(&mut self, function: Arc<dyn Function>) {
        let meta = function.meta();
        self.functions
            .insert(meta.name.to_string(), function.clone());
        for alias in meta.aliases {
            self.functions.insert(alias.to_string(), function.clone());
        }
    }
}

static REGISTRY: LazyLock<FunctionRegistry> = LazyLock::new(FunctionRegistry::new);

/// Look up a function by name (case-insensitive).
pub fn get_function(name: &str) -> Option<&'static dyn Function> {
    let registry: &'static FunctionRegistry = &REGISTRY;
    registry.functions.get(&name.to_lowercase()).map(|f| f.as_ref())
}

/// Whether a function name denotes an aggregate.
pub fn is_aggregate(name: &str) -> bool {
    get_function(name)
        .map(|f| f.meta().is_aggregate)
        .unwrap_or(false)
}

/// Validate a call, returning its result type.
pub fn validate_function(name: &str, arg_types: &[DataType]) -> Result<DataType> {
    match get_function(name) {
        Some(function) => function.validate(arg_types),
        None => Err(Error::CompileError(format!("unknown function {}", name))),
    }
}

/// Execute a scalar function call.
pub fn execute_function(name: &str, args: &[Value]) -> Result<Value> {
    match get_function(name) {
        Some(function) => function.apply(args),
        None => Err(Error::ExecutionError(format!("unknown function {}", name))),
    }
}
