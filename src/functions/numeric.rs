//! Math functions

use super::{Function, FunctionMeta, FunctionRegistry};
use crate::error::Result;
use crate::types::{DataType, Signature, Value};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;

struct Abs;

impl Function for Abs {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("abs");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Integer], DataType::Integer),
            Signature::new(vec![DataType::Decimal], DataType::Decimal),
            Signature::new(vec![DataType::Real], DataType::Real),
        ]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(match &args[0] {
            Value::Integer(n) => Value::Integer(n.saturating_abs()),
            Value::Real(n) => Value::real(n.abs()),
            Value::Decimal(d) => Value::Decimal(d.abs()),
            _ => Value::Null,
        })
    }
}

/// round(x, d = 2): half-away-from-zero rounding to d decimals.
struct Round;

impl Function for Round {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("round");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Real], DataType::Real),
            Signature::new(vec![DataType::Real, DataType::Integer], DataType::Real),
            Signature::new(vec![DataType::Decimal], DataType::Decimal),
            Signature::new(vec![DataType::Decimal, DataType::Integer], DataType::Decimal),
        ]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let decimals = match args.get(1) {
            Some(Value::Integer(d)) => *d,
            Some(v) => v.as_f64().unwrap_or(2.0) as i64,
            None => 2,
        };
        Ok(match &args[0] {
            Value::Decimal(d) => Value::Decimal(d.round_dp(decimals.clamp(0, 28) as u32)),
            n if n.is_numeric() => {
                let factor = 10f64.powi(decimals as i32);
                let x = n.as_f64().unwrap_or(0.0);
                Value::real((x * factor).round() / factor)
            }
            _ => Value::Null,
        })
    }
}

/// toFixed(x, d): rounds and renders with exactly d decimals, as a string.
struct ToFixed;

impl Function for ToFixed {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("toFixed");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Real, DataType::Integer],
            DataType::Str,
        )]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let Some(x) = args[0].as_f64() else {
            return Ok(Value::Null);
        };
        let d = match &args[1] {
            Value::Integer(d) => (*d).clamp(0, 30) as usize,
            _ => return Ok(Value::Null),
        };
        Ok(Value::Str(format!("{:.*}", d, x)))
    }
}

/// safediv(a, b): division that returns 0 instead of NULL on b = 0.
struct SafeDiv;

impl Function for SafeDiv {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("safediv");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Integer, DataType::Integer], DataType::Integer),
            Signature::new(vec![DataType::Real, DataType::Real], DataType::Real),
        ]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let result = crate::operators::execute_binary(
            crate::operators::BinaryOp::Divide,
            &args[0],
            &args[1],
        )?;
        Ok(match result {
            Value::Null => Value::Integer(0),
            v => v,
        })
    }
}

struct Ceil;

impl Function for Ceil {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aliased("ceil", &["ceiling"]);
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Real], DataType::Integer)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(match &args[0] {
            Value::Integer(n) => Value::Integer(*n),
            Value::Real(n) => Value::Integer(n.ceil() as i64),
            Value::Decimal(d) => Value::Integer(d.ceil().to_i64().unwrap_or(0)),
            _ => Value::Null,
        })
    }
}

struct Floor;

impl Function for Floor {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("floor");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Real], DataType::Integer)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(match &args[0] {
            Value::Integer(n) => Value::Integer(*n),
            Value::Real(n) => Value::Integer(n.floor() as i64),
            Value::Decimal(d) => Value::Integer(d.floor().to_i64().unwrap_or(0)),
            _ => Value::Null,
        })
    }
}

struct Sqrt;

impl Function for Sqrt {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("sqrt");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Real], DataType::Real)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        // Negative inputs produce NaN, which normalizes to NULL.
        Ok(args[0].as_f64().map(|n| Value::real(n.sqrt())).unwrap_or(Value::Null))
    }
}

struct Power;

impl Function for Power {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aliased("power", &["pow"]);
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Real, DataType::Real],
            DataType::Real,
        )]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        match (args[0].as_f64(), args[1].as_f64()) {
            (Some(base), Some(exp)) => Ok(Value::real(base.powf(exp))),
            _ => Ok(Value::Null),
        }
    }
}

/// greatest(...) / least(...): scalar extremes over the arguments.
struct Greatest;

impl Function for Greatest {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("greatest");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Object], DataType::Object).vararg(DataType::Object)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(args.iter().max().cloned().unwrap_or(Value::Null))
    }
}

struct Least;

impl Function for Least {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("least");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Object], DataType::Object).vararg(DataType::Object)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(args.iter().min().cloned().unwrap_or(Value::Null))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Arc::new(Abs));
    registry.register(Arc::new(Round));
    registry.register(Arc::new(ToFixed));
    registry.register(Arc::new(SafeDiv));
    registry.register(Arc::new(Ceil));
    registry.register(Arc::new(Floor));
    registry.register(Arc::new(Sqrt));
    registry.register(Arc::new(Power));
    registry.register(Arc::new(Greatest));
    registry.register(Arc::new(Least));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::execute_function;

    #[test]
    fn test_round_default_two_decimals() {
        assert_eq!(
            execute_function("round", &[Value::Real(1.2345)]).unwrap(),
            Value::Real(1.23)
        );
    }

    #[test]
    fn test_to_fixed_renders_string() {
        assert_eq!(
            execute_function("toFixed", &[Value::Real(2.5), Value::Integer(3)]).unwrap(),
            Value::string("2.500")
        );
    }

    #[test]
    fn test_safediv_zero() {
        assert_eq!(
            execute_function("safediv", &[Value::Integer(10), Value::Integer(0)]).unwrap(),
            Value::Integer(0)
        );
        assert_eq!(
            execute_function("safediv", &[Value::Integer(10), Value::Integer(2)]).unwrap(),
            Value::Integer(5)
        );
    }

    #[test]
    fn test_round_decimal_keeps_kind() {
        assert_eq!(
            execute_function("round", &[Value::Decimal(Decimal::new(12345, 3))]).unwrap(),
            Value::Decimal(Decimal::new(1235, 2))
        );
    }
}
