//! Cast functions, one per target type
//!
//! These are the only coercion points in the engine: `expr::type` and
//! explicit calls both land here. At evaluation time a failed cast yields
//! NULL (bad data is not an error); the INSERT/UPDATE path goes through
//! `coercion::coerce_value` directly, where failures are errors.

use super::{Function, FunctionMeta, FunctionRegistry};
use crate::coercion::{numeric, string, temporal};
use crate::error::Result;
use crate::types::{DataType, Signature, Value};
use std::sync::Arc;

/// Resolves a type name from CREATE TABLE or `::type` suffixes to its tag.
pub fn type_for_name(name: &str) -> Option<DataType> {
    if let Some(element) = name.strip_suffix("[]") {
        return Some(DataType::List(Box::new(type_for_name(element)?)));
    }
    Some(match name.to_lowercase().as_str() {
        "int" | "integer" => DataType::Integer,
        "real" | "number" | "float" | "double" => DataType::Real,
        "numeric" | "decimal" => DataType::Decimal,
        "bool" | "boolean" => DataType::Boolean,
        "string" | "text" | "varchar" => DataType::Str,
        "datetime" | "timestamp" | "date" | "timestamptz" => DataType::DateTime,
        "interval" | "duration" => DataType::Interval,
        "object" | "any" | "json" => DataType::Object,
        _ => return None,
    })
}

struct IntegerCast;

impl Function for IntegerCast {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aliased("integer", &["int"]);
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Object], DataType::Integer)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(numeric::to_integer(args[0].clone()).unwrap_or(Value::Null))
    }
}

struct NumberCast;

impl Function for NumberCast {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aliased("number", &["real"]);
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Object], DataType::Real)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(numeric::to_real(args[0].clone()).unwrap_or(Value::Null))
    }
}

struct DecimalCast;

impl Function for DecimalCast {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aliased("numeric", &["decimal"]);
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Object], DataType::Decimal)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(numeric::to_decimal(args[0].clone()).unwrap_or(Value::Null))
    }
}

struct BooleanCast;

impl Function for BooleanCast {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aliased("boolean", &["bool"]);
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Object], DataType::Boolean)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(string::to_boolean(args[0].clone()).unwrap_or(Value::Null))
    }
}

struct StringCast;

impl Function for StringCast {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aliased("string", &["text"]);
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Object], DataType::Str)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(Value::Str(args[0].to_string()))
    }
}

struct DateTimeCast;

impl Function for DateTimeCast {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aliased("datetime", &["timestamp", "date"]);
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Object], DataType::DateTime)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(match &args[0] {
            Value::DateTime(_) => args[0].clone(),
            Value::Str(s) => temporal::parse_datetime(s).unwrap_or(Value::Null),
            n if n.is_numeric() => n
                .as_f64()
                .map(temporal::datetime_from_days)
                .and_then(Result::ok)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        })
    }
}

struct TimestampTzCast;

impl Function for TimestampTzCast {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("timestamptz");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Object], DataType::DateTime),
            Signature::new(vec![DataType::Object, DataType::Str], DataType::DateTime),
        ]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let instant = match DateTimeCast.execute(&args[..1])? {
            Value::DateTime(dt) => dt,
            _ => return Ok(Value::Null),
        };
        match args.get(1) {
            Some(Value::Str(zone)) => Ok(temporal::with_zone(instant, zone).unwrap_or(Value::Null)),
            _ => Ok(Value::DateTime(instant)),
        }
    }
}

struct IntervalCast;

impl Function for IntervalCast {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aliased("interval", &["duration"]);
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Object], DataType::Interval)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(match &args[0] {
            Value::Interval(_) => args[0].clone(),
            Value::Str(s) => temporal::parse_interval(s).unwrap_or(Value::Null),
            // Numbers are day counts.
            n if n.is_numeric() => {
                let days = n.as_f64().unwrap_or(0.0);
                Value::Interval(crate::types::Interval::new(
                    0,
                    days.trunc() as i32,
                    (days.fract() * 86_400_000_000.0) as i64,
                ))
            }
            _ => Value::Null,
        })
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Arc::new(IntegerCast));
    registry.register(Arc::new(NumberCast));
    registry.register(Arc::new(DecimalCast));
    registry.register(Arc::new(BooleanCast));
    registry.register(Arc::new(StringCast));
    registry.register(Arc::new(DateTimeCast));
    registry.register(Arc::new(TimestampTzCast));
    registry.register(Arc::new(IntervalCast));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::execute_function;

    #[test]
    fn test_integer_cast_yields_null_on_bad_input() {
        assert_eq!(
            execute_function("integer", &[Value::string("pear")]).unwrap(),
            Value::Null
        );
        assert_eq!(
            execute_function("int", &[Value::string("42")]).unwrap(),
            Value::Integer(42)
        );
    }

    #[test]
    fn test_numeric_preserves_scale() {
        assert_eq!(
            execute_function("numeric", &[Value::string("1.50")])
                .unwrap()
                .to_string(),
            "1.50"
        );
    }

    #[test]
    fn test_type_names() {
        assert_eq!(type_for_name("STRING"), Some(DataType::Str));
        assert_eq!(type_for_name("bigserial"), None);
    }
}
