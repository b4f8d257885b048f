//! String and boolean coercions

use crate::error::{Error, Result};
use crate::types::Value;

/// Convert to Boolean. Strings accept the usual SQL spellings.
pub fn to_boolean(value: Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Boolean(_) => Ok(value),
        Value::Integer(n) => Ok(Value::Boolean(n != 0)),
        Value::Real(n) => Ok(Value::Boolean(n != 0.0)),
        Value::Decimal(d) => Ok(Value::Boolean(!d.is_zero())),
        Value::Str(s) => match s.trim().to_lowercase().as_str() {
            "true" | "t" | "yes" | "on" | "1" => Ok(Value::Boolean(true)),
            "false" | "f" | "no" | "off" | "0" => Ok(Value::Boolean(false)),
            _ => Err(Error::InvalidValue(format!(
                "cannot parse '{}' as boolean",
                s
            ))),
        },
        v => Err(Error::TypeMismatch {
            expected: "boolean".into(),
            found: v.data_type().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_spellings() {
        assert_eq!(to_boolean(Value::string("TRUE")).unwrap(), Value::Boolean(true));
        assert_eq!(to_boolean(Value::string("off")).unwrap(), Value::Boolean(false));
        assert!(to_boolean(Value::string("maybe")).is_err());
    }
}
