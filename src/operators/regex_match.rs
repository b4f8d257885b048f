//! POSIX-style regex match operators: `~ ~* !~ !~* ?~ ?~*`

use super::traits::BinaryOperator;
use crate::error::{Error, Result};
use crate::types::{DataType, Signature, Value};
use regex::RegexBuilder;

/// One configuration of the regex match family. The `*` forms match
/// case-insensitively, the `!` forms negate, and the `?` forms take the
/// pattern as the LEFT operand (and honor `(?flags)` inline prefixes, which
/// the regex engine supports natively).
pub struct MatchOperator {
    pub case_insensitive: bool,
    pub negated: bool,
    pub swapped: bool,
}

impl MatchOperator {
    pub const fn new(case_insensitive: bool, negated: bool, swapped: bool) -> Self {
        MatchOperator {
            case_insensitive,
            negated,
            swapped,
        }
    }
}

impl BinaryOperator for MatchOperator {
    fn symbol(&self) -> &'static str {
        match (self.swapped, self.negated, self.case_insensitive) {
            (false, false, false) => "~",
            (false, false, true) => "~*",
            (false, true, false) => "!~",
            (false, true, true) => "!~*",
            (true, _, false) => "?~",
            (true, _, true) => "?~*",
        }
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Str, DataType::Str],
            DataType::Boolean,
        )]
    }

    fn execute(&self, left: &Value, right: &Value) -> Result<Value> {
        let (value, pattern) = if self.swapped {
            (right, left)
        } else {
            (left, right)
        };
        let (Value::Str(value), Value::Str(pattern)) = (value, pattern) else {
            return Err(Error::NotSupported(crate::types::render_call(
                self.symbol(),
                &[left.data_type(), right.data_type()],
            )));
        };
        let regex = compile(pattern, self.case_insensitive)?;
        let matched = regex.is_match(value);
        Ok(Value::Boolean(matched != self.negated))
    }
}

/// Compiles a pattern; bad patterns are execution errors rather than NULLs
/// since they indicate a broken query, not bad data.
pub fn compile(pattern: &str, case_insensitive: bool) -> Result<regex::Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| Error::ExecutionError(format!("invalid regex '{}': {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::traits::BinaryOperator;

    #[test]
    fn test_match_variants() {
        let plain = MatchOperator::new(false, false, false);
        assert_eq!(
            plain
                .apply(&Value::string("hello"), &Value::string("^he"))
                .unwrap(),
            Value::Boolean(true)
        );

        let insensitive = MatchOperator::new(true, false, false);
        assert_eq!(
            insensitive
                .apply(&Value::string("HELLO"), &Value::string("^he"))
                .unwrap(),
            Value::Boolean(true)
        );

        let negated = MatchOperator::new(false, true, false);
        assert_eq!(
            negated
                .apply(&Value::string("world"), &Value::string("^he"))
                .unwrap(),
            Value::Boolean(true)
        );

        let swapped = MatchOperator::new(false, false, true);
        assert_eq!(
            swapped
                .apply(&Value::string("^he"), &Value::string("hello"))
                .unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_inline_flags() {
        let swapped = MatchOperator::new(false, false, true);
        assert_eq!(
            swapped
                .apply(&Value::string("(?i)^he"), &Value::string("HELLO"))
                .unwrap(),
            Value::Boolean(true)
        );
    }
}
