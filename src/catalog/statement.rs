//! Prepared statements and parameter binding

use crate::error::{Error, Result};
use crate::parsing::ast::Statement;
use crate::parsing::PlaceholderUse;
use crate::types::Value;
use std::collections::HashMap;

/// A parsed statement batch plus everything harvested during parsing:
/// `SET` settings, parse errors, and which placeholder styles occurred.
/// Parse errors do not fail preparation; compiling a statement with parse
/// errors does.
#[derive(Clone, Debug, Default)]
pub struct PreparedStatement {
    /// The original statement text.
    pub query: String,
    /// The parsed statements, in textual order. SET statements are
    /// harvested into `settings` and not included here.
    pub statements: Vec<Statement>,
    /// Parse errors collected from the text.
    pub parse_errors: Vec<Error>,
    /// Settings captured from SET statements, scoped to this statement.
    pub settings: HashMap<String, Value>,
    /// Placeholder styles used by the statements.
    pub placeholders: PlaceholderUse,
}

impl PreparedStatement {
    /// Whether the statement batch parsed cleanly.
    pub fn is_ok(&self) -> bool {
        self.parse_errors.is_empty()
    }
}

/// Statement parameters: all-positional or all-named, never mixed.
#[derive(Clone, Debug)]
pub enum Params {
    Positional(Vec<Value>),
    Named(HashMap<String, Value>),
}

impl Params {
    /// Checks the parameters against the placeholder styles a statement
    /// uses. Mixing styles or passing the wrong shape is a programming
    /// error, caught before any execution.
    pub fn check(&self, placeholders: &PlaceholderUse) -> Result<()> {
        if placeholders.positional > 0 && placeholders.named {
            return Err(Error::ProgrammingError(
                "statement mixes positional and named placeholders".into(),
            ));
        }
        match self {
            Params::Positional(values) => {
                if placeholders.named {
                    return Err(Error::ProgrammingError(
                        "statement uses named placeholders, got a parameter sequence".into(),
                    ));
                }
                if values.len() != placeholders.positional {
                    return Err(Error::ProgrammingError(format!(
                        "statement takes {} parameters, got {}",
                        placeholders.positional,
                        values.len()
                    )));
                }
            }
            Params::Named(_) => {
                if placeholders.positional > 0 {
                    return Err(Error::ProgrammingError(
                        "statement uses positional placeholders, got a parameter mapping".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Resolves a positional placeholder.
    pub fn positional(&self, index: usize) -> Result<Value> {
        match self {
            Params::Positional(values) => values.get(index).cloned().ok_or_else(|| {
                Error::ProgrammingError(format!("missing parameter {}", index + 1))
            }),
            Params::Named(_) => Err(Error::ProgrammingError(
                "statement uses positional placeholders, got a parameter mapping".into(),
            )),
        }
    }

    /// Resolves a named placeholder.
    pub fn named(&self, name: &str) -> Result<Value> {
        match self {
            Params::Named(values) => values
                .get(name)
                .cloned()
                .ok_or_else(|| Error::ProgrammingError(format!("missing parameter :{}", name))),
            Params::Positional(_) => Err(Error::ProgrammingError(
                "statement uses named placeholders, got a parameter sequence".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_placeholders_rejected() {
        let params = Params::Positional(vec![Value::Integer(1)]);
        let mixed = PlaceholderUse {
            positional: 1,
            named: true,
        };
        assert!(matches!(
            params.check(&mixed),
            Err(Error::ProgrammingError(_))
        ));
    }

    #[test]
    fn test_arity_mismatch_rejected() {
        let params = Params::Positional(vec![Value::Integer(1)]);
        let two = PlaceholderUse {
            positional: 2,
            named: false,
        };
        assert!(params.check(&two).is_err());
    }
}
