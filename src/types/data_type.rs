//! Data type tags and overload signatures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tags for values and expression results.
///
/// `Object` is the dynamic "any" type, `Asterisk` the `*` marker accepted by
/// `COUNT(*)`, and `Vararg` marks a trailing repeated parameter in overload
/// signatures. None of the latter two ever describe a runtime value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Null,
    Integer,
    Real,
    Decimal,
    Boolean,
    Str,
    DateTime,
    Interval,
    List(Box<DataType>),
    Object,
    Asterisk,
    Vararg(Box<DataType>),
}

impl DataType {
    /// Whether an argument of type `arg` is accepted where `self` is
    /// required. `Object` accepts any concrete type, `Real` accepts
    /// `Integer` (integers extend numbers), and `Null` is accepted
    /// everywhere since null propagation happens before dispatch.
    pub fn accepts(&self, arg: &DataType) -> bool {
        if self == arg || matches!(arg, DataType::Null) {
            return true;
        }
        match self {
            DataType::Object => !matches!(arg, DataType::Asterisk),
            DataType::Real => matches!(arg, DataType::Integer),
            DataType::List(inner) => match arg {
                DataType::List(arg_inner) => inner.accepts(arg_inner),
                _ => false,
            },
            _ => false,
        }
    }

    /// Whether this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Integer | DataType::Real | DataType::Decimal
        )
    }

    /// Whether ORDER BY keys of this type support RANGE offset frames.
    pub fn is_range_comparable(&self) -> bool {
        matches!(
            self,
            DataType::Integer
                | DataType::Real
                | DataType::Decimal
                | DataType::DateTime
                | DataType::Interval
        )
    }

    /// Named sub-attributes for structured types. Attribute access and
    /// `expr.*` expansion use these; each name doubles as the builtin
    /// function that computes the attribute from the base value.
    pub fn attributes(&self) -> &'static [(&'static str, DataType)] {
        match self {
            DataType::DateTime => &[
                ("year", DataType::Integer),
                ("month", DataType::Integer),
                ("day", DataType::Integer),
                ("quarter", DataType::Integer),
                ("weekday", DataType::Integer),
                ("yearmonth", DataType::Str),
                ("hour", DataType::Integer),
                ("minute", DataType::Integer),
                ("second", DataType::Integer),
            ],
            DataType::Interval => &[
                ("days", DataType::Real),
                ("hours", DataType::Real),
                ("minutes", DataType::Real),
                ("seconds", DataType::Real),
            ],
            _ => &[],
        }
    }

    /// Looks up a named attribute on a structured type.
    pub fn attribute(&self, name: &str) -> Option<DataType> {
        self.attributes()
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, t)| t.clone())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Null => write!(f, "null"),
            DataType::Integer => write!(f, "integer"),
            DataType::Real => write!(f, "number"),
            DataType::Decimal => write!(f, "numeric"),
            DataType::Boolean => write!(f, "boolean"),
            DataType::Str => write!(f, "text"),
            DataType::DateTime => write!(f, "datetime"),
            DataType::Interval => write!(f, "interval"),
            DataType::List(inner) => write!(f, "{}[]", inner),
            DataType::Object => write!(f, "any"),
            DataType::Asterisk => write!(f, "*"),
            DataType::Vararg(inner) => write!(f, "{}...", inner),
        }
    }
}

/// A typed overload: fixed parameters, an optional trailing vararg type, and
/// the result type. Dispatch over a set of signatures picks the most
/// specific match (fewest `Object` slots, exact `Integer` outranking a
/// `Real` slot matched by extension), deterministically.
#[derive(Debug, Clone)]
pub struct Signature {
    pub params: Vec<DataType>,
    pub vararg: Option<DataType>,
    pub returns: DataType,
    /// Null-safe signatures see null arguments instead of short-circuiting
    /// the whole call to null (IS NULL, NOT, COALESCE, CASE).
    pub null_safe: bool,
}

impl Signature {
    pub fn new(params: Vec<DataType>, returns: DataType) -> Self {
        Signature {
            params,
            vararg: None,
            returns,
            null_safe: false,
        }
    }

    pub fn vararg(mut self, vararg: DataType) -> Self {
        self.vararg = Some(vararg);
        self
    }

    pub fn null_safe(mut self) -> Self {
        self.null_safe = true;
        self
    }

    /// Whether the given argument types match this signature.
    pub fn matches(&self, args: &[DataType]) -> bool {
        if args.len() < self.params.len() {
            return false;
        }
        if args.len() > self.params.len() && self.vararg.is_none() {
            return false;
        }
        for (param, arg) in self.params.iter().zip(args.iter()) {
            if !param.accepts(arg) {
                return false;
            }
        }
        if let Some(vararg) = &self.vararg {
            for arg in &args[self.params.len()..] {
                if !vararg.accepts(arg) {
                    return false;
                }
            }
        }
        true
    }

    /// Specificity against concrete argument types. Exact slot matches score
    /// highest, extension matches (Integer where Real is required) next,
    /// `Object` slots lowest, so a dedicated Integer overload beats a
    /// generic Number one and both beat a fully dynamic signature.
    pub fn specificity(&self, args: &[DataType]) -> usize {
        let mut score = 0;
        for (i, arg) in args.iter().enumerate() {
            let param = self
                .params
                .get(i)
                .or(self.vararg.as_ref())
                .unwrap_or(&DataType::Object);
            score += match param {
                DataType::Object => 0,
                p if p == arg => 3,
                _ => 1,
            };
        }
        score
    }
}

/// Selects the best-matching signature for the given argument types.
/// Returns the index of the winner, or None when nothing matches.
pub fn select_overload(signatures: &[Signature], args: &[DataType]) -> Option<usize> {
    signatures
        .iter()
        .enumerate()
        .filter(|(_, sig)| sig.matches(args))
        .max_by_key(|(i, sig)| (sig.specificity(args), std::cmp::Reverse(*i)))
        .map(|(i, _)| i)
}

/// Renders a call signature for NotSupported diagnostics,
/// e.g. `+(boolean, interval)`.
pub fn render_call(name: &str, args: &[DataType]) -> String {
    let rendered: Vec<String> = args.iter().map(|t| t.to_string()).collect();
    format!("{}({})", name, rendered.join(", "))
}
