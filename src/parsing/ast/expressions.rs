//! SQL expressions, e.g. `a + 7 > b`. Can be nested.

use super::common::WindowSpec;
use super::dml::SelectStatement;
use std::fmt;

#[derive(Clone, Debug)]
pub enum Expression {
    /// All columns, i.e. `*`.
    All,
    /// All columns of a named table or structure, i.e. `t.*`.
    QualifiedAll(Box<Expression>),
    /// A column reference, optionally qualified with a table name.
    Column(Option<String>, String),
    /// A literal value.
    Literal(Literal),
    /// An operator.
    Operator(Operator),
    /// A function call.
    Function(FunctionCall),
    /// A parameter placeholder.
    Parameter(Placeholder),
    /// CASE expression, simple (with operand) or searched.
    Case {
        operand: Option<Box<Expression>>,
        when_clauses: Vec<(Expression, Expression)>,
        else_clause: Option<Box<Expression>>,
    },
    /// Attribute access on a structured value: `base.field`.
    FieldAccess {
        base: Box<Expression>,
        field: String,
    },
    /// Method-call sugar: `base.f(args)`, compiled as `f(base, args...)`.
    Method {
        base: Box<Expression>,
        name: String,
        args: Vec<Expression>,
    },
    /// Subscript access: `base["key"]` or `base[index]`.
    Subscript {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    /// Cast suffix `expr::type`, compiled as the type's cast function.
    Cast {
        expr: Box<Expression>,
        type_name: String,
    },
    /// Array literal: `[1, 2, 3]`.
    ArrayLiteral(Vec<Expression>),
    /// Tuple literal: `(1, 2, 3)`.
    TupleLiteral(Vec<Expression>),
    /// A parenthesized subquery used as a scalar or list value.
    Subquery(Box<SelectStatement>),
}

/// Expression literal values.
#[derive(Clone, Debug)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Placeholder styles. A statement must use only one of the two.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placeholder {
    /// `?`, with its position in order of appearance (0-indexed).
    Positional(usize),
    /// `:name`.
    Named(String),
}

/// A function or aggregate call, with the aggregate-only modifiers.
#[derive(Clone, Debug)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expression>,
    /// `f(DISTINCT x)`; only valid on aggregates.
    pub distinct: bool,
    /// `FILTER (WHERE cond)`; only valid on aggregates.
    pub filter: Option<Box<Expression>>,
    /// `OVER (...)` or `OVER name`; turns the aggregate into a window call.
    pub over: Option<OverClause>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Vec<Expression>) -> Self {
        FunctionCall {
            name: name.into(),
            args,
            distinct: false,
            filter: None,
            over: None,
        }
    }
}

/// The OVER clause of a window call.
#[derive(Clone, Debug)]
pub struct OverClause {
    /// A named window this reference starts from, if any.
    pub name: Option<String>,
    /// Subfields provided at the reference site (override the named base).
    pub spec: WindowSpec,
}

/// Expression operators.
#[derive(Clone, Debug)]
pub enum Operator {
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),

    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    GreaterThanOrEqual(Box<Expression>, Box<Expression>),
    LessThan(Box<Expression>, Box<Expression>),
    LessThanOrEqual(Box<Expression>, Box<Expression>),
    /// `a IS NULL` / `a IS NOT NULL`.
    IsNull {
        expr: Box<Expression>,
        negated: bool,
    },

    Add(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),
    Remainder(Box<Expression>, Box<Expression>),
    Identity(Box<Expression>),
    Negate(Box<Expression>),

    /// Regex match `a ~ p` and its variants: `~*` case-insensitive, `!~`
    /// negated, `?~` with operands swapped and `(?flags)` prefix support.
    Match {
        expr: Box<Expression>,
        pattern: Box<Expression>,
        case_insensitive: bool,
        negated: bool,
        swapped: bool,
    },

    /// `a IN (list)` / `a NOT IN (list)`, list or subquery.
    In {
        expr: Box<Expression>,
        list: Box<Expression>,
        negated: bool,
    },

    /// `a BETWEEN low AND high` / `a NOT BETWEEN low AND high`.
    Between {
        expr: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        negated: bool,
    },
}

impl From<Literal> for Expression {
    fn from(literal: Literal) -> Self {
        Expression::Literal(literal)
    }
}

impl From<Operator> for Expression {
    fn from(operator: Operator) -> Self {
        Expression::Operator(operator)
    }
}

impl Expression {
    /// Walks the expression tree depth-first, calling a closure for every
    /// node. Halts and returns false if the closure returns false. Does not
    /// descend into subqueries.
    pub fn walk(&self, visitor: &mut impl FnMut(&Expression) -> bool) -> bool {
        use Operator::*;

        if !visitor(self) {
            return false;
        }

        match self {
            Self::Operator(op) => match op {
                Add(lhs, rhs)
                | And(lhs, rhs)
                | Divide(lhs, rhs)
                | Equal(lhs, rhs)
                | GreaterThan(lhs, rhs)
                | GreaterThanOrEqual(lhs, rhs)
                | LessThan(lhs, rhs)
                | LessThanOrEqual(lhs, rhs)
                | Multiply(lhs, rhs)
                | NotEqual(lhs, rhs)
                | Or(lhs, rhs)
                | Remainder(lhs, rhs)
                | Subtract(lhs, rhs) => lhs.walk(visitor) && rhs.walk(visitor),

                Identity(expr) | Negate(expr) | Not(expr) => expr.walk(visitor),
                IsNull { expr, .. } => expr.walk(visitor),

                Match { expr, pattern, .. } => expr.walk(visitor) && pattern.walk(visitor),

                In { expr, list, .. } => expr.walk(visitor) && list.walk(visitor),

                Between {
                    expr, low, high, ..
                } => expr.walk(visitor) && low.walk(visitor) && high.walk(visitor),
            },

            Self::Function(call) => {
                call.args.iter().all(|arg| arg.walk(visitor))
                    && call.filter.as_ref().is_none_or(|f| f.walk(visitor))
            }

            Self::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                if let Some(op) = operand
                    && !op.walk(visitor)
                {
                    return false;
                }
                for (cond, result) in when_clauses {
                    if !cond.walk(visitor) || !result.walk(visitor) {
                        return false;
                    }
                }
                if let Some(else_expr) = else_clause
                    && !else_expr.walk(visitor)
                {
                    return false;
                }
                true
            }

            Self::FieldAccess { base, .. } => base.walk(visitor),
            Self::QualifiedAll(base) => base.walk(visitor),
            Self::Method { base, args, .. } => {
                base.walk(visitor) && args.iter().all(|a| a.walk(visitor))
            }
            Self::Subscript { base, index } => base.walk(visitor) && index.walk(visitor),
            Self::Cast { expr, .. } => expr.walk(visitor),
            Self::ArrayLiteral(items) | Self::TupleLiteral(items) => {
                items.iter().all(|e| e.walk(visitor))
            }

            _ => true,
        }
    }

    /// Whether the expression contains an aggregate or window call anywhere.
    pub fn contains_aggregate(&self) -> bool {
        !self.walk(&mut |expr| match expr {
            Expression::Function(call) => {
                !(crate::functions::is_aggregate(&call.name) && call.over.is_none())
            }
            _ => true,
        })
    }

    /// Whether the expression contains a window call anywhere.
    pub fn contains_window(&self) -> bool {
        !self.walk(&mut |expr| {
            !matches!(expr, Expression::Function(call) if call.over.is_some())
        })
    }
}

// Renders the expression back as SQL text. Used for constraint expressions
// in the persisted table model, which are re-parsed on load.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::All => write!(f, "*"),
            Expression::QualifiedAll(base) => write!(f, "{}.*", base),
            Expression::Column(None, name) => write!(f, "{}", name),
            Expression::Column(Some(qualifier), name) => write!(f, "{}.{}", qualifier, name),
            Expression::Literal(literal) => write!(f, "{}", literal),
            Expression::Operator(op) => write!(f, "{}", op),
            Expression::Function(call) => {
                write!(f, "{}(", call.name)?;
                if call.distinct {
                    write!(f, "DISTINCT ")?;
                }
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Parameter(Placeholder::Positional(_)) => write!(f, "?"),
            Expression::Parameter(Placeholder::Named(name)) => write!(f, ":{}", name),
            Expression::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                write!(f, "CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {}", operand)?;
                }
                for (when, then) in when_clauses {
                    write!(f, " WHEN {} THEN {}", when, then)?;
                }
                if let Some(else_clause) = else_clause {
                    write!(f, " ELSE {}", else_clause)?;
                }
                write!(f, " END")
            }
            Expression::FieldAccess { base, field } => write!(f, "{}.{}", base, field),
            Expression::Method { base, name, args } => {
                write!(f, "{}.{}(", base, name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Subscript { base, index } => write!(f, "{}[{}]", base, index),
            Expression::Cast { expr, type_name } => write!(f, "{}::{}", expr, type_name),
            Expression::ArrayLiteral(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Expression::TupleLiteral(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Expression::Subquery(_) => write!(f, "(subquery)"),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(true) => write!(f, "TRUE"),
            Literal::Boolean(false) => write!(f, "FALSE"),
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Float(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Operator::*;
        match self {
            And(lhs, rhs) => write!(f, "({} AND {})", lhs, rhs),
            Or(lhs, rhs) => write!(f, "({} OR {})", lhs, rhs),
            Not(expr) => write!(f, "(NOT {})", expr),
            Equal(lhs, rhs) => write!(f, "({} = {})", lhs, rhs),
            NotEqual(lhs, rhs) => write!(f, "({} != {})", lhs, rhs),
            GreaterThan(lhs, rhs) => write!(f, "({} > {})", lhs, rhs),
            GreaterThanOrEqual(lhs, rhs) => write!(f, "({} >= {})", lhs, rhs),
            LessThan(lhs, rhs) => write!(f, "({} < {})", lhs, rhs),
            LessThanOrEqual(lhs, rhs) => write!(f, "({} <= {})", lhs, rhs),
            IsNull { expr, negated: false } => write!(f, "({} IS NULL)", expr),
            IsNull { expr, negated: true } => write!(f, "({} IS NOT NULL)", expr),
            Add(lhs, rhs) => write!(f, "({} + {})", lhs, rhs),
            Subtract(lhs, rhs) => write!(f, "({} - {})", lhs, rhs),
            Multiply(lhs, rhs) => write!(f, "({} * {})", lhs, rhs),
            Divide(lhs, rhs) => write!(f, "({} / {})", lhs, rhs),
            Remainder(lhs, rhs) => write!(f, "({} % {})", lhs, rhs),
            Identity(expr) => write!(f, "(+{})", expr),
            Negate(expr) => write!(f, "(-{})", expr),
            Match {
                expr,
                pattern,
                case_insensitive,
                negated,
                swapped,
            } => {
                let symbol = match (swapped, negated, case_insensitive) {
                    (false, false, false) => "~",
                    (false, false, true) => "~*",
                    (false, true, false) => "!~",
                    (false, true, true) => "!~*",
                    (true, _, false) => "?~",
                    (true, _, true) => "?~*",
                };
                write!(f, "({} {} {})", expr, symbol, pattern)
            }
            In {
                expr,
                list,
                negated,
            } => write!(
                f,
                "({} {}IN {})",
                expr,
                if *negated { "NOT " } else { "" },
                list
            ),
            Between {
                expr,
                low,
                high,
                negated,
            } => write!(
                f,
                "({} {}BETWEEN {} AND {})",
                expr,
                if *negated { "NOT " } else { "" },
                low,
                high
            ),
        }
    }
}
