//! Typed evaluation plans
//!
//! The compiler turns the AST into these nodes. Column references are
//! positional, aggregate and window calls have been replaced by stable slot
//! handles allocated at compile time, and every expression carries through
//! the type it was validated with. Plans are immutable after compile; all
//! evaluation state lives in the executor.

use crate::catalog::{Params, Table};
use crate::operators::{BinaryOp, UnaryOp};
use crate::parsing::ast::{self, Direction, FrameExclude, FrameUnits, JoinType, NullOrder, SetOperator};
use crate::types::{DataType, Value};
use std::collections::HashMap;
use std::fmt;

/// Compile options.
#[derive(Clone, Debug)]
pub struct CompileOptions {
    /// Auto-add non-aggregate SELECT targets as group keys in grouped
    /// queries. With this off, such targets are a strict-SQL compile error.
    pub implicit_group_by: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            implicit_group_by: true,
        }
    }
}

/// A compiled plan root.
#[derive(Clone, Debug)]
pub enum Plan {
    Query(QueryPlan),
    Insert(InsertPlan),
    Update(UpdatePlan),
    CreateTable(CreateTablePlan),
    /// A multi-statement batch. Children are planned one at a time during
    /// execution so DDL side effects are visible to later statements.
    Batch(BatchPlan),
}

#[derive(Clone, Debug)]
pub struct BatchPlan {
    pub statements: Vec<ast::Statement>,
    pub params: Option<Params>,
    pub options: CompileOptions,
    pub settings: HashMap<String, Value>,
}

/// A compiled SELECT.
#[derive(Clone, Debug)]
pub struct QueryPlan {
    pub source: Source,
    /// WHERE predicate over the source layout.
    pub filter: Option<Expression>,
    /// All targets, including hidden ones appended for GROUP/ORDER/PIVOT
    /// references. Hidden targets are stripped at projection time.
    pub targets: Vec<Target>,
    /// Whether this query groups rows (any aggregate target or GROUP BY).
    pub grouped: bool,
    /// Indices into `targets` forming the group key.
    pub group_by: Vec<usize>,
    /// Index into `targets` holding the HAVING expression.
    pub having: Option<usize>,
    /// Aggregate calls; the vector index is the aggregator's slot handle.
    pub aggregates: Vec<AggregateCall>,
    /// Window calls; the vector index is the window's slot handle.
    pub windows: Vec<WindowCall>,
    pub order_by: Vec<OrderKey>,
    /// Pivot axes as target indices (a, b); b is a group key.
    pub pivot: Option<(usize, usize)>,
    pub distinct: bool,
    pub limit: Option<usize>,
    /// Chained set operations applied left to right before ordering.
    pub compound: Vec<(SetOperator, QueryPlan)>,
    /// Whether this plan references columns of an enclosing query. Only
    /// uncorrelated subquery results may be cached.
    pub correlated: bool,
}

/// One SELECT target.
#[derive(Clone, Debug)]
pub struct Target {
    pub name: String,
    pub expr: Expression,
    pub data_type: DataType,
    /// Appended for GROUP/ORDER/PARTITION/PIVOT references; not part of the
    /// visible output schema.
    pub hidden: bool,
}

/// An ORDER BY key referencing a target.
#[derive(Clone, Copy, Debug)]
pub struct OrderKey {
    pub target: usize,
    pub direction: Direction,
    pub nulls: Option<NullOrder>,
}

/// A row source: the lowered FROM clause.
#[derive(Clone, Debug)]
pub enum Source {
    /// SELECT without FROM: one empty row.
    Nothing,
    /// A base table scan. The column layout is captured at compile time.
    Scan {
        table: String,
        alias: Option<String>,
        columns: Vec<SourceColumn>,
    },
    /// A subquery (or CTE) as a relation.
    Subquery {
        alias: String,
        plan: Box<QueryPlan>,
        columns: Vec<SourceColumn>,
    },
    /// A join of two sources.
    Join {
        left: Box<Source>,
        right: Box<Source>,
        join_type: JoinType,
        /// Full ON predicate over the combined layout (nested-loop path).
        predicate: Option<Expression>,
        /// Equi-join fast path: key expressions per side, when the ON
        /// condition is a clean conjunction of cross-side equalities.
        equi: Option<EquiJoin>,
    },
}

/// Hash-join key expressions: `left_keys[i] = right_keys[i]` for all i.
/// Left keys are compiled against the left layout, right keys against the
/// right layout.
#[derive(Clone, Debug)]
pub struct EquiJoin {
    pub left_keys: Vec<Expression>,
    pub right_keys: Vec<Expression>,
}

/// One column of a source layout.
#[derive(Clone, Debug)]
pub struct SourceColumn {
    /// Table name or alias the column is reachable under.
    pub qualifier: Option<String>,
    pub name: String,
    pub data_type: DataType,
    /// Whether `*` selects this column (tables may expose a smaller
    /// wildcard set than their full column list).
    pub in_wildcard: bool,
}

impl Source {
    /// The flattened column layout rows of this source follow.
    pub fn columns(&self) -> Vec<SourceColumn> {
        match self {
            Source::Nothing => Vec::new(),
            Source::Scan { columns, .. } | Source::Subquery { columns, .. } => columns.clone(),
            Source::Join { left, right, .. } => {
                let mut columns = left.columns();
                columns.extend(right.columns());
                columns
            }
        }
    }
}

/// An aggregate call with its modifiers, compiled against the source
/// layout. The position in `QueryPlan::aggregates` is the stable handle
/// that `Expression::AggregateSlot` refers to.
#[derive(Clone, Debug)]
pub struct AggregateCall {
    pub function: String,
    /// Compiled arguments; empty for `count(*)`.
    pub args: Vec<Expression>,
    /// `count(*)`: count rows, not values.
    pub star: bool,
    pub distinct: bool,
    pub filter: Option<Expression>,
    pub data_type: DataType,
}

/// A window call: the aggregate (or window-only function) plus the window
/// it runs over. The position in `QueryPlan::windows` is the handle that
/// `Expression::WindowSlot` refers to.
///
/// Arguments, partition keys and order keys are all lowered to target
/// indices (appending hidden targets as needed), so the window driver works
/// uniformly over materialized intermediate rows.
#[derive(Clone, Debug)]
pub struct WindowCall {
    pub function: String,
    /// Argument target indices; empty for `count(*)` and ranking functions.
    pub args: Vec<usize>,
    pub star: bool,
    pub distinct: bool,
    /// FILTER predicate as a target index.
    pub filter: Option<usize>,
    pub partition_by: Vec<usize>,
    pub order_by: Vec<(usize, Direction, Option<NullOrder>)>,
    pub frame: Frame,
    pub data_type: DataType,
}

/// A compiled window frame. Offsets are constant-folded values.
#[derive(Clone, Debug)]
pub struct Frame {
    pub units: FrameUnits,
    pub start: Bound,
    pub end: Bound,
    pub exclude: FrameExclude,
}

impl Frame {
    /// The default frame: RANGE BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW.
    pub fn default_frame() -> Self {
        Frame {
            units: FrameUnits::Range,
            start: Bound::UnboundedPreceding,
            end: Bound::CurrentRow,
            exclude: FrameExclude::NoOthers,
        }
    }

    /// Whether either bound is a non-zero offset (RANGE restriction).
    pub fn has_offset_bound(&self) -> bool {
        let is_offset = |bound: &Bound| match bound {
            Bound::Preceding(v) | Bound::Following(v) => {
                v.as_f64().map(|n| n != 0.0).unwrap_or(true)
            }
            _ => false,
        };
        is_offset(&self.start) || is_offset(&self.end)
    }
}

#[derive(Clone, Debug)]
pub enum Bound {
    UnboundedPreceding,
    Preceding(Value),
    CurrentRow,
    Following(Value),
    UnboundedFollowing,
}

/// A compiled INSERT.
#[derive(Clone, Debug)]
pub struct InsertPlan {
    pub table: String,
    /// Target column index per value position.
    pub column_indices: Vec<usize>,
    /// DEFAULT expression per table column, for columns the statement
    /// omits.
    pub defaults: Vec<Option<Expression>>,
    /// Compiled value rows.
    pub rows: Vec<Vec<Expression>>,
    /// Compiled row constraints, checked per row before append.
    pub constraints: Vec<CompiledConstraint>,
    /// RETURNING targets over the inserted row.
    pub returning: Option<Vec<Target>>,
}

/// A compiled UPDATE.
#[derive(Clone, Debug)]
pub struct UpdatePlan {
    pub table: String,
    /// (column index, value expression) assignments.
    pub assignments: Vec<(usize, Expression)>,
    pub filter: Option<Expression>,
    pub constraints: Vec<CompiledConstraint>,
    pub returning: Option<Vec<Target>>,
}

/// A compiled CREATE TABLE.
#[derive(Clone, Debug)]
pub struct CreateTablePlan {
    /// The schema to register (no rows).
    pub table: Table,
    pub if_not_exists: bool,
    /// CREATE TABLE ... AS: seed rows from this query.
    pub as_query: Option<QueryPlan>,
}

/// A table constraint compiled against the table's own column layout.
#[derive(Clone, Debug)]
pub struct CompiledConstraint {
    pub name: String,
    /// Column guarded by a NOT NULL constraint.
    pub column: Option<usize>,
    /// Boolean expression; None for NOT NULL constraints.
    pub expr: Option<Expression>,
}

/// A compiled, typed expression. Evaluated against a row of the source
/// layout via `execution::expression::evaluate`.
#[derive(Clone, Debug)]
pub enum Expression {
    /// A constant value.
    Constant(Value),
    /// A column reference into the current row.
    Column(usize),
    /// A column of an enclosing query's row, for correlated subqueries:
    /// (scope levels up, column index).
    OuterColumn(usize, usize),
    /// A binary operator application.
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    /// A unary operator application.
    Unary(UnaryOp, Box<Expression>),
    /// IS NULL / IS NOT NULL (null-safe).
    IsNull(Box<Expression>, bool),
    /// Membership in a value list.
    In {
        expr: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },
    /// Membership in a single-column subquery result.
    InSubquery {
        expr: Box<Expression>,
        query: Box<QueryPlan>,
        negated: bool,
    },
    /// Range test with three-way null propagation.
    Between {
        expr: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        negated: bool,
    },
    /// A scalar function call.
    Function(String, Vec<Expression>),
    /// CASE, simple or searched.
    Case {
        operand: Option<Box<Expression>>,
        when_clauses: Vec<(Expression, Expression)>,
        else_clause: Option<Box<Expression>>,
    },
    /// List literal.
    MakeList(Vec<Expression>),
    /// Subscript access on a list (or field access on a dynamic value).
    Subscript(Box<Expression>, Box<Expression>),
    /// A 1x1 subquery used as a scalar.
    ScalarSubquery(Box<QueryPlan>),
    /// A finalized aggregate's value, by handle.
    AggregateSlot(usize),
    /// A window function's per-row value, by handle.
    WindowSlot(usize),
}

impl Expression {
    /// Whether this expression is constant (no column references, slots or
    /// subqueries anywhere).
    pub fn is_constant(&self) -> bool {
        use Expression::*;
        match self {
            Constant(_) => true,
            Column(_) | OuterColumn(..) | AggregateSlot(_) | WindowSlot(_)
            | ScalarSubquery(_) | InSubquery { .. } => false,
            Binary(_, lhs, rhs) => lhs.is_constant() && rhs.is_constant(),
            Unary(_, expr) | IsNull(expr, _) => expr.is_constant(),
            In { expr, list, .. } => expr.is_constant() && list.iter().all(|e| e.is_constant()),
            Between {
                expr, low, high, ..
            } => expr.is_constant() && low.is_constant() && high.is_constant(),
            Function(_, args) => args.iter().all(|e| e.is_constant()),
            Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                operand.as_ref().is_none_or(|e| e.is_constant())
                    && when_clauses
                        .iter()
                        .all(|(w, t)| w.is_constant() && t.is_constant())
                    && else_clause.as_ref().is_none_or(|e| e.is_constant())
            }
            MakeList(items) => items.iter().all(|e| e.is_constant()),
            Subscript(base, index) => base.is_constant() && index.is_constant(),
        }
    }

    /// Structural equality, used for GROUP BY key reuse against targets.
    pub fn structurally_equals(&self, other: &Expression) -> bool {
        // Debug formatting is a faithful structural rendering of the tree.
        format!("{:?}", self) == format!("{:?}", other)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Expression::*;
        match self {
            Constant(value) => write!(f, "{}", value),
            Column(i) => write!(f, "#{}", i),
            OuterColumn(level, i) => write!(f, "outer({})#{}", level, i),
            Binary(op, lhs, rhs) => write!(f, "({} {:?} {})", lhs, op, rhs),
            Unary(op, expr) => write!(f, "({:?} {})", op, expr),
            IsNull(expr, negated) => {
                write!(f, "({} IS {}NULL)", expr, if *negated { "NOT " } else { "" })
            }
            In { expr, negated, .. } => {
                write!(f, "({} {}IN (...))", expr, if *negated { "NOT " } else { "" })
            }
            InSubquery { expr, negated, .. } => {
                write!(f, "({} {}IN (subquery))", expr, if *negated { "NOT " } else { "" })
            }
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
            Function(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Case { .. } => write!(f, "CASE ... END"),
            MakeList(items) => write!(f, "[{} items]", items.len()),
            Subscript(base, index) => write!(f, "{}[{}]", base, index),
            ScalarSubquery(_) => write!(f, "(subquery)"),
            AggregateSlot(i) => write!(f, "agg#{}", i),
            WindowSlot(i) => write!(f, "win#{}", i),
        }
    }
}
