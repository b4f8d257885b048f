//! Expression resolution: AST expressions to typed plan expressions
//!
//! Resolves names to row positions, dispatches operators and functions over
//! their typed overloads, rewrites attribute/method access and cast
//! suffixes into function calls, extracts aggregate and window calls into
//! slot handles, and folds constants.

use super::plan::{AggregateCall, Expression, Frame};
use super::planner::{Planner, Scope};
use crate::error::{Error, Result};
use crate::execution::expression::EvalContext;
use crate::functions;
use crate::operators::{self, BinaryOp, UnaryOp};
use crate::parsing::ast::{self, Direction, NullOrder, WindowSpec};
use crate::types::{DataType, Value};

/// Per-query resolution state: the aggregate and window lists being built,
/// and what the current syntactic position allows.
pub(super) struct ExprState {
    pub aggregates: Vec<AggregateCall>,
    pub pending_windows: Vec<PendingWindow>,
    pub named_windows: Vec<(String, WindowSpec)>,
    pub allow_aggregates: bool,
    pub allow_windows: bool,
    pub in_aggregate: bool,
}

impl ExprState {
    pub fn new(named_windows: Vec<(String, WindowSpec)>) -> Self {
        ExprState {
            aggregates: Vec::new(),
            pending_windows: Vec::new(),
            named_windows,
            allow_aggregates: false,
            allow_windows: false,
            in_aggregate: false,
        }
    }
}

/// A window call resolved against the source scope, before its pieces are
/// lowered onto target indices.
pub(super) struct PendingWindow {
    pub function: String,
    pub args: Vec<(Expression, DataType)>,
    pub star: bool,
    pub distinct: bool,
    pub filter: Option<(Expression, DataType)>,
    pub partition_by: Vec<(Expression, DataType)>,
    pub order_by: Vec<(Expression, DataType, Direction, Option<NullOrder>)>,
    pub frame: Frame,
    pub data_type: DataType,
}

impl Planner<'_> {
    /// Resolves a SELECT target: aggregates and windows allowed.
    pub(super) fn resolve_target(
        &mut self,
        expr: &ast::Expression,
        scope: &Scope,
        state: &mut ExprState,
    ) -> Result<(Expression, DataType)> {
        let (was_aggr, was_win) = (state.allow_aggregates, state.allow_windows);
        state.allow_aggregates = true;
        state.allow_windows = true;
        let result = self.resolve_expr(expr, scope, state);
        state.allow_aggregates = was_aggr;
        state.allow_windows = was_win;
        result
    }

    /// Resolves an expression where aggregates and windows are structural
    /// misuse (WHERE, JOIN ON, CHECK, ...).
    pub(super) fn resolve_plain(
        &mut self,
        expr: &ast::Expression,
        scope: &Scope,
        state: &mut ExprState,
        context: &'static str,
    ) -> Result<(Expression, DataType)> {
        if expr.contains_aggregate() {
            return Err(Error::CompileError(format!(
                "aggregate functions are not allowed in {}",
                context
            )));
        }
        if expr.contains_window() {
            return Err(Error::CompileError(format!(
                "window functions are not allowed in {}",
                context
            )));
        }
        let (was_aggr, was_win) = (state.allow_aggregates, state.allow_windows);
        state.allow_aggregates = false;
        state.allow_windows = false;
        let result = self.resolve_expr(expr, scope, state);
        state.allow_aggregates = was_aggr;
        state.allow_windows = was_win;
        result
    }

    pub(super) fn resolve_expr(
        &mut self,
        expr: &ast::Expression,
        scope: &Scope,
        state: &mut ExprState,
    ) -> Result<(Expression, DataType)> {
        match expr {
            ast::Expression::Literal(literal) => {
                let value = literal_value(literal);
                let data_type = value.data_type();
                Ok((Expression::Constant(value), data_type))
            }

            ast::Expression::Parameter(placeholder) => {
                let params = self.params.ok_or_else(|| {
                    Error::ProgrammingError(
                        "statement has placeholders but no parameters were given".into(),
                    )
                })?;
                let value = match placeholder {
                    ast::Placeholder::Positional(index) => params.positional(*index)?,
                    ast::Placeholder::Named(name) => params.named(name)?,
                };
                let data_type = value.data_type();
                Ok((Expression::Constant(value), data_type))
            }

            ast::Expression::Column(qualifier, name) => {
                self.resolve_column(qualifier.as_deref(), name, scope, state)
            }

            ast::Expression::FieldAccess { base, field } => {
                let (base_expr, base_type) = self.resolve_expr(base, scope, state)?;
                self.resolve_attribute(base_expr, &base_type, field)
            }

            ast::Expression::Method { base, name, args } => {
                // Dotted-method sugar: expr.f(args) is f(expr, args...).
                let mut call_args = Vec::with_capacity(args.len() + 1);
                call_args.push((**base).clone());
                call_args.extend(args.iter().cloned());
                let call = ast::FunctionCall::new(name.clone(), call_args);
                self.resolve_function(&call, scope, state)
            }

            ast::Expression::Cast { expr, type_name } => {
                let Some(target) = crate::functions::casts::type_for_name(type_name) else {
                    return Err(Error::CompileError(format!(
                        "unknown type {} in cast",
                        type_name
                    )));
                };
                // An `any` cast is a no-op; everything else routes through
                // the type's cast function, canonicalized so aliases like
                // `float` reach `number`.
                if matches!(target, DataType::Object) {
                    let (inner, _) = self.resolve_expr(expr, scope, state)?;
                    return Ok((inner, DataType::Object));
                }
                let name = if functions::get_function(type_name).is_some() {
                    type_name.clone()
                } else {
                    canonical_cast_name(&target).to_string()
                };
                let call = ast::FunctionCall::new(name, vec![(**expr).clone()]);
                self.resolve_function(&call, scope, state)
            }

            ast::Expression::Function(call) => self.resolve_function(call, scope, state),

            ast::Expression::Operator(op) => self.resolve_operator(op, scope, state),

            ast::Expression::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                let operand = operand
                    .as_ref()
                    .map(|e| self.resolve_expr(e, scope, state))
                    .transpose()?;
                let mut compiled_whens = Vec::new();
                let mut result_type = DataType::Null;
                for (when, then) in when_clauses {
                    let (when_expr, _) = self.resolve_expr(when, scope, state)?;
                    let (then_expr, then_type) = self.resolve_expr(then, scope, state)?;
                    if matches!(result_type, DataType::Null) {
                        result_type = then_type;
                    }
                    compiled_whens.push((when_expr, then_expr));
                }
                let else_clause = match else_clause {
                    Some(e) => {
                        let (else_expr, else_type) = self.resolve_expr(e, scope, state)?;
                        if matches!(result_type, DataType::Null) {
                            result_type = else_type;
                        }
                        Some(Box::new(else_expr))
                    }
                    None => None,
                };
                let node = Expression::Case {
                    operand: operand.map(|(e, _)| Box::new(e)),
                    when_clauses: compiled_whens,
                    else_clause,
                };
                Ok((self.fold(node)?, result_type))
            }

            ast::Expression::ArrayLiteral(items) | ast::Expression::TupleLiteral(items) => {
                let mut compiled = Vec::new();
                let mut element_type = DataType::Object;
                for (i, item) in items.iter().enumerate() {
                    let (expr, data_type) = self.resolve_expr(item, scope, state)?;
                    if i == 0 {
                        element_type = data_type;
                    }
                    compiled.push(expr);
                }
                let node = Expression::MakeList(compiled);
                Ok((self.fold(node)?, DataType::List(Box::new(element_type))))
            }

            ast::Expression::Subscript { base, index } => {
                let (base_expr, base_type) = self.resolve_expr(base, scope, state)?;
                let (index_expr, _) = self.resolve_expr(index, scope, state)?;
                let result_type = match base_type {
                    DataType::List(inner) => *inner,
                    _ => DataType::Object,
                };
                let node = Expression::Subscript(Box::new(base_expr), Box::new(index_expr));
                Ok((self.fold(node)?, result_type))
            }

            ast::Expression::Subquery(select) => {
                let plan = self.plan_select(select, Some(scope))?;
                let visible: Vec<_> = plan.targets.iter().filter(|t| !t.hidden).collect();
                if visible.len() != 1 {
                    return Err(Error::CompileError(format!(
                        "scalar subquery returns {} columns, expected 1",
                        visible.len()
                    )));
                }
                let data_type = visible[0].data_type.clone();
                Ok((Expression::ScalarSubquery(Box::new(plan)), data_type))
            }

            ast::Expression::All | ast::Expression::QualifiedAll(_) => Err(Error::CompileError(
                "* is only valid as a SELECT target or inside count(*)".into(),
            )),
        }
    }

    /// Resolves a column reference. Qualified references try the local and
    /// enclosing scopes' tables first, then fall back to interpreting the
    /// qualifier as a column whose type exposes the name as an attribute.
    fn resolve_column(
        &mut self,
        qualifier: Option<&str>,
        name: &str,
        scope: &Scope,
        state: &mut ExprState,
    ) -> Result<(Expression, DataType)> {
        if let Some((index, data_type)) = scope.lookup_local(qualifier, name)? {
            return Ok((Expression::Column(index), data_type));
        }

        // Enclosing scopes, for correlated subqueries.
        let mut level = 0;
        let mut parent = scope.parent;
        while let Some(outer) = parent {
            level += 1;
            if let Some((index, data_type)) = outer.lookup_local(qualifier, name)? {
                self.outer_refs += 1;
                return Ok((Expression::OuterColumn(level, index), data_type));
            }
            parent = outer.parent;
        }

        // `q.name` where q is not a table: attribute access on column q.
        if let Some(base_name) = qualifier {
            let has_qualifier = scope.has_qualifier(base_name)
                || std::iter::successors(scope.parent, |s| s.parent)
                    .any(|s| s.has_qualifier(base_name));
            if !has_qualifier
                && let Ok((base_expr, base_type)) =
                    self.resolve_column(None, base_name, scope, state)
            {
                return self.resolve_attribute(base_expr, &base_type, name);
            }
            return Err(Error::ColumnNotFound(format!("{}.{}", base_name, name)));
        }

        Err(Error::ColumnNotFound(name.to_string()))
    }

    /// Resolves attribute access on a structured value by rewriting to the
    /// function of the same name, e.g. `x.year` to `year(x)`. Dynamic
    /// values fall back to subscript access.
    pub(super) fn resolve_attribute(
        &mut self,
        base: Expression,
        base_type: &DataType,
        field: &str,
    ) -> Result<(Expression, DataType)> {
        if base_type.attribute(field).is_some() {
            let data_type = functions::validate_function(field, &[base_type.clone()])?;
            let node = Expression::Function(field.to_lowercase(), vec![base]);
            return Ok((self.fold(node)?, data_type));
        }
        if matches!(base_type, DataType::Object) {
            let node = Expression::Subscript(
                Box::new(base),
                Box::new(Expression::Constant(Value::string(field))),
            );
            return Ok((node, DataType::Object));
        }
        Err(Error::CompileError(format!(
            "type {} has no attribute {}",
            base_type, field
        )))
    }

    /// Resolves a function or aggregate call.
    fn resolve_function(
        &mut self,
        call: &ast::FunctionCall,
        scope: &Scope,
        state: &mut ExprState,
    ) -> Result<(Expression, DataType)> {
        let Some(function) = functions::get_function(&call.name) else {
            return Err(Error::CompileError(format!(
                "unknown function {}",
                call.name
            )));
        };
        let meta = function.meta();

        if call.over.is_some() {
            if !state.allow_windows {
                return Err(Error::CompileError(format!(
                    "window function {} is not allowed here",
                    call.name
                )));
            }
            if !meta.is_aggregate {
                return Err(Error::CompileError(format!(
                    "{} is not an aggregate and cannot take an OVER clause",
                    call.name
                )));
            }
            return self.resolve_window_call(call, function, scope, state);
        }
        if meta.window_only {
            return Err(Error::CompileError(format!(
                "window function {} requires an OVER clause",
                call.name
            )));
        }

        if meta.is_aggregate {
            if !state.allow_aggregates {
                return Err(Error::CompileError(format!(
                    "aggregate function {} is not allowed here",
                    call.name
                )));
            }
            if state.in_aggregate {
                return Err(Error::CompileError("aggregate calls cannot be nested".into()));
            }

            let star = matches!(call.args.as_slice(), [ast::Expression::All]);
            let mut args = Vec::new();
            let mut arg_types = Vec::new();
            if star {
                arg_types.push(DataType::Asterisk);
            } else {
                state.in_aggregate = true;
                for arg in &call.args {
                    let result = self.resolve_expr(arg, scope, state);
                    if result.is_err() {
                        state.in_aggregate = false;
                    }
                    let (expr, data_type) = result?;
                    args.push(expr);
                    arg_types.push(data_type);
                }
                state.in_aggregate = false;
            }
            let data_type = function.validate(&arg_types)?;

            let filter = match &call.filter {
                Some(predicate) => {
                    state.in_aggregate = true;
                    let result = self.resolve_expr(predicate, scope, state);
                    state.in_aggregate = false;
                    Some(result?.0)
                }
                None => None,
            };

            state.aggregates.push(AggregateCall {
                function: meta.name.to_string(),
                args,
                star,
                distinct: call.distinct,
                filter,
                data_type: data_type.clone(),
            });
            return Ok((
                Expression::AggregateSlot(state.aggregates.len() - 1),
                data_type,
            ));
        }

        if call.distinct {
            return Err(Error::CompileError(format!(
                "DISTINCT is only valid on aggregates, not {}",
                call.name
            )));
        }
        if call.filter.is_some() {
            return Err(Error::CompileError(format!(
                "FILTER is only valid on aggregates, not {}",
                call.name
            )));
        }

        let mut args = Vec::new();
        let mut arg_types = Vec::new();
        for arg in &call.args {
            let (expr, data_type) = self.resolve_expr(arg, scope, state)?;
            args.push(expr);
            arg_types.push(data_type);
        }
        let data_type = function.validate(&arg_types)?;
        let node = Expression::Function(meta.name.to_string(), args);
        Ok((self.fold(node)?, data_type))
    }

    fn resolve_operator(
        &mut self,
        op: &ast::Operator,
        scope: &Scope,
        state: &mut ExprState,
    ) -> Result<(Expression, DataType)> {
        use ast::Operator::*;

        // Binary operators share one lowering path.
        fn binary<'a>(
            op: BinaryOp,
            lhs: &'a ast::Expression,
            rhs: &'a ast::Expression,
        ) -> (BinaryOp, &'a ast::Expression, &'a ast::Expression) {
            (op, lhs, rhs)
        }
        let (kind, lhs, rhs) = match op {
            And(l, r) => binary(BinaryOp::And, l, r),
            Or(l, r) => binary(BinaryOp::Or, l, r),
            Equal(l, r) => binary(BinaryOp::Equal, l, r),
            NotEqual(l, r) => binary(BinaryOp::NotEqual, l, r),
            GreaterThan(l, r) => binary(BinaryOp::GreaterThan, l, r),
            GreaterThanOrEqual(l, r) => binary(BinaryOp::GreaterThanOrEqual, l, r),
            LessThan(l, r) => binary(BinaryOp::LessThan, l, r),
            LessThanOrEqual(l, r) => binary(BinaryOp::LessThanOrEqual, l, r),
            Add(l, r) => binary(BinaryOp::Add, l, r),
            Subtract(l, r) => binary(BinaryOp::Subtract, l, r),
            Multiply(l, r) => binary(BinaryOp::Multiply, l, r),
            Divide(l, r) => binary(BinaryOp::Divide, l, r),
            Remainder(l, r) => binary(BinaryOp::Remainder, l, r),
            Match {
                expr,
                pattern,
                case_insensitive,
                negated,
                swapped,
            } => binary(
                BinaryOp::Match {
                    case_insensitive: *case_insensitive,
                    negated: *negated,
                    swapped: *swapped,
                },
                expr,
                pattern,
            ),

            Not(expr) => {
                let (compiled, _) = self.resolve_expr(expr, scope, state)?;
                let node = Expression::Unary(UnaryOp::Not, Box::new(compiled));
                return Ok((self.fold(node)?, DataType::Boolean));
            }
            Negate(expr) => {
                let (compiled, data_type) = self.resolve_expr(expr, scope, state)?;
                let result_type = operators::validate_unary(UnaryOp::Negate, &data_type)?;
                let node = Expression::Unary(UnaryOp::Negate, Box::new(compiled));
                return Ok((self.fold(node)?, result_type));
            }
            Identity(expr) => {
                let (compiled, data_type) = self.resolve_expr(expr, scope, state)?;
                let result_type = operators::validate_unary(UnaryOp::Identity, &data_type)?;
                let node = Expression::Unary(UnaryOp::Identity, Box::new(compiled));
                return Ok((self.fold(node)?, result_type));
            }
            IsNull { expr, negated } => {
                let (compiled, _) = self.resolve_expr(expr, scope, state)?;
                let node = Expression::IsNull(Box::new(compiled), *negated);
                return Ok((self.fold(node)?, DataType::Boolean));
            }

            In {
                expr,
                list,
                negated,
            } => {
                let (compiled, _) = self.resolve_expr(expr, scope, state)?;
                // Subquery list: a single-column subquery used as the
                // membership collection.
                if let ast::Expression::Subquery(select) = list.as_ref() {
                    let plan = self.plan_select(select, Some(scope))?;
                    let visible = plan.targets.iter().filter(|t| !t.hidden).count();
                    if visible != 1 {
                        return Err(Error::CompileError(format!(
                            "IN subquery returns {} columns, expected 1",
                            visible
                        )));
                    }
                    return Ok((
                        Expression::InSubquery {
                            expr: Box::new(compiled),
                            query: Box::new(plan),
                            negated: *negated,
                        },
                        DataType::Boolean,
                    ));
                }
                let items = match list.as_ref() {
                    ast::Expression::TupleLiteral(items) | ast::Expression::ArrayLiteral(items) => {
                        items
                            .iter()
                            .map(|item| Ok(self.resolve_expr(item, scope, state)?.0))
                            .collect::<Result<Vec<_>>>()?
                    }
                    other => vec![self.resolve_expr(other, scope, state)?.0],
                };
                let node = Expression::In {
                    expr: Box::new(compiled),
                    list: items,
                    negated: *negated,
                };
                return Ok((self.fold(node)?, DataType::Boolean));
            }

            Between {
                expr,
                low,
                high,
                negated,
            } => {
                let (compiled, _) = self.resolve_expr(expr, scope, state)?;
                let (low, _) = self.resolve_expr(low, scope, state)?;
                let (high, _) = self.resolve_expr(high, scope, state)?;
                let node = Expression::Between {
                    expr: Box::new(compiled),
                    low: Box::new(low),
                    high: Box::new(high),
                    negated: *negated,
                };
                return Ok((self.fold(node)?, DataType::Boolean));
            }
        };

        let (left, left_type) = self.resolve_expr(lhs, scope, state)?;
        let (right, right_type) = self.resolve_expr(rhs, scope, state)?;
        let result_type = operators::validate_binary(kind, &left_type, &right_type)?;
        let node = Expression::Binary(kind, Box::new(left), Box::new(right));
        Ok((self.fold(node)?, result_type))
    }

    /// Folds an all-constant pure expression down to its value. Division by
    /// zero folds to NULL like any evaluation; genuine failures surface as
    /// compile errors.
    pub(super) fn fold(&self, expr: Expression) -> Result<Expression> {
        if !expr.is_constant() || contains_impure(&expr) {
            return Ok(expr);
        }
        let ctx = EvalContext::constant(self.catalog);
        let value = crate::execution::expression::evaluate(&expr, None, &ctx)?;
        Ok(Expression::Constant(value))
    }
}

/// Functions whose results change between calls; never folded.
fn contains_impure(expr: &Expression) -> bool {
    match expr {
        Expression::Function(name, args) => {
            matches!(name.as_str(), "now" | "today") || args.iter().any(contains_impure)
        }
        Expression::Binary(_, lhs, rhs) => contains_impure(lhs) || contains_impure(rhs),
        Expression::Unary(_, e) | Expression::IsNull(e, _) => contains_impure(e),
        Expression::In { expr, list, .. } => {
            contains_impure(expr) || list.iter().any(contains_impure)
        }
        Expression::Between {
            expr, low, high, ..
        } => contains_impure(expr) || contains_impure(low) || contains_impure(high),
        Expression::Case {
            operand,
            when_clauses,
            else_clause,
        } => {
            operand.as_deref().is_some_and(contains_impure)
                || when_clauses
                    .iter()
                    .any(|(w, t)| contains_impure(w) || contains_impure(t))
                || else_clause.as_deref().is_some_and(contains_impure)
        }
        Expression::MakeList(items) => items.iter().any(contains_impure),
        Expression::Subscript(base, index) => contains_impure(base) || contains_impure(index),
        _ => false,
    }
}

fn canonical_cast_name(target: &DataType) -> &'static str {
    match target {
        DataType::Integer => "integer",
        DataType::Decimal => "numeric",
        DataType::Boolean => "boolean",
        DataType::Str => "string",
        DataType::DateTime => "datetime",
        DataType::Interval => "interval",
        _ => "number",
    }
}

pub(super) fn literal_value(literal: &ast::Literal) -> Value {
    match literal {
        ast::Literal::Null => Value::Null,
        ast::Literal::Boolean(b) => Value::Boolean(*b),
        ast::Literal::Integer(n) => Value::Integer(*n),
        ast::Literal::Float(n) => Value::real(*n),
        ast::Literal::String(s) => Value::Str(s.clone()),
    }
}
