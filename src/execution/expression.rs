//! Typed-expression evaluation
//!
//! Evaluates compiled expressions against a row. Three-valued logic
//! throughout: evaluation-time type mismatches, invalid comparisons and
//! division by zero yield NULL, never errors.

use super::select;
use crate::catalog::Context;
use crate::error::{Error, Result};
use crate::operators::{self, BinaryOp, compare_values};
use crate::planning::{Expression, QueryPlan};
use crate::types::{Row, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Evaluation context threaded through a plan's execution: the catalog,
/// the scope stack of enclosing rows for correlated subqueries, the slot
/// values of the current group/window stage, and the uncorrelated-subquery
/// result cache shared across the whole execution.
pub struct EvalContext<'a> {
    pub catalog: &'a Context,
    /// Enclosing query rows, nearest last. `OuterColumn(1, i)` reads the
    /// last entry.
    outers: Vec<Row>,
    /// Finalized aggregate values of the current group, by handle.
    pub aggregate_slots: Vec<Value>,
    /// Window values of the current row, by handle.
    pub window_slots: Vec<Value>,
    /// Materialized results of uncorrelated subqueries, keyed by plan
    /// identity, cached for the duration of the enclosing execution.
    cache: Rc<RefCell<HashMap<usize, Rc<Vec<Row>>>>>,
}

impl<'a> EvalContext<'a> {
    pub fn new(catalog: &'a Context) -> Self {
        EvalContext {
            catalog,
            outers: Vec::new(),
            aggregate_slots: Vec::new(),
            window_slots: Vec::new(),
            cache: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// A context for constant folding: no rows, no slots.
    pub fn constant(catalog: &'a Context) -> Self {
        Self::new(catalog)
    }

    /// A child context for executing a nested query: same catalog, same
    /// outer stack and cache, fresh slots.
    pub fn child(&self) -> EvalContext<'a> {
        EvalContext {
            catalog: self.catalog,
            outers: self.outers.clone(),
            aggregate_slots: Vec::new(),
            window_slots: Vec::new(),
            cache: self.cache.clone(),
        }
    }

    /// A child context with the given row pushed as the nearest enclosing
    /// scope (correlated subquery execution).
    pub fn with_outer(&self, row: Row) -> EvalContext<'a> {
        let mut child = self.child();
        child.outers.push(row);
        child
    }

    /// A context sharing everything but carrying the given slot values.
    pub fn with_slots(&self, aggregate_slots: Vec<Value>, window_slots: Vec<Value>) -> Self {
        EvalContext {
            catalog: self.catalog,
            outers: self.outers.clone(),
            aggregate_slots,
            window_slots,
            cache: self.cache.clone(),
        }
    }

    fn outer(&self, level: usize, index: usize) -> Result<Value> {
        let row = self
            .outers
            .len()
            .checked_sub(level)
            .and_then(|i| self.outers.get(i))
            .ok_or_else(|| Error::Internal(format!("no outer scope at level {}", level)))?;
        row.get(index)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("outer column {} out of range", index)))
    }
}

/// Evaluates an expression against an optional row.
pub fn evaluate(expr: &Expression, row: Option<&Row>, ctx: &EvalContext) -> Result<Value> {
    match expr {
        Expression::Constant(value) => Ok(value.clone()),

        Expression::Column(index) => {
            let row = row.ok_or_else(|| {
                Error::Internal(format!("no row for column reference #{}", index))
            })?;
            // Representative rows of empty groups are all-null.
            Ok(row.get(*index).cloned().unwrap_or(Value::Null))
        }

        Expression::OuterColumn(level, index) => ctx.outer(*level, *index),

        Expression::Binary(op, lhs, rhs) => {
            // AND/OR short-circuit on a decisive left operand.
            if matches!(op, BinaryOp::And | BinaryOp::Or) {
                let left = evaluate(lhs, row, ctx)?;
                match (op, left.to_bool_opt()) {
                    (BinaryOp::And, Some(false)) => return Ok(Value::Boolean(false)),
                    (BinaryOp::Or, Some(true)) => return Ok(Value::Boolean(true)),
                    _ => {}
                }
                let right = evaluate(rhs, row, ctx)?;
                return operators::execute_binary(*op, &left, &right);
            }
            let left = evaluate(lhs, row, ctx)?;
            let right = evaluate(rhs, row, ctx)?;
            operators::execute_binary(*op, &left, &right)
        }

        Expression::Unary(op, operand) => {
            let value = evaluate(operand, row, ctx)?;
            operators::execute_unary(*op, &value)
        }

        Expression::IsNull(operand, negated) => {
            let value = evaluate(operand, row, ctx)?;
            Ok(Value::Boolean(value.is_null() != *negated))
        }

        Expression::In {
            expr,
            list,
            negated,
        } => {
            let needle = evaluate(expr, row, ctx)?;
            if needle.is_null() {
                return Ok(Value::Null);
            }
            let mut haystack = Vec::new();
            for item in list {
                haystack.push(evaluate(item, row, ctx)?);
            }
            // A single list-valued operand is the collection itself.
            if let [Value::List(items) | Value::Set(items)] = haystack.as_slice() {
                haystack = items.clone();
            }
            Ok(membership(&needle, &haystack, *negated))
        }

        Expression::InSubquery {
            expr,
            query,
            negated,
        } => {
            let needle = evaluate(expr, row, ctx)?;
            if needle.is_null() {
                return Ok(Value::Null);
            }
            let rows = execute_subquery(query, row, ctx)?;
            let haystack: Vec<Value> = rows
                .iter()
                .map(|r| r.first().cloned().unwrap_or(Value::Null))
                .collect();
            Ok(membership(&needle, &haystack, *negated))
        }

        Expression::Between {
            expr,
            low,
            high,
            negated,
        } => {
            let value = evaluate(expr, row, ctx)?;
            let low = evaluate(low, row, ctx)?;
            let high = evaluate(high, row, ctx)?;
            if value.is_null() || low.is_null() || high.is_null() {
                return Ok(Value::Null);
            }
            let inside = match (compare_values(&value, &low), compare_values(&value, &high)) {
                (Some(a), Some(b)) => {
                    Some(a != std::cmp::Ordering::Less && b != std::cmp::Ordering::Greater)
                }
                _ => None,
            };
            Ok(match inside {
                Some(inside) => Value::Boolean(inside != *negated),
                None => Value::Null,
            })
        }

        Expression::Function(name, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, row, ctx)?);
            }
            crate::functions::execute_function(name, &values)
        }

        Expression::Case {
            operand,
            when_clauses,
            else_clause,
        } => {
            let operand = operand
                .as_ref()
                .map(|e| evaluate(e, row, ctx))
                .transpose()?;
            for (when, then) in when_clauses {
                let condition = evaluate(when, row, ctx)?;
                let matched = match &operand {
                    // Simple CASE compares the operand to each WHEN value.
                    Some(operand) => !operand.is_null() && operand == &condition,
                    None => condition.to_bool_opt().unwrap_or(false),
                };
                if matched {
                    return evaluate(then, row, ctx);
                }
            }
            match else_clause {
                Some(else_expr) => evaluate(else_expr, row, ctx),
                None => Ok(Value::Null),
            }
        }

        Expression::MakeList(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(evaluate(item, row, ctx)?);
            }
            Ok(Value::List(values))
        }

        Expression::Subscript(base, index) => {
            let base = evaluate(base, row, ctx)?;
            let index = evaluate(index, row, ctx)?;
            Ok(match (&base, &index) {
                (Value::List(items) | Value::Set(items), Value::Integer(i)) => {
                    if *i >= 0 {
                        items.get(*i as usize).cloned().unwrap_or(Value::Null)
                    } else {
                        Value::Null
                    }
                }
                _ => Value::Null,
            })
        }

        Expression::ScalarSubquery(query) => {
            let rows = execute_subquery(query, row, ctx)?;
            match rows.len() {
                0 => Ok(Value::Null),
                1 => Ok(rows[0].first().cloned().unwrap_or(Value::Null)),
                n => Err(Error::ExecutionError(format!(
                    "scalar subquery returned {} rows",
                    n
                ))),
            }
        }

        Expression::AggregateSlot(handle) => ctx
            .aggregate_slots
            .get(*handle)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("aggregate slot {} not populated", handle))),

        Expression::WindowSlot(handle) => ctx
            .window_slots
            .get(*handle)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("window slot {} not populated", handle))),
    }
}

/// SQL IN semantics: TRUE on a match, NULL when no match but a NULL was in
/// the collection, FALSE otherwise; NOT IN is the Kleene negation.
fn membership(needle: &Value, haystack: &[Value], negated: bool) -> Value {
    let mut saw_null = false;
    for candidate in haystack {
        if candidate.is_null() {
            saw_null = true;
        } else if candidate == needle {
            return Value::Boolean(!negated);
        }
    }
    if saw_null {
        Value::Null
    } else {
        Value::Boolean(negated)
    }
}

/// Executes a nested query, caching uncorrelated results for the duration
/// of the enclosing execution.
pub fn execute_subquery(
    query: &QueryPlan,
    row: Option<&Row>,
    ctx: &EvalContext,
) -> Result<Rc<Vec<Row>>> {
    let key = query as *const QueryPlan as usize;
    if !query.correlated
        && let Some(cached) = ctx.cache.borrow().get(&key)
    {
        return Ok(cached.clone());
    }

    let child = match row {
        Some(row) if query.correlated => ctx.with_outer(row.clone()),
        _ => ctx.child(),
    };
    let (_, rows) = select::execute_query(query, &child)?;
    let rows = Rc::new(rows);
    if !query.correlated {
        ctx.cache.borrow_mut().insert(key, rows.clone());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_null_semantics() {
        let haystack = [Value::Integer(1), Value::Null];
        assert_eq!(
            membership(&Value::Integer(1), &haystack, false),
            Value::Boolean(true)
        );
        assert_eq!(membership(&Value::Integer(2), &haystack, false), Value::Null);
        assert_eq!(membership(&Value::Integer(2), &haystack, true), Value::Null);
        assert_eq!(
            membership(&Value::Integer(2), &[Value::Integer(1)], true),
            Value::Boolean(true)
        );
    }
}
