//! Join execution
//!
//! Two strategies: a hash join keyed on the tuple of equi-join column
//! values when the planner found a clean conjunction of cross-side
//! equalities, and a nested-loop join evaluating the full ON predicate per
//! pair otherwise. Both share the outer-join bookkeeping: unmatched left
//! rows pad with NULLs for LEFT/FULL (and carry ANTI), matched right
//! indices are tracked so RIGHT/FULL can emit the leftovers.

use super::expression::{EvalContext, evaluate};
use crate::error::Result;
use crate::parsing::ast::JoinType;
use crate::planning::{EquiJoin, Expression};
use crate::types::{Row, Value};
use std::collections::{HashMap, HashSet};

#[allow(clippy::too_many_arguments)]
pub fn execute(
    left: Vec<Row>,
    right: Vec<Row>,
    left_width: usize,
    right_width: usize,
    join_type: JoinType,
    predicate: Option<&Expression>,
    equi: Option<&EquiJoin>,
    ctx: &EvalContext,
) -> Result<Vec<Row>> {
    match equi {
        Some(equi) => hash_join(left, right, left_width, right_width, join_type, equi, ctx),
        None => nested_loop_join(
            left,
            right,
            left_width,
            right_width,
            join_type,
            predicate,
            ctx,
        ),
    }
}

/// Builds a hash map over the right side keyed by the join-key tuple, then
/// probes it per left row. Keys containing NULL never match.
fn hash_join(
    left: Vec<Row>,
    right: Vec<Row>,
    left_width: usize,
    right_width: usize,
    join_type: JoinType,
    equi: &EquiJoin,
    ctx: &EvalContext,
) -> Result<Vec<Row>> {
    let mut table: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
    for (index, row) in right.iter().enumerate() {
        let key = key_of(&equi.right_keys, row, ctx)?;
        if key.iter().any(Value::is_null) {
            continue;
        }
        table.entry(key).or_default().push(index);
    }

    let mut output = Vec::new();
    let mut matched_right: HashSet<usize> = HashSet::new();

    for left_row in &left {
        let key = key_of(&equi.left_keys, left_row, ctx)?;
        let matches = if key.iter().any(Value::is_null) {
            None
        } else {
            table.get(&key)
        };

        match matches {
            Some(indices) if !indices.is_empty() => {
                if join_type == JoinType::Anti {
                    continue;
                }
                for &index in indices {
                    matched_right.insert(index);
                    output.push(combine(left_row, &right[index]));
                }
            }
            _ => {
                if matches!(join_type, JoinType::Left | JoinType::Full | JoinType::Anti) {
                    output.push(pad_right(left_row, right_width));
                }
            }
        }
    }

    if matches!(join_type, JoinType::Right | JoinType::Full) {
        for (index, right_row) in right.iter().enumerate() {
            if !matched_right.contains(&index) {
                output.push(pad_left(right_row, left_width));
            }
        }
    }

    Ok(output)
}

/// For every left row, scans the right side and evaluates the predicate on
/// the combined row. A missing predicate is a Cartesian product.
fn nested_loop_join(
    left: Vec<Row>,
    right: Vec<Row>,
    left_width: usize,
    right_width: usize,
    join_type: JoinType,
    predicate: Option<&Expression>,
    ctx: &EvalContext,
) -> Result<Vec<Row>> {
    let mut output = Vec::new();
    let mut matched_right: HashSet<usize> = HashSet::new();

    for left_row in &left {
        let mut left_matched = false;
        for (index, right_row) in right.iter().enumerate() {
            let combined = combine(left_row, right_row);
            let matches = match predicate {
                Some(predicate) => evaluate(predicate, Some(&combined), ctx)?
                    .to_bool_opt()
                    .unwrap_or(false),
                None => true,
            };
            if matches {
                left_matched = true;
                matched_right.insert(index);
                if join_type != JoinType::Anti {
                    output.push(combined);
                }
            }
        }
        if !left_matched
            && matches!(join_type, JoinType::Left | JoinType::Full | JoinType::Anti)
        {
            output.push(pad_right(left_row, right_width));
        }
    }

    if matches!(join_type, JoinType::Right | JoinType::Full) {
        for (index, right_row) in right.iter().enumerate() {
            if !matched_right.contains(&index) {
                output.push(pad_left(right_row, left_width));
            }
        }
    }

    Ok(output)
}

fn key_of(keys: &[Expression], row: &Row, ctx: &EvalContext) -> Result<Vec<Value>> {
    keys.iter().map(|key| evaluate(key, Some(row), ctx)).collect()
}

fn combine(left: &Row, right: &Row) -> Row {
    let mut row = left.clone();
    row.extend(right.iter().cloned());
    row
}

fn pad_right(left: &Row, right_width: usize) -> Row {
    let mut row = left.clone();
    row.extend(std::iter::repeat_n(Value::Null, right_width));
    row
}

fn pad_left(right: &Row, left_width: usize) -> Row {
    let mut row = vec![Value::Null; left_width];
    row.extend(right.iter().cloned());
    row
}
