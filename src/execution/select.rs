//! Query execution pipeline
//!
//! scan -> filter -> group/aggregate -> window -> order -> pivot ->
//! distinct -> limit -> project. Hidden targets participate throughout and
//! are stripped at projection time.

use super::aggregate::{self, Intermediate};
use super::expression::{EvalContext, evaluate};
use super::{join, pivot, window};
use crate::error::{Error, Result};
use crate::parsing::ast::{Direction, NullOrder, SetOperator};
use crate::planning::{OrderKey, QueryPlan, Source};
use crate::types::{DataType, Row};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Executes a query plan, returning the visible column schema and rows.
pub fn execute_query(
    plan: &QueryPlan,
    ctx: &EvalContext,
) -> Result<(Vec<(String, DataType)>, Vec<Row>)> {
    let input = source_rows(&plan.source, ctx)?;

    // Filter: a row is kept iff the predicate is truthy (NULL drops).
    let mut filtered = Vec::with_capacity(input.len());
    for row in input {
        let keep = match &plan.filter {
            Some(predicate) => evaluate(predicate, Some(&row), ctx)?
                .to_bool_opt()
                .unwrap_or(false),
            None => true,
        };
        if keep {
            filtered.push(row);
        }
    }

    // Group, or pass rows through as their own intermediates.
    let mut intermediates = if plan.grouped {
        aggregate::run(plan, filtered, ctx)?
    } else {
        filtered
            .into_iter()
            .map(|row| Intermediate {
                row,
                slots: Vec::new(),
            })
            .collect()
    };

    if let Some(having) = plan.having {
        let target = &plan.targets[having];
        let mut kept = Vec::with_capacity(intermediates.len());
        for intermediate in intermediates {
            let row_ctx = ctx.with_slots(intermediate.slots.clone(), Vec::new());
            let keep = evaluate(&target.expr, Some(&intermediate.row), &row_ctx)?
                .to_bool_opt()
                .unwrap_or(false);
            if keep {
                kept.push(intermediate);
            }
        }
        intermediates = kept;
    }

    // Window values per intermediate row, by handle.
    let window_slots = if plan.windows.is_empty() {
        vec![Vec::new(); intermediates.len()]
    } else {
        window::compute(plan, &intermediates, ctx)?
    };

    // Materialize all targets (hidden included) into full rows.
    let mut full_rows = Vec::with_capacity(intermediates.len());
    for (intermediate, slots) in intermediates.into_iter().zip(window_slots) {
        let row_ctx = ctx.with_slots(intermediate.slots, slots);
        let mut out = Vec::with_capacity(plan.targets.len());
        for target in &plan.targets {
            out.push(evaluate(&target.expr, Some(&intermediate.row), &row_ctx)?);
        }
        full_rows.push(out);
    }

    let visible: Vec<usize> = plan
        .targets
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.hidden)
        .map(|(i, _)| i)
        .collect();
    let columns: Vec<(String, DataType)> = visible
        .iter()
        .map(|&i| (plan.targets[i].name.clone(), plan.targets[i].data_type.clone()))
        .collect();

    // Set operations work over the visible projection; ORDER BY must then
    // reference visible targets only.
    if !plan.compound.is_empty() {
        let mut rows: Vec<Row> = full_rows
            .into_iter()
            .map(|row| project(row, &visible))
            .collect();
        for (op, rhs) in &plan.compound {
            let (_, rhs_rows) = execute_query(rhs, &ctx.child())?;
            rows = set_op(rows, rhs_rows, *op);
        }
        let keys = map_keys_to_visible(&plan.order_by, &visible)?;
        sort_rows(&mut rows, &keys);
        if plan.distinct {
            rows = dedupe(rows);
        }
        if let Some(limit) = plan.limit {
            rows.truncate(limit);
        }
        return Ok((columns, rows));
    }

    sort_rows(&mut full_rows, &plan.order_by);

    if plan.pivot.is_some() {
        let (columns, mut rows) = pivot::transform(plan, full_rows)?;
        if plan.distinct {
            rows = dedupe(rows);
        }
        if let Some(limit) = plan.limit {
            rows.truncate(limit);
        }
        return Ok((columns, rows));
    }

    // DISTINCT and LIMIT run on the full rows, before hidden targets are
    // stripped.
    if plan.distinct {
        full_rows = dedupe(full_rows);
    }
    if let Some(limit) = plan.limit {
        full_rows.truncate(limit);
    }
    let rows = full_rows
        .into_iter()
        .map(|row| project(row, &visible))
        .collect();
    Ok((columns, rows))
}

/// Produces the input rows of a source, in its flattened layout. Table
/// scans snapshot row order at scan time.
fn source_rows(source: &Source, ctx: &EvalContext) -> Result<Vec<Row>> {
    match source {
        // No FROM: the single empty row (scalar SELECT semantics).
        Source::Nothing => Ok(vec![Vec::new()]),

        Source::Scan { table, .. } => {
            let table = ctx
                .catalog
                .table(table)
                .ok_or_else(|| Error::TableNotFound(table.clone()))?;
            Ok(table.rows.clone())
        }

        Source::Subquery { plan, .. } => {
            let (_, rows) = execute_query(plan, &ctx.child())?;
            Ok(rows)
        }

        Source::Join {
            left,
            right,
            join_type,
            predicate,
            equi,
        } => {
            let left_width = left.columns().len();
            let right_width = right.columns().len();
            let left_rows = source_rows(left, ctx)?;
            let right_rows = source_rows(right, ctx)?;
            join::execute(
                left_rows,
                right_rows,
                left_width,
                right_width,
                *join_type,
                predicate.as_ref(),
                equi.as_ref(),
                ctx,
            )
        }
    }
}

fn project(row: Row, visible: &[usize]) -> Row {
    visible.iter().map(|&i| row[i].clone()).collect()
}

fn map_keys_to_visible(keys: &[OrderKey], visible: &[usize]) -> Result<Vec<OrderKey>> {
    keys.iter()
        .map(|key| {
            visible
                .iter()
                .position(|&i| i == key.target)
                .map(|position| OrderKey {
                    target: position,
                    direction: key.direction,
                    nulls: key.nulls,
                })
                .ok_or_else(|| {
                    Error::ExecutionError(
                        "ORDER BY expression must appear in the select list for set operations"
                            .into(),
                    )
                })
        })
        .collect()
}

/// Multi-key stable sort with per-key direction and NULLS placement.
/// Without an explicit placement, NULLs sort first ascending and last
/// descending (the Value total order).
pub fn sort_rows(rows: &mut [Row], keys: &[OrderKey]) {
    if keys.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for key in keys {
            let (va, vb) = (&a[key.target], &b[key.target]);
            let ordering = match (va.is_null(), vb.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => null_position(key, true),
                (false, true) => null_position(key, false),
                (false, false) => {
                    let ordering = va.cmp(vb);
                    match key.direction {
                        Direction::Ascending => ordering,
                        Direction::Descending => ordering.reverse(),
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn null_position(key: &OrderKey, left_is_null: bool) -> Ordering {
    let nulls_first = match key.nulls {
        Some(NullOrder::First) => true,
        Some(NullOrder::Last) => false,
        None => key.direction == Direction::Ascending,
    };
    match (nulls_first, left_is_null) {
        (true, true) | (false, false) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

/// Dedupes rows by semantic value equality, preserving first-seen order.
fn dedupe(rows: Vec<Row>) -> Vec<Row> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.clone()))
        .collect()
}

fn set_op(left: Vec<Row>, right: Vec<Row>, op: SetOperator) -> Vec<Row> {
    match op {
        SetOperator::UnionAll => {
            let mut rows = left;
            rows.extend(right);
            rows
        }
        SetOperator::Union => {
            let mut rows = left;
            rows.extend(right);
            dedupe(rows)
        }
        SetOperator::Intersect => {
            let right: HashSet<Row> = right.into_iter().collect();
            dedupe(
                left.into_iter()
                    .filter(|row| right.contains(row))
                    .collect(),
            )
        }
        SetOperator::IntersectAll => {
            let mut counts = row_counts(right);
            left.into_iter()
                .filter(|row| {
                    counts
                        .get_mut(row)
                        .map(|count| {
                            if *count > 0 {
                                *count -= 1;
                                true
                            } else {
                                false
                            }
                        })
                        .unwrap_or(false)
                })
                .collect()
        }
        SetOperator::Except => {
            let right: HashSet<Row> = right.into_iter().collect();
            dedupe(
                left.into_iter()
                    .filter(|row| !right.contains(row))
                    .collect(),
            )
        }
        SetOperator::ExceptAll => {
            let mut counts = row_counts(right);
            left.into_iter()
                .filter(|row| {
                    counts
                        .get_mut(row)
                        .map(|count| {
                            if *count > 0 {
                                *count -= 1;
                                false
                            } else {
                                true
                            }
                        })
                        .unwrap_or(true)
                })
                .collect()
        }
    }
}

fn row_counts(rows: Vec<Row>) -> HashMap<Row, usize> {
    let mut counts = HashMap::new();
    for row in rows {
        *counts.entry(row).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn row(values: &[i64]) -> Row {
        values.iter().map(|&v| Value::Integer(v)).collect()
    }

    #[test]
    fn test_sort_rows_directions() {
        let mut rows = vec![row(&[2]), row(&[1]), row(&[3])];
        sort_rows(
            &mut rows,
            &[OrderKey {
                target: 0,
                direction: Direction::Descending,
                nulls: None,
            }],
        );
        assert_eq!(rows, vec![row(&[3]), row(&[2]), row(&[1])]);
    }

    #[test]
    fn test_sort_rows_nulls_last() {
        let mut rows = vec![vec![Value::Null], row(&[1])];
        sort_rows(
            &mut rows,
            &[OrderKey {
                target: 0,
                direction: Direction::Ascending,
                nulls: Some(NullOrder::Last),
            }],
        );
        assert_eq!(rows, vec![row(&[1]), vec![Value::Null]]);
    }

    #[test]
    fn test_set_ops() {
        let left = vec![row(&[1]), row(&[1]), row(&[2])];
        let right = vec![row(&[1]), row(&[3])];
        assert_eq!(
            set_op(left.clone(), right.clone(), SetOperator::Union),
            vec![row(&[1]), row(&[2]), row(&[3])]
        );
        assert_eq!(
            set_op(left.clone(), right.clone(), SetOperator::Intersect),
            vec![row(&[1])]
        );
        assert_eq!(
            set_op(left.clone(), right.clone(), SetOperator::Except),
            vec![row(&[2])]
        );
        assert_eq!(
            set_op(left, right, SetOperator::ExceptAll),
            vec![row(&[1]), row(&[2])]
        );
    }
}
