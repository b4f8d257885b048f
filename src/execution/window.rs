//! Window execution
//!
//! Runs after grouping, before ordering. For each window call: bucket the
//! intermediate rows into partitions, sort each partition by the window's
//! ORDER BY, compute the frame slice per row (ROWS/GROUPS/RANGE plus
//! EXCLUDE), and either run a fresh aggregate accumulator over the frame or
//! evaluate the ranking/offset function directly. Results land in a per-row
//! slot vector keyed by the window's handle.

use super::aggregate::{self, Intermediate};
use super::expression::{EvalContext, evaluate};
use crate::error::Result;
use crate::operators::{BinaryOp, compare_values, execute_binary};
use crate::parsing::ast::{Direction, FrameExclude, FrameUnits, NullOrder};
use crate::planning::{Bound, QueryPlan, WindowCall};
use crate::types::{Row, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Computes the window slot matrix: one value per (intermediate row,
/// window handle).
pub fn compute(
    plan: &QueryPlan,
    intermediates: &[Intermediate],
    ctx: &EvalContext,
) -> Result<Vec<Vec<Value>>> {
    let count = intermediates.len();
    let mut slots = vec![vec![Value::Null; plan.windows.len()]; count];

    // All window pieces are target indices; materialize the target values
    // each window needs, per row.
    let target_value = |target: usize, index: usize| -> Result<Value> {
        let intermediate = &intermediates[index];
        let row_ctx = ctx.with_slots(intermediate.slots.clone(), Vec::new());
        evaluate(
            &plan.targets[target].expr,
            Some(&intermediate.row),
            &row_ctx,
        )
    };

    for (handle, call) in plan.windows.iter().enumerate() {
        let mut partition_keys: Vec<Row> = Vec::with_capacity(count);
        let mut order_keys: Vec<Row> = Vec::with_capacity(count);
        let mut args: Vec<Row> = Vec::with_capacity(count);
        let mut accepted: Vec<bool> = Vec::with_capacity(count);
        for index in 0..count {
            partition_keys.push(
                call.partition_by
                    .iter()
                    .map(|&t| target_value(t, index))
                    .collect::<Result<_>>()?,
            );
            order_keys.push(
                call.order_by
                    .iter()
                    .map(|&(t, _, _)| target_value(t, index))
                    .collect::<Result<_>>()?,
            );
            args.push(
                call.args
                    .iter()
                    .map(|&t| target_value(t, index))
                    .collect::<Result<_>>()?,
            );
            accepted.push(match call.filter {
                Some(filter) => target_value(filter, index)?
                    .to_bool_opt()
                    .unwrap_or(false),
                None => true,
            });
        }

        // Partitions, in encounter order.
        let mut partitions: Vec<Vec<usize>> = Vec::new();
        let mut partition_of: HashMap<Row, usize> = HashMap::new();
        for index in 0..count {
            let key = partition_keys[index].clone();
            match partition_of.get(&key) {
                Some(&p) => partitions[p].push(index),
                None => {
                    partition_of.insert(key, partitions.len());
                    partitions.push(vec![index]);
                }
            }
        }

        for mut partition in partitions {
            partition.sort_by(|&a, &b| compare_order(&order_keys[a], &order_keys[b], &call.order_by));

            for position in 0..partition.len() {
                let row_index = partition[position];
                let frame = frame_slice(call, &partition, position, &order_keys)?;
                let frame = apply_exclude(
                    call.frame.exclude,
                    frame,
                    &partition,
                    position,
                    &order_keys,
                );

                let value = match call.function.as_str() {
                    "row_number" => Value::Integer(position as i64 + 1),
                    "rank" => {
                        let first_peer = partition
                            .iter()
                            .position(|&other| {
                                peer(&order_keys[other], &order_keys[row_index])
                            })
                            .unwrap_or(position);
                        Value::Integer(first_peer as i64 + 1)
                    }
                    "dense_rank" => {
                        let mut distinct = 0;
                        for window in partition[..position + 1].windows(2) {
                            if !peer(&order_keys[window[0]], &order_keys[window[1]]) {
                                distinct += 1;
                            }
                        }
                        Value::Integer(distinct + 1)
                    }
                    "lead" | "lag" => {
                        let offset = args[row_index]
                            .get(1)
                            .and_then(|v| v.as_f64())
                            .unwrap_or(1.0) as i64;
                        let offset = if call.function == "lead" { offset } else { -offset };
                        let target = position as i64 + offset;
                        if target >= 0 && (target as usize) < partition.len() {
                            args[partition[target as usize]]
                                .first()
                                .cloned()
                                .unwrap_or(Value::Null)
                        } else {
                            args[row_index].get(2).cloned().unwrap_or(Value::Null)
                        }
                    }
                    "first_value" => frame
                        .first()
                        .and_then(|&i| args[i].first().cloned())
                        .unwrap_or(Value::Null),
                    "last_value" => frame
                        .last()
                        .and_then(|&i| args[i].first().cloned())
                        .unwrap_or(Value::Null),
                    "nth_value" => {
                        let n = args[row_index]
                            .get(1)
                            .and_then(|v| v.as_f64())
                            .unwrap_or(0.0) as i64;
                        if n >= 1 {
                            frame
                                .get(n as usize - 1)
                                .and_then(|&i| args[i].first().cloned())
                                .unwrap_or(Value::Null)
                        } else {
                            Value::Null
                        }
                    }
                    function => {
                        let mut accumulator = aggregate::window_accumulator(
                            function,
                            call.distinct,
                            &call.data_type,
                        );
                        for &index in &frame {
                            if !accepted[index] {
                                continue;
                            }
                            if call.star {
                                accumulator.update(&[])?;
                            } else {
                                accumulator.update(&args[index])?;
                            }
                        }
                        accumulator.finalize()?
                    }
                };
                slots[row_index][handle] = value;
            }
        }
    }

    Ok(slots)
}

/// Orders rows by the window's ORDER BY key tuples.
fn compare_order(
    a: &[Value],
    b: &[Value],
    keys: &[(usize, Direction, Option<NullOrder>)],
) -> Ordering {
    for (index, (_, direction, nulls)) in keys.iter().enumerate() {
        let (va, vb) = (&a[index], &b[index]);
        let ordering = match (va.is_null(), vb.is_null()) {
            (true, true) => Ordering::Equal,
            (false, false) => match direction {
                Direction::Ascending => va.cmp(vb),
                Direction::Descending => va.cmp(vb).reverse(),
            },
            (a_null, _) => {
                let nulls_first = match nulls {
                    Some(NullOrder::First) => true,
                    Some(NullOrder::Last) => false,
                    None => *direction == Direction::Ascending,
                };
                if nulls_first == a_null {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Whether two rows are in the same ORDER BY equivalence class. With no
/// ORDER BY every row is a peer of every other.
fn peer(a: &[Value], b: &[Value]) -> bool {
    a == b
}

/// The frame slice for the row at `position` of the sorted partition, as
/// partition-relative indices resolved to row indices, before EXCLUDE.
fn frame_slice(
    call: &WindowCall,
    partition: &[usize],
    position: usize,
    order_keys: &[Row],
) -> Result<Vec<usize>> {
    let len = partition.len();
    let frame = &call.frame;

    match frame.units {
        FrameUnits::Rows => {
            let start = match &frame.start {
                Bound::UnboundedPreceding => 0,
                Bound::Preceding(offset) => position.saturating_sub(offset_of(offset)),
                Bound::CurrentRow => position,
                Bound::Following(offset) => position + offset_of(offset),
                Bound::UnboundedFollowing => len,
            };
            let end = match &frame.end {
                Bound::UnboundedPreceding => 0,
                Bound::Preceding(offset) => (position + 1).saturating_sub(offset_of(offset)),
                Bound::CurrentRow => position + 1,
                Bound::Following(offset) => position + offset_of(offset) + 1,
                Bound::UnboundedFollowing => len,
            };
            let (start, end) = (start.min(len), end.min(len));
            Ok(if start < end {
                partition[start..end].to_vec()
            } else {
                Vec::new()
            })
        }

        FrameUnits::Groups => {
            // Bucket the partition into ORDER BY equivalence classes.
            let mut buckets: Vec<(usize, usize)> = Vec::new();
            let mut bucket_of = vec![0; len];
            let mut start = 0;
            for i in 1..=len {
                if i == len
                    || !peer(
                        &order_keys[partition[i]],
                        &order_keys[partition[start]],
                    )
                {
                    for slot in bucket_of.iter_mut().take(i).skip(start) {
                        *slot = buckets.len();
                    }
                    buckets.push((start, i));
                    start = i;
                }
            }
            let group = bucket_of[position];
            let total = buckets.len();
            let first = match &frame.start {
                Bound::UnboundedPreceding => 0,
                Bound::Preceding(offset) => group.saturating_sub(offset_of(offset)),
                Bound::CurrentRow => group,
                Bound::Following(offset) => group + offset_of(offset),
                Bound::UnboundedFollowing => total,
            };
            let last = match &frame.end {
                Bound::UnboundedPreceding => 0,
                Bound::Preceding(offset) => (group + 1).saturating_sub(offset_of(offset)),
                Bound::CurrentRow => group + 1,
                Bound::Following(offset) => group + offset_of(offset) + 1,
                Bound::UnboundedFollowing => total,
            };
            let (first, last) = (first.min(total), last.min(total));
            if first >= last {
                return Ok(Vec::new());
            }
            let row_start = buckets[first].0;
            let row_end = buckets[last - 1].1;
            Ok(partition[row_start..row_end].to_vec())
        }

        FrameUnits::Range => {
            // No ORDER BY: the whole partition is one equivalence class.
            if call.order_by.is_empty() {
                return Ok(partition.to_vec());
            }
            let reference = order_keys[partition[position]][0].clone();
            // A NULL order value frames over its peer group.
            if reference.is_null() {
                return Ok(partition
                    .iter()
                    .copied()
                    .filter(|&i| order_keys[i][0].is_null())
                    .collect());
            }
            let ascending = call.order_by[0].1 == Direction::Ascending;

            // Each bound becomes a one-sided constraint on the order value.
            // Ascending: the frame start is a lower bound and the end an
            // upper bound; descending mirrors both.
            let start = range_threshold(&frame.start, &reference, ascending)?;
            let end = range_threshold(&frame.end, &reference, ascending)?;
            let (low, high) = if ascending { (start, end) } else { (end, start) };

            let mut slice = Vec::new();
            for &index in partition {
                let value = &order_keys[index][0];
                if value.is_null() {
                    continue;
                }
                let above = match &low {
                    Some(low) => {
                        matches!(compare_values(value, low), Some(Ordering::Greater | Ordering::Equal))
                    }
                    None => true,
                };
                let below = match &high {
                    Some(high) => {
                        matches!(compare_values(value, high), Some(Ordering::Less | Ordering::Equal))
                    }
                    None => true,
                };
                if above && below {
                    slice.push(index);
                }
            }
            Ok(slice)
        }
    }
}

/// Translates a RANGE bound into an order-value threshold, None when
/// unbounded. PRECEDING moves against the sort direction, FOLLOWING along
/// it.
fn range_threshold(bound: &Bound, reference: &Value, ascending: bool) -> Result<Option<Value>> {
    let shift = |offset: &Value, forward: bool| -> Result<Value> {
        let op = if forward == ascending {
            BinaryOp::Add
        } else {
            BinaryOp::Subtract
        };
        execute_binary(op, reference, offset)
    };
    Ok(match bound {
        Bound::UnboundedPreceding | Bound::UnboundedFollowing => None,
        Bound::CurrentRow => Some(reference.clone()),
        Bound::Preceding(offset) => Some(shift(offset, false)?),
        Bound::Following(offset) => Some(shift(offset, true)?),
    })
}

fn offset_of(value: &Value) -> usize {
    value.as_f64().map(|n| n.max(0.0) as usize).unwrap_or(0)
}

/// EXCLUDE is applied last: CURRENT drops the current row, GROUP drops the
/// current row's whole equivalence class, TIES drops the class but keeps
/// the current row.
fn apply_exclude(
    exclude: FrameExclude,
    frame: Vec<usize>,
    partition: &[usize],
    position: usize,
    order_keys: &[Row],
) -> Vec<usize> {
    let current = partition[position];
    match exclude {
        FrameExclude::NoOthers => frame,
        FrameExclude::CurrentRow => frame.into_iter().filter(|&i| i != current).collect(),
        FrameExclude::Group => frame
            .into_iter()
            .filter(|&i| !peer(&order_keys[i], &order_keys[current]))
            .collect(),
        FrameExclude::Ties => frame
            .into_iter()
            .filter(|&i| i == current || !peer(&order_keys[i], &order_keys[current]))
            .collect(),
    }
}
