//! Pivot transform
//!
//! Rotates a grouped result around two axes (a, b): the unique values of b
//! become columns, the remaining visible columns become cells per (a, b)
//! cross, and rows are sorted by axis a.

use crate::error::{Error, Result};
use crate::planning::QueryPlan;
use crate::types::{DataType, Row, Value};

pub fn transform(
    plan: &QueryPlan,
    full_rows: Vec<Row>,
) -> Result<(Vec<(String, DataType)>, Vec<Row>)> {
    let (a, b) = plan
        .pivot
        .ok_or_else(|| Error::Internal("pivot transform without axes".into()))?;

    // The value columns: every visible target that is not an axis.
    let value_columns: Vec<usize> = plan
        .targets
        .iter()
        .enumerate()
        .filter(|(i, t)| !t.hidden && *i != a && *i != b)
        .map(|(i, _)| i)
        .collect();

    // Unique b values, sorted for a deterministic column order.
    let mut b_values: Vec<Value> = Vec::new();
    for row in &full_rows {
        if !b_values.contains(&row[b]) {
            b_values.push(row[b].clone());
        }
    }
    b_values.sort();

    let mut columns = vec![(
        plan.targets[a].name.clone(),
        plan.targets[a].data_type.clone(),
    )];
    for b_value in &b_values {
        for &value_column in &value_columns {
            let target = &plan.targets[value_column];
            // A single value column borrows the b value as its name;
            // several combine both.
            let name = if value_columns.len() == 1 {
                b_value.to_string()
            } else {
                format!("{}.{}", b_value, target.name)
            };
            columns.push((name, target.data_type.clone()));
        }
    }

    // One output row per a value, sorted by a.
    let mut a_values: Vec<Value> = Vec::new();
    for row in &full_rows {
        if !a_values.contains(&row[a]) {
            a_values.push(row[a].clone());
        }
    }
    a_values.sort();

    let mut rows = Vec::with_capacity(a_values.len());
    for a_value in a_values {
        let mut out = vec![a_value.clone()];
        for b_value in &b_values {
            let cell_row = full_rows
                .iter()
                .find(|row| row[a] == a_value && &row[b] == b_value);
            for &value_column in &value_columns {
                out.push(
                    cell_row
                        .map(|row| row[value_column].clone())
                        .unwrap_or(Value::Null),
                );
            }
        }
        rows.push(out);
    }

    Ok((columns, rows))
}
