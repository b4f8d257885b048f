//! INSERT execution
//!
//! Each row is assembled in declared column order (defaults for omitted
//! columns), coerced to the column types, and checked against every
//! constraint before it is appended. A constraint violation aborts the
//! whole statement.

use super::expression::{EvalContext, evaluate};
use super::ExecutionResult;
use crate::catalog::Context;
use crate::coercion::coerce_value;
use crate::error::{Error, Result};
use crate::planning::{CompiledConstraint, InsertPlan};
use crate::types::{Row, Value};

pub fn execute(plan: &InsertPlan, catalog: &mut Context) -> Result<ExecutionResult> {
    let (new_rows, returning_rows) = {
        let ctx = EvalContext::new(catalog);
        let table = catalog
            .table(&plan.table)
            .ok_or_else(|| Error::TableNotFound(plan.table.clone()))?;

        let mut new_rows = Vec::with_capacity(plan.rows.len());
        let mut returning_rows = Vec::new();

        for compiled_row in &plan.rows {
            let mut row: Row = vec![Value::Null; table.columns.len()];
            for (index, default) in plan.defaults.iter().enumerate() {
                if let Some(default) = default
                    && !plan.column_indices.contains(&index)
                {
                    row[index] = evaluate(default, None, &ctx)?;
                }
            }
            for (value, &column_index) in compiled_row.iter().zip(&plan.column_indices) {
                let value = evaluate(value, None, &ctx)?;
                let column = &table.columns[column_index];
                row[column_index] = coerce_value(value, &column.data_type)?;
            }

            check_constraints(&plan.constraints, &row, &plan.table, table, &ctx)?;

            if let Some(returning) = &plan.returning {
                let mut out = Vec::with_capacity(returning.len());
                for target in returning {
                    out.push(evaluate(&target.expr, Some(&row), &ctx)?);
                }
                returning_rows.push(out);
            }
            new_rows.push(row);
        }
        (new_rows, returning_rows)
    };

    let count = new_rows.len();
    tracing::debug!(table = %plan.table, rows = count, "inserting rows");
    let table = catalog
        .table_mut(&plan.table)
        .ok_or_else(|| Error::TableNotFound(plan.table.clone()))?;
    table.rows.extend(new_rows);

    match &plan.returning {
        Some(returning) => Ok(ExecutionResult::Rows {
            columns: returning
                .iter()
                .map(|t| (t.name.clone(), t.data_type.clone()))
                .collect(),
            rows: returning_rows,
        }),
        None => Ok(ExecutionResult::Count(count)),
    }
}

/// Checks one row against a table's compiled constraints. NOT NULL is
/// structural; CHECK expressions pass on TRUE and NULL.
pub fn check_constraints(
    constraints: &[CompiledConstraint],
    row: &Row,
    table_name: &str,
    table: &crate::catalog::Table,
    ctx: &EvalContext,
) -> Result<()> {
    for constraint in constraints {
        if let Some(column_index) = constraint.column {
            if row[column_index].is_null() {
                return Err(Error::NullConstraintViolation(
                    table.columns[column_index].name.clone(),
                ));
            }
            continue;
        }
        if let Some(expr) = &constraint.expr {
            let passed = match evaluate(expr, Some(row), ctx)?.to_bool_opt() {
                Some(passed) => passed,
                None => true,
            };
            if !passed {
                return Err(Error::CheckConstraintViolation(format!(
                    "Failing row contains ({}). new row for relation \"{}\" violates check constraint \"{}\"",
                    render_row(row),
                    table_name,
                    constraint.name
                )));
            }
        }
    }
    Ok(())
}

fn render_row(row: &Row) -> String {
    let rendered: Vec<String> = row.iter().map(|v| v.to_string()).collect();
    rendered.join(", ")
}
