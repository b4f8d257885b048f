//! UPDATE execution
//!
//! Matching rows are mutated in place. Assignments are evaluated against
//! the old row, coerced to the column types, and constraint-checked before
//! any write happens, so a failing statement leaves the table untouched.

use super::expression::{EvalContext, evaluate};
use super::insert::check_constraints;
use super::ExecutionResult;
use crate::catalog::Context;
use crate::coercion::coerce_value;
use crate::error::{Error, Result};
use crate::planning::UpdatePlan;
use crate::types::Row;

pub fn execute(plan: &UpdatePlan, catalog: &mut Context) -> Result<ExecutionResult> {
    let (updates, returning_rows) = {
        let ctx = EvalContext::new(catalog);
        let table = catalog
            .table(&plan.table)
            .ok_or_else(|| Error::TableNotFound(plan.table.clone()))?;

        let mut updates: Vec<(usize, Row)> = Vec::new();
        let mut returning_rows = Vec::new();

        for (index, row) in table.rows.iter().enumerate() {
            let matched = match &plan.filter {
                Some(predicate) => evaluate(predicate, Some(row), &ctx)?
                    .to_bool_opt()
                    .unwrap_or(false),
                None => true,
            };
            if !matched {
                continue;
            }

            let mut updated = row.clone();
            for (column_index, expr) in &plan.assignments {
                let value = evaluate(expr, Some(row), &ctx)?;
                let column = &table.columns[*column_index];
                updated[*column_index] = coerce_value(value, &column.data_type)?;
            }

            check_constraints(&plan.constraints, &updated, &plan.table, table, &ctx)?;

            if let Some(returning) = &plan.returning {
                let mut out = Vec::with_capacity(returning.len());
                for target in returning {
                    out.push(evaluate(&target.expr, Some(&updated), &ctx)?);
                }
                returning_rows.push(out);
            }
            updates.push((index, updated));
        }
        (updates, returning_rows)
    };

    let count = updates.len();
    tracing::debug!(table = %plan.table, rows = count, "updating rows");
    let table = catalog
        .table_mut(&plan.table)
        .ok_or_else(|| Error::TableNotFound(plan.table.clone()))?;
    for (index, row) in updates {
        table.rows[index] = row;
    }

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
