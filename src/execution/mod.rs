//! Plan execution
//!
//! Executes the typed plans produced by the compiler. Queries read a
//! snapshot of the catalog; DDL/DML mutate it and observe earlier
//! statements' side effects within a batch.

pub mod aggregate;
pub mod expression;
mod insert;
mod join;
mod pivot;
mod select;
mod update;
mod window;

use crate::catalog::Context;
use crate::error::{Error, Result};
use crate::planning::{self, Plan};
use crate::types::{DataType, Row};

/// The result of executing a statement: a result set for queries (and
/// RETURNING-bearing DML), an affected-row count for plain DML and DDL.
#[derive(Clone, Debug, PartialEq)]
pub enum ExecutionResult {
    Rows {
        columns: Vec<(String, DataType)>,
        rows: Vec<Row>,
    },
    Count(usize),
}

impl ExecutionResult {
    /// The result rows, when this is a row-shaped result.
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            ExecutionResult::Rows { rows, .. } => Some(rows),
            ExecutionResult::Count(_) => None,
        }
    }

    /// The result schema, when this is a row-shaped result.
    pub fn columns(&self) -> Option<&[(String, DataType)]> {
        match self {
            ExecutionResult::Rows { columns, .. } => Some(columns),
            ExecutionResult::Count(_) => None,
        }
    }
}

/// Executes a compiled plan against the catalog.
pub fn execute_plan(plan: &Plan, catalog: &mut Context) -> Result<ExecutionResult> {
    match plan {
        Plan::Query(query) => {
            let ctx = expression::EvalContext::new(catalog);
            let (columns, rows) = select::execute_query(query, &ctx)?;
            Ok(ExecutionResult::Rows { columns, rows })
        }
        Plan::Insert(insert) => insert::execute(insert, catalog),
        Plan::Update(update) => update::execute(update, catalog),
        Plan::CreateTable(create) => execute_create_table(create, catalog),
        Plan::Batch(batch) => {
            // Statements execute strictly in textual order; each child is
            // planned against the catalog as mutated by its predecessors.
            let mut last = ExecutionResult::Count(0);
            for statement in &batch.statements {
                let child = planning::plan_statement(
                    statement,
                    catalog,
                    batch.params.as_ref(),
                    &batch.options,
                )?;
                last = execute_plan(&child, catalog)?;
            }
            Ok(last)
        }
    }
}

fn execute_create_table(
    create: &planning::CreateTablePlan,
    catalog: &mut Context,
) -> Result<ExecutionResult> {
    if catalog.table(&create.table.name).is_some() {
        if create.if_not_exists {
            return Ok(ExecutionResult::Count(0));
        }
        return Err(Error::DuplicateTable(create.table.name.clone()));
    }

    let mut table = create.table.clone();
    let mut seeded = 0;
    if let Some(query) = &create.as_query {
        let ctx = expression::EvalContext::new(catalog);
        let (_, rows) = select::execute_query(query, &ctx)?;
        seeded = rows.len();
        table.rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(&table.columns)
                    .map(|(value, column)| crate::coercion::coerce_value(value, &column.data_type))
                    .collect::<Result<Row>>()
            })
            .collect::<Result<Vec<_>>>()?;
    }

    tracing::debug!(table = %table.name, seeded, "creating table");
    catalog.register(table)?;
    Ok(ExecutionResult::Count(seeded))
}
