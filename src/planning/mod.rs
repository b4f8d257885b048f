//! Compilation: AST to typed evaluation plans
//!
//! Planning proceeds in the stages of a SELECT: FROM/JOIN lowering, target
//! expansion, expression resolution (names to positions, operators and
//! functions to dispatched overloads), GROUP BY / ORDER BY / PIVOT BY
//! index-or-expression lowering, and window attachment. DDL/DML statements
//! compile against the live catalog.

mod aggregate_planner;
mod expression_resolver;
mod from_planner;
pub mod plan;
mod planner;
mod window_planner;

pub use plan::{
    AggregateCall, BatchPlan, Bound, CompileOptions, CompiledConstraint, CreateTablePlan,
    EquiJoin, Expression, Frame, InsertPlan, OrderKey, Plan, QueryPlan, Source, SourceColumn,
    Target, UpdatePlan, WindowCall,
};
pub use planner::{Planner, Scope};

use crate::catalog::{Context, Params};
use crate::error::Result;
use crate::parsing::ast::Statement;

/// Compiles a single statement against the catalog.
pub fn plan_statement(
    statement: &Statement,
    catalog: &Context,
    params: Option<&Params>,
    options: &CompileOptions,
) -> Result<Plan> {
    Planner::new(catalog, params, options).plan_statement(statement)
}
