//! Abstract syntax tree produced by the parser
//!
//! The AST only captures syntactic structure; it does not know whether
//! tables or columns exist or how a join should execute. That is the job of
//! the planner.

pub mod common;
pub mod ddl;
pub mod dml;
pub mod expressions;

pub use common::{
    Direction, FrameBound, FrameExclude, FrameSpec, FrameUnits, FromClause, JoinType, NullOrder,
    SetOperator, WindowSpec,
};
pub use ddl::{ColumnDef, CreateTable, TableConstraint};
pub use dml::{SelectStatement, Statement};
pub use expressions::{Expression, FunctionCall, Literal, Operator, OverClause, Placeholder};
