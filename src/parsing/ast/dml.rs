//! Statements: SELECT, INSERT, UPDATE, CREATE TABLE, SET

use super::common::{Direction, FromClause, NullOrder, SetOperator, WindowSpec};
use super::ddl::CreateTable;
use super::expressions::{Expression, Literal};

/// A single SQL statement.
#[derive(Clone, Debug)]
pub enum Statement {
    Select(Box<SelectStatement>),
    /// INSERT INTO: appends rows to a table.
    Insert {
        table: String,
        /// Columns to insert into. None uses all columns in declared order.
        columns: Option<Vec<String>>,
        /// Rows of values; every row's arity must match the column list.
        values: Vec<Vec<Expression>>,
        /// RETURNING target list over each inserted row.
        returning: Option<Vec<(Expression, Option<String>)>>,
    },
    /// UPDATE: mutates matching rows in place.
    Update {
        table: String,
        set: Vec<(String, Expression)>,
        r#where: Option<Expression>,
        returning: Option<Vec<(Expression, Option<String>)>>,
    },
    CreateTable(CreateTable),
    /// SET name = value; harvested into the prepared statement's settings.
    Set { name: String, value: Literal },
}

/// SELECT statement structure.
#[derive(Clone, Debug, Default)]
pub struct SelectStatement {
    /// WITH: named CTEs visible to this statement.
    pub with: Vec<(String, SelectStatement)>,
    /// SELECT DISTINCT.
    pub distinct: bool,
    /// Expressions to select, with an optional column alias.
    pub select: Vec<(Expression, Option<String>)>,
    /// FROM: relations to select from; comma-separated relations become
    /// CROSS joins during planning.
    pub from: Vec<FromClause>,
    /// WHERE: optional condition to filter rows.
    pub r#where: Option<Expression>,
    /// GROUP BY: 1-based target indices or expressions to group by.
    pub group_by: Vec<Expression>,
    /// HAVING: aggregate expression to filter groups by.
    pub having: Option<Expression>,
    /// WINDOW: named window definitions, per query.
    pub windows: Vec<(String, WindowSpec)>,
    /// ORDER BY: keys with direction and NULLS placement.
    pub order_by: Vec<(Expression, Direction, Option<NullOrder>)>,
    /// PIVOT BY: exactly two axes when present.
    pub pivot_by: Vec<Expression>,
    /// LIMIT: maximum number of rows to return.
    pub limit: Option<Expression>,
    /// Chained set operations, applied left to right.
    pub compound: Vec<(SetOperator, SelectStatement)>,
}
