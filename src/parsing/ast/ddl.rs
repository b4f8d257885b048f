//! Data definition: CREATE TABLE

use super::dml::SelectStatement;
use super::expressions::Expression;

/// CREATE TABLE statement.
#[derive(Clone, Debug)]
pub struct CreateTable {
    pub name: String,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
    /// CREATE TABLE ... AS query: seeds data from the query's result rows.
    pub as_query: Option<Box<SelectStatement>>,
}

/// A column definition.
#[derive(Clone, Debug)]
pub struct ColumnDef {
    pub name: String,
    /// Type name, resolved against the cast-name registry at compile time.
    pub type_name: String,
    /// `type[]` array suffix.
    pub is_array: bool,
    pub not_null: bool,
    /// DEFAULT expression; must match the column type or be castable to it.
    pub default: Option<Expression>,
    /// Inline CHECK; named `{table}_{column}_check` at compile time.
    pub check: Option<Expression>,
    pub unique: bool,
    pub primary_key: bool,
}

/// A table-level constraint.
#[derive(Clone, Debug)]
pub enum TableConstraint {
    Check {
        name: Option<String>,
        expr: Expression,
    },
    Unique {
        name: Option<String>,
        columns: Vec<String>,
    },
    PrimaryKey {
        name: Option<String>,
        columns: Vec<String>,
    },
    ForeignKey {
        name: Option<String>,
        columns: Vec<String>,
        references: String,
        ref_columns: Vec<String>,
    },
}
