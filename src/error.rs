//! Error types for the query engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Catalog errors
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    DuplicateTable(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    #[error("Ambiguous column reference: {0}")]
    AmbiguousColumn(String),

    // Type errors
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// No operator/function overload matches the given argument types. The
    /// payload is the rendered call signature, e.g. `+(boolean, interval)`.
    #[error("Operation is not supported: {0}")]
    NotSupported(String),

    // Statement errors
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Compile error: {0}")]
    CompileError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Invalid API usage: mixed placeholder styles, missing or mistyped
    /// parameters. Distinct from query errors since the fix is in the
    /// calling code, not the SQL.
    #[error("Programming error: {0}")]
    ProgrammingError(String),

    // Constraint errors
    #[error("NULL constraint violation on column: {0}")]
    NullConstraintViolation(String),

    #[error("{0}")]
    CheckConstraintViolation(String),

    // System errors
    #[error("Internal error: {0}")]
    Internal(String),
}
