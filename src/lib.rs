//! PeaQL: an embeddable, in-process SQL query engine over in-memory tables
//!
//! Statement text is parsed into an AST, compiled into a typed evaluation
//! plan against a catalog of registered tables, and executed to a column
//! schema plus row set. The engine is single-threaded and synchronous; all
//! table data is memory-resident.
//!
//! ```
//! use peaql::{Context, ExecutionResult, Value};
//!
//! let mut db = Context::new();
//! let result = db
//!     .execute(
//!         "CREATE TABLE t1 (a STRING, b INTEGER); \
//!          INSERT INTO t1 VALUES ('peter', 1), ('pan', 2); \
//!          SELECT * FROM t1;",
//!     )
//!     .unwrap();
//! let ExecutionResult::Rows { rows, .. } = result else { panic!() };
//! assert_eq!(rows[0], vec![Value::string("peter"), Value::Integer(1)]);
//! ```

mod catalog;
mod coercion;
mod error;
mod execution;
mod functions;
mod operators;
mod parsing;
mod planning;
mod types;

pub use catalog::{
    Column, Constraint, Context, Params, PreparedStatement, Table, create_database,
    value_from_json, value_to_json,
};
pub use error::{Error, Result};
pub use execution::ExecutionResult;
pub use planning::{CompileOptions, Plan};
pub use types::{DataType, Interval, Row, Value};
