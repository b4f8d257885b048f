//! Common test utilities for integration tests
#![allow(dead_code)]

use peaql::{Context, DataType, ExecutionResult, Params, Value};

/// Test context wrapping a catalog with panic-on-error helpers.
pub struct TestContext {
    pub db: Context,
}

impl TestContext {
    pub fn new() -> Self {
        TestContext { db: Context::new() }
    }

    /// Execute SQL, panicking on failure.
    pub fn exec(&mut self, sql: &str) -> ExecutionResult {
        match self.db.execute(sql) {
            Ok(result) => result,
            Err(error) => panic!("SQL execution failed: {} - Error: {}", sql, error),
        }
    }

    /// Execute SQL with parameters, panicking on failure.
    pub fn exec_with(&mut self, sql: &str, params: Params) -> ExecutionResult {
        match self.db.execute_with(sql, Some(&params)) {
            Ok(result) => result,
            Err(error) => panic!("SQL execution failed: {} - Error: {}", sql, error),
        }
    }

    /// Execute a query and return its rows.
    pub fn rows(&mut self, sql: &str) -> Vec<Vec<Value>> {
        match self.exec(sql) {
            ExecutionResult::Rows { rows, .. } => rows,
            ExecutionResult::Count(count) => {
                panic!("query '{}' returned a count ({}), not rows", sql, count)
            }
        }
    }

    /// Execute a query and return its column schema.
    pub fn columns(&mut self, sql: &str) -> Vec<(String, DataType)> {
        match self.exec(sql) {
            ExecutionResult::Rows { columns, .. } => columns,
            ExecutionResult::Count(count) => {
                panic!("query '{}' returned a count ({}), not rows", sql, count)
            }
        }
    }

    /// Execute a single-row, single-column query and return the value.
    pub fn scalar(&mut self, sql: &str) -> Value {
        let rows = self.rows(sql);
        assert_eq!(rows.len(), 1, "query '{}' returned {} rows", sql, rows.len());
        assert_eq!(
            rows[0].len(),
            1,
            "query '{}' returned {} columns",
            sql,
            rows[0].len()
        );
        rows[0][0].clone()
    }

    /// Execute SQL expecting an error, returning its message.
    pub fn exec_error(&mut self, sql: &str) -> String {
        match self.db.execute(sql) {
            Ok(_) => panic!("expected error for SQL: {}", sql),
            Err(error) => error.to_string(),
        }
    }

    /// Assert the error message for a statement contains the given text.
    pub fn assert_error_contains(&mut self, sql: &str, expected: &str) {
        let error = self.exec_error(sql);
        assert!(
            error.contains(expected),
            "error '{}' does not contain '{}'",
            error,
            expected
        );
    }

    /// Assert a query returns exactly the expected rows, in order.
    pub fn assert_rows(&mut self, sql: &str, expected: Vec<Vec<Value>>) {
        let rows = self.rows(sql);
        assert_eq!(rows, expected, "query '{}' rows don't match", sql);
    }

    /// Assert a query's affected-row count.
    pub fn assert_count(&mut self, sql: &str, expected: usize) {
        match self.exec(sql) {
            ExecutionResult::Count(count) => {
                assert_eq!(count, expected, "statement '{}' count doesn't match", sql)
            }
            ExecutionResult::Rows { rows, .. } => panic!(
                "statement '{}' returned {} rows, expected a count",
                sql,
                rows.len()
            ),
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The 8-row sales table used across aggregate and pivot tests.
pub fn setup_sales() -> TestContext {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE sales (region STRING, product STRING, revenue INTEGER)");
    ctx.exec(
        "INSERT INTO sales VALUES \
         ('N', 'A', 100), ('N', 'B', 200), ('S', 'A', 150), ('S', 'C', 300), \
         ('E', 'B', 250), ('E', 'C', 100), ('W', 'A', 50), ('W', 'B', 300)",
    );
    ctx
}

/// The 7-row window-function fixture.
pub fn setup_t1() -> TestContext {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t1 (a INTEGER, b STRING, c STRING)");
    ctx.exec(
        "INSERT INTO t1 VALUES \
         (1, 'A', 'one'), (2, 'B', 'two'), (3, 'C', 'three'), (4, 'D', 'one'), \
         (5, 'E', 'two'), (6, 'F', 'three'), (7, 'G', 'one')",
    );
    ctx
}

pub fn i(n: i64) -> Value {
    Value::Integer(n)
}

pub fn r(n: f64) -> Value {
    Value::Real(n)
}

pub fn s(text: &str) -> Value {
    Value::string(text)
}

pub fn null() -> Value {
    Value::Null
}
