//! CREATE TABLE / INSERT / UPDATE integration tests

mod common;

use common::{TestContext, i, null, s};
use peaql::{DataType, Value};

#[test]
fn create_insert_select_block() {
    let mut ctx = TestContext::new();
    let columns = ctx.columns(
        "CREATE TABLE t1(a STRING, b INTEGER); \
         INSERT INTO t1 VALUES('peter',1),('pan',2); \
         SELECT * FROM t1;",
    );
    assert_eq!(
        columns,
        vec![("a".to_string(), DataType::Str), ("b".to_string(), DataType::Integer)]
    );
    ctx.assert_rows(
        "SELECT * FROM t1",
        vec![vec![s("peter"), i(1)], vec![s("pan"), i(2)]],
    );
}

#[test]
fn check_constraint_violation_message() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t1(a STRING, b INTEGER, CHECK(b > 100))");
    let error = ctx.exec_error("INSERT INTO t1(a,b) VALUES('a',55)");
    assert_eq!(
        error,
        "Failing row contains (a, 55). new row for relation \"t1\" violates check constraint \"t1_b_check\""
    );
}

#[test]
fn inline_check_constraint_name() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t1(a STRING, b INTEGER CHECK(b > 100))");
    let error = ctx.exec_error("INSERT INTO t1(a,b) VALUES('a',55)");
    assert!(error.contains("t1_b_check"), "got: {}", error);
    // A passing row goes through.
    ctx.assert_count("INSERT INTO t1 VALUES('b', 101)", 1);
}

#[test]
fn not_null_constraint() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER NOT NULL, b INTEGER)");
    ctx.assert_count("INSERT INTO t VALUES (1, NULL)", 1);
    let error = ctx.exec_error("INSERT INTO t VALUES (NULL, 1)");
    assert!(error.contains("NULL constraint violation"), "got: {}", error);
}

#[test]
fn create_if_not_exists_is_idempotent() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER)");
    ctx.exec("CREATE TABLE IF NOT EXISTS t (a INTEGER)");
    ctx.exec("CREATE TABLE IF NOT EXISTS t (a INTEGER)");
    ctx.assert_error_contains("CREATE TABLE t (a INTEGER)", "already exists");
}

#[test]
fn insert_column_list_and_defaults() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER, b STRING DEFAULT 'none', c INTEGER DEFAULT 7)");
    ctx.exec("INSERT INTO t (a) VALUES (1)");
    ctx.assert_rows("SELECT * FROM t", vec![vec![i(1), s("none"), i(7)]]);
}

#[test]
fn insert_arity_mismatch() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER, b INTEGER)");
    ctx.assert_error_contains("INSERT INTO t VALUES (1)", "1 values for 2 columns");
}

#[test]
fn insert_coerces_and_rejects() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER, d DATETIME)");
    // String datetime coerces to the column type.
    ctx.exec("INSERT INTO t VALUES (1, '2024-03-05')");
    let rows = ctx.rows("SELECT d.year FROM t");
    assert_eq!(rows, vec![vec![i(2024)]]);
    // A boolean can never become a datetime.
    ctx.assert_error_contains("INSERT INTO t VALUES (2, TRUE)", "expected datetime");
}

#[test]
fn insert_returning() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER, b STRING)");
    ctx.assert_rows(
        "INSERT INTO t VALUES (1, 'x'), (2, 'y') RETURNING b, a * 10",
        vec![vec![s("x"), i(10)], vec![s("y"), i(20)]],
    );
}

#[test]
fn update_rows_in_place() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER, b INTEGER)");
    ctx.exec("INSERT INTO t VALUES (1, 10), (2, 20), (3, 30)");
    ctx.assert_count("UPDATE t SET b = b + 1 WHERE a >= 2", 2);
    ctx.assert_rows(
        "SELECT b FROM t ORDER BY a",
        vec![vec![i(10)], vec![i(21)], vec![i(31)]],
    );
}

#[test]
fn update_returning_and_unknown_column() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER)");
    ctx.exec("INSERT INTO t VALUES (1)");
    ctx.assert_rows("UPDATE t SET a = 5 RETURNING a", vec![vec![i(5)]]);
    ctx.assert_error_contains("UPDATE t SET missing = 1", "Column not found: missing");
}

#[test]
fn update_respects_check_constraints() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (b INTEGER, CHECK (b > 0))");
    ctx.exec("INSERT INTO t VALUES (5)");
    ctx.assert_error_contains("UPDATE t SET b = -1", "violates check constraint");
    // The failed statement left the table untouched.
    ctx.assert_rows("SELECT b FROM t", vec![vec![i(5)]]);
}

#[test]
fn create_table_as_query() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE src (a INTEGER, b STRING)");
    ctx.exec("INSERT INTO src VALUES (1, 'x'), (2, 'y')");
    ctx.exec("CREATE TABLE dst AS SELECT b, a * 2 AS doubled FROM src");
    ctx.assert_rows(
        "SELECT * FROM dst ORDER BY doubled",
        vec![vec![s("x"), i(2)], vec![s("y"), i(4)]],
    );
}

#[test]
fn ddl_visible_to_later_statements_in_block() {
    let mut ctx = TestContext::new();
    let rows = ctx.rows(
        "CREATE TABLE a (x INTEGER); \
         INSERT INTO a VALUES (1); \
         CREATE TABLE b AS SELECT x + 1 AS y FROM a; \
         SELECT y FROM b;",
    );
    assert_eq!(rows, vec![vec![i(2)]]);
}

#[test]
fn array_columns() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (tags STRING[])");
    ctx.exec("INSERT INTO t VALUES (['a', 'b'])");
    assert_eq!(
        ctx.scalar("SELECT tags[1] FROM t"),
        s("b")
    );
}

#[test]
fn table_not_found() {
    let mut ctx = TestContext::new();
    ctx.assert_error_contains("SELECT * FROM ghosts", "Table not found: ghosts");
    ctx.assert_error_contains("INSERT INTO ghosts VALUES (1)", "Table not found: ghosts");
}

#[test]
fn unknown_column_type() {
    let mut ctx = TestContext::new();
    ctx.assert_error_contains("CREATE TABLE t (a WIDGET)", "unknown column type");
}

#[test]
fn null_insert_and_select() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER, b STRING)");
    ctx.exec("INSERT INTO t VALUES (NULL, NULL)");
    ctx.assert_rows("SELECT * FROM t", vec![vec![null(), null()]]);
    assert_eq!(ctx.scalar("SELECT a IS NULL FROM t"), Value::Boolean(true));
}
