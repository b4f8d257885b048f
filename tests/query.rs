//! Query-level integration tests: CTEs, subqueries, set operations,
//! DISTINCT/ORDER/LIMIT, PIVOT, placeholders, identifier quoting

mod common;

use common::{TestContext, i, null, r, s, setup_sales};
use peaql::Params;
use std::collections::HashMap;

#[test]
fn order_by_nulls_and_directions() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER)");
    ctx.exec("INSERT INTO t VALUES (2), (NULL), (1)");
    ctx.assert_rows(
        "SELECT a FROM t ORDER BY a",
        vec![vec![null()], vec![i(1)], vec![i(2)]],
    );
    ctx.assert_rows(
        "SELECT a FROM t ORDER BY a DESC",
        vec![vec![i(2)], vec![i(1)], vec![null()]],
    );
    ctx.assert_rows(
        "SELECT a FROM t ORDER BY a ASC NULLS LAST",
        vec![vec![i(1)], vec![i(2)], vec![null()]],
    );
    ctx.assert_rows(
        "SELECT a FROM t ORDER BY a DESC NULLS FIRST",
        vec![vec![null()], vec![i(2)], vec![i(1)]],
    );
}

#[test]
fn distinct_preserves_first_seen_order() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER)");
    ctx.exec("INSERT INTO t VALUES (3), (1), (3), (2), (1)");
    ctx.assert_rows(
        "SELECT DISTINCT a FROM t",
        vec![vec![i(3)], vec![i(1)], vec![i(2)]],
    );
}

#[test]
fn limit_slices() {
    let mut ctx = setup_sales();
    assert_eq!(ctx.rows("SELECT * FROM sales LIMIT 3").len(), 3);
    assert_eq!(ctx.rows("SELECT * FROM sales LIMIT 0").len(), 0);
    ctx.assert_error_contains("SELECT * FROM sales LIMIT 'x'", "LIMIT must be");
}

#[test]
fn scalar_select_without_from() {
    let mut ctx = TestContext::new();
    ctx.assert_rows("SELECT 1, 'two', 3.0", vec![vec![i(1), s("two"), r(3.0)]]);
}

#[test]
fn cte_basic_and_nested() {
    let mut ctx = setup_sales();
    ctx.assert_rows(
        "WITH totals AS (SELECT region, sum(revenue) AS total FROM sales GROUP BY 1) \
         SELECT region FROM totals WHERE total > 400",
        vec![vec![s("S")]],
    );
    ctx.assert_rows(
        "WITH a AS (SELECT 1 AS x), b AS (SELECT x + 1 AS y FROM a) SELECT y FROM b",
        vec![vec![i(2)]],
    );
}

#[test]
fn scalar_subquery() {
    let mut ctx = setup_sales();
    assert_eq!(
        ctx.scalar("SELECT (SELECT max(revenue) FROM sales)"),
        i(300)
    );
    ctx.assert_error_contains(
        "SELECT (SELECT region, product FROM sales)",
        "returns 2 columns",
    );
    ctx.assert_error_contains(
        "SELECT (SELECT revenue FROM sales)",
        "scalar subquery returned 8 rows",
    );
}

#[test]
fn in_subquery() {
    let mut ctx = setup_sales();
    ctx.assert_rows(
        "SELECT DISTINCT region FROM sales WHERE product IN \
         (SELECT product FROM sales WHERE revenue >= 300) ORDER BY 1",
        vec![vec![s("E")], vec![s("N")], vec![s("S")], vec![s("W")]],
    );
}

#[test]
fn correlated_subquery() {
    let mut ctx = setup_sales();
    // Regions whose best sale is at least 300.
    ctx.assert_rows(
        "SELECT DISTINCT region FROM sales outer_sales WHERE 300 <= \
         (SELECT max(revenue) FROM sales WHERE sales.region = outer_sales.region) \
         ORDER BY 1",
        vec![vec![s("S")], vec![s("W")]],
    );
}

#[test]
fn union_intersect_except() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE a (x INTEGER)");
    ctx.exec("CREATE TABLE b (x INTEGER)");
    ctx.exec("INSERT INTO a VALUES (1), (2), (2), (3)");
    ctx.exec("INSERT INTO b VALUES (2), (3), (4)");
    ctx.assert_rows(
        "SELECT x FROM a UNION SELECT x FROM b ORDER BY x",
        vec![vec![i(1)], vec![i(2)], vec![i(3)], vec![i(4)]],
    );
    assert_eq!(
        ctx.rows("SELECT x FROM a UNION ALL SELECT x FROM b").len(),
        7
    );
    ctx.assert_rows(
        "SELECT x FROM a INTERSECT SELECT x FROM b ORDER BY x",
        vec![vec![i(2)], vec![i(3)]],
    );
    ctx.assert_rows(
        "SELECT x FROM a EXCEPT SELECT x FROM b",
        vec![vec![i(1)]],
    );
    ctx.assert_rows(
        "SELECT x FROM a EXCEPT ALL SELECT x FROM b ORDER BY x",
        vec![vec![i(1)], vec![i(2)]],
    );
    ctx.assert_error_contains(
        "SELECT x, x FROM a UNION SELECT x FROM b",
        "set operation operands have 2 and 1 columns",
    );
}

#[test]
fn pivot_by() {
    let mut ctx = setup_sales();
    let columns = ctx.columns(
        "SELECT region, product, sum(revenue) FROM sales GROUP BY 1, 2 PIVOT BY 1, 2",
    );
    assert_eq!(
        columns.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
        vec!["region", "A", "B", "C"]
    );
    ctx.assert_rows(
        "SELECT region, product, sum(revenue) FROM sales GROUP BY 1, 2 PIVOT BY 1, 2",
        vec![
            vec![s("E"), null(), i(250), i(100)],
            vec![s("N"), i(100), i(200), null()],
            vec![s("S"), i(150), null(), i(300)],
            vec![s("W"), i(50), i(300), null()],
        ],
    );
}

#[test]
fn pivot_validation() {
    let mut ctx = setup_sales();
    ctx.assert_error_contains(
        "SELECT region, product, sum(revenue) FROM sales GROUP BY 1, 2 PIVOT BY 1",
        "exactly two axes",
    );
    ctx.assert_error_contains(
        "SELECT region, product, sum(revenue) FROM sales GROUP BY 1, 2 PIVOT BY 1, 1",
        "axes must differ",
    );
    ctx.assert_error_contains(
        "SELECT region, product, sum(revenue) FROM sales GROUP BY 1, 2 PIVOT BY 1, 3",
        "must be a GROUP BY key",
    );
}

#[test]
fn positional_placeholders() {
    let mut ctx = setup_sales();
    let result = ctx.exec_with(
        "SELECT count(*) FROM sales WHERE revenue > ? AND region = ?",
        Params::Positional(vec![i(100), s("S")]),
    );
    assert_eq!(result.rows().unwrap(), vec![vec![i(2)]]);
}

#[test]
fn named_placeholders() {
    let mut ctx = setup_sales();
    let mut params = HashMap::new();
    params.insert("min".to_string(), i(200));
    let result = ctx.exec_with(
        "SELECT count(*) FROM sales WHERE revenue >= :min",
        Params::Named(params),
    );
    assert_eq!(result.rows().unwrap(), vec![vec![i(4)]]);
}

#[test]
fn placeholder_misuse() {
    let mut ctx = setup_sales();
    // Missing parameters are fatal at compile time.
    let error = ctx
        .db
        .execute("SELECT * FROM sales WHERE revenue > ?")
        .unwrap_err();
    assert!(matches!(error, peaql::Error::ProgrammingError(_)));

    // Wrong parameter shape.
    let error = ctx
        .db
        .execute_with(
            "SELECT * FROM sales WHERE revenue > :min",
            Some(&Params::Positional(vec![i(1)])),
        )
        .unwrap_err();
    assert!(matches!(error, peaql::Error::ProgrammingError(_)));

    // Arity mismatch.
    let error = ctx
        .db
        .execute_with(
            "SELECT * FROM sales WHERE revenue > ?",
            Some(&Params::Positional(vec![i(1), i(2)])),
        )
        .unwrap_err();
    assert!(matches!(error, peaql::Error::ProgrammingError(_)));
}

#[test]
fn identifier_quoting_modes() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a STRING)");
    ctx.exec("INSERT INTO t VALUES ('value')");

    // auto: double quotes and backticks are identifiers.
    assert_eq!(ctx.scalar("SELECT \"a\" FROM t"), s("value"));
    assert_eq!(ctx.scalar("SELECT `a` FROM t"), s("value"));

    // backtick: double-quoted text becomes a string literal.
    assert_eq!(
        ctx.scalar("SET identifier_quoting = backtick; SELECT \"a\" FROM t"),
        s("a")
    );
    assert_eq!(
        ctx.scalar("SET identifier_quoting = backtick; SELECT `a` FROM t"),
        s("value")
    );

    // bracket: [a] resolves as an identifier.
    assert_eq!(
        ctx.scalar("SET identifier_quoting = bracket; SELECT [a] FROM t"),
        s("value")
    );

    // The setting scopes to its statement; the next statement is back to
    // auto.
    assert_eq!(ctx.scalar("SELECT \"a\" FROM t"), s("value"));
}

#[test]
fn default_table() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER)");
    ctx.exec("INSERT INTO t VALUES (7)");
    ctx.db = std::mem::take(&mut ctx.db).with_default_table("t");
    assert_eq!(ctx.scalar("SELECT a"), i(7));
}

#[test]
fn prepared_statement_reuse() {
    let mut ctx = setup_sales();
    let prepared = ctx.db.prepare("SELECT count(*) FROM sales WHERE region = ?");
    for (region, expected) in [("N", 2i64), ("S", 2), ("X", 0)] {
        let result = ctx
            .db
            .execute_prepared(
                &prepared,
                Some(&Params::Positional(vec![s(region)])),
                &peaql::CompileOptions::default(),
            )
            .unwrap();
        assert_eq!(result.rows().unwrap(), vec![vec![i(expected)]]);
    }
}

#[test]
fn wildcard_subset() {
    let mut ctx = TestContext::new();
    let table = peaql::Table::new(
        "t",
        vec![
            peaql::Column::new("a", peaql::DataType::Integer),
            peaql::Column::new("b", peaql::DataType::Integer),
            peaql::Column::new("secret", peaql::DataType::Str),
        ],
    )
    .unwrap()
    .with_wildcard(vec!["a".into(), "b".into()])
    .with_rows(vec![vec![i(1), i(2), s("x")]]);
    ctx.db.register(table).unwrap();

    // `*` honors the wildcard subset; explicit selection still works.
    assert_eq!(ctx.rows("SELECT * FROM t"), vec![vec![i(1), i(2)]]);
    assert_eq!(ctx.scalar("SELECT secret FROM t"), s("x"));
}
