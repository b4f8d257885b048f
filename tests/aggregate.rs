//! Grouping and aggregation integration tests

mod common;

use common::{TestContext, i, null, r, s, setup_sales};
use peaql::Value;

#[test]
fn count_distinct_product() {
    let mut ctx = setup_sales();
    assert_eq!(ctx.scalar("SELECT count(distinct product) FROM sales"), i(3));
}

#[test]
fn count_star_and_column() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER)");
    ctx.exec("INSERT INTO t VALUES (1), (NULL), (3)");
    assert_eq!(ctx.scalar("SELECT count(*) FROM t"), i(3));
    assert_eq!(ctx.scalar("SELECT count(a) FROM t"), i(2));
}

#[test]
fn aggregates_over_empty_input() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER)");
    assert_eq!(ctx.scalar("SELECT count(*) FROM t"), i(0));
    assert_eq!(ctx.scalar("SELECT sum(a) FROM t"), null());
    assert_eq!(ctx.scalar("SELECT avg(a) FROM t"), null());
    assert_eq!(ctx.scalar("SELECT min(a) FROM t"), null());
    assert_eq!(ctx.scalar("SELECT max(a) FROM t"), null());
    // A grouped query over empty input with all-aggregate targets emits
    // exactly one row.
    assert_eq!(ctx.rows("SELECT count(*), sum(a) FROM t").len(), 1);
}

#[test]
fn group_by_index_and_expression() {
    let mut ctx = setup_sales();
    ctx.assert_rows(
        "SELECT region, sum(revenue) FROM sales GROUP BY 1 ORDER BY 2 DESC, 1",
        vec![
            vec![s("S"), i(450)],
            vec![s("E"), i(350)],
            vec![s("W"), i(350)],
            vec![s("N"), i(300)],
        ],
    );
    ctx.assert_rows(
        "SELECT upper(region), count(*) FROM sales GROUP BY upper(region) ORDER BY 1 LIMIT 2",
        vec![vec![s("E"), i(2)], vec![s("N"), i(2)]],
    );
}

#[test]
fn group_by_alias() {
    let mut ctx = setup_sales();
    ctx.assert_rows(
        "SELECT region AS zone, count(*) AS n FROM sales GROUP BY zone ORDER BY zone LIMIT 1",
        vec![vec![s("E"), i(2)]],
    );
}

#[test]
fn having_filters_groups() {
    let mut ctx = setup_sales();
    ctx.assert_rows(
        "SELECT product, count(*) FROM sales GROUP BY 1 HAVING count(*) > 2 ORDER BY 1",
        vec![vec![s("A"), i(3)], vec![s("B"), i(3)]],
    );
}

#[test]
fn implicit_group_by_adds_missing_keys() {
    let mut ctx = setup_sales();
    // `region` is silently added as a group key.
    let rows = ctx.rows("SELECT region, count(*) FROM sales ORDER BY 1");
    assert_eq!(rows.len(), 4);
}

#[test]
fn strict_group_by_rejects_missing_keys() {
    let mut ctx = setup_sales();
    let prepared = ctx.db.prepare("SELECT region, count(*) FROM sales");
    let options = peaql::CompileOptions {
        implicit_group_by: false,
    };
    let error = ctx.db.compile(&prepared, None, &options).unwrap_err();
    assert!(
        error.to_string().contains("GROUP BY"),
        "got: {}",
        error
    );
}

#[test]
fn aggregate_in_where_is_rejected() {
    let mut ctx = setup_sales();
    ctx.assert_error_contains(
        "SELECT region FROM sales WHERE sum(revenue) > 10",
        "aggregate functions are not allowed in WHERE",
    );
}

#[test]
fn nested_aggregates_are_rejected() {
    let mut ctx = setup_sales();
    ctx.assert_error_contains(
        "SELECT sum(count(revenue)) FROM sales",
        "aggregate calls cannot be nested",
    );
}

#[test]
fn distinct_on_scalar_function_is_rejected() {
    let mut ctx = setup_sales();
    ctx.assert_error_contains(
        "SELECT upper(DISTINCT region) FROM sales",
        "DISTINCT is only valid on aggregates",
    );
}

#[test]
fn filter_modifier() {
    let mut ctx = setup_sales();
    ctx.assert_rows(
        "SELECT count(*) FILTER (WHERE revenue > 150), count(*) FROM sales",
        vec![vec![i(4), i(8)]],
    );
}

#[test]
fn sum_distinct_and_avg() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a INTEGER)");
    ctx.exec("INSERT INTO t VALUES (10), (10), (20), (NULL)");
    assert_eq!(ctx.scalar("SELECT sum(a) FROM t"), i(40));
    assert_eq!(ctx.scalar("SELECT sum(DISTINCT a) FROM t"), i(30));
    assert_eq!(ctx.scalar("SELECT avg(a) FROM t"), Value::Real(40.0 / 3.0));
}

#[test]
fn avg_accumulates_in_decimal() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (a REAL)");
    ctx.exec("INSERT INTO t VALUES (0.1), (0.2)");
    // Decimal accumulation keeps the average exact.
    assert_eq!(ctx.scalar("SELECT avg(a) FROM t"), r(0.15));
}

#[test]
fn min_max_first_last() {
    let mut ctx = setup_sales();
    ctx.assert_rows(
        "SELECT min(revenue), max(revenue), first(product), last(product) FROM sales",
        vec![vec![i(50), i(300), s("A"), s("B")]],
    );
}

#[test]
fn group_concat_and_array_agg() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (g INTEGER, v STRING)");
    ctx.exec("INSERT INTO t VALUES (1, 'a'), (1, 'b'), (2, 'c')");
    ctx.assert_rows(
        "SELECT g, group_concat(v, '-') FROM t GROUP BY 1 ORDER BY 1",
        vec![vec![i(1), s("a-b")], vec![i(2), s("c")]],
    );
    ctx.assert_rows(
        "SELECT g, array_agg(v) FROM t GROUP BY 1 ORDER BY 1",
        vec![
            vec![i(1), Value::List(vec![s("a"), s("b")])],
            vec![i(2), Value::List(vec![s("c")])],
        ],
    );
}

#[test]
fn mixed_target_reresolves_with_slots() {
    let mut ctx = setup_sales();
    ctx.assert_rows(
        "SELECT region, sum(revenue) / 2 + 1 FROM sales GROUP BY 1 ORDER BY 1 LIMIT 1",
        vec![vec![s("E"), i(176)]],
    );
}

#[test]
fn grouping_is_order_insensitive() {
    let mut a = setup_sales();
    let mut b = TestContext::new();
    b.exec("CREATE TABLE sales (region STRING, product STRING, revenue INTEGER)");
    b.exec(
        "INSERT INTO sales VALUES \
         ('W', 'B', 300), ('W', 'A', 50), ('E', 'C', 100), ('E', 'B', 250), \
         ('S', 'C', 300), ('S', 'A', 150), ('N', 'B', 200), ('N', 'A', 100)",
    );
    let query = "SELECT region, count(*), sum(revenue) FROM sales GROUP BY 1 ORDER BY 1";
    assert_eq!(a.rows(query), b.rows(query));
}

#[test]
fn aggregated_join_order_limit() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE playlist (playlist_id INTEGER, name STRING)");
    ctx.exec("CREATE TABLE playlist_track (playlist_id INTEGER, track_id INTEGER)");
    ctx.exec("CREATE TABLE track (track_id INTEGER, title STRING)");
    ctx.exec(
        "INSERT INTO playlist VALUES (1, 'Music'), (2, 'Movies'), (3, 'TV Shows'), (4, 'Audiobooks')",
    );
    ctx.exec(
        "INSERT INTO track VALUES (1, 't1'), (2, 't2'), (3, 't3'), (4, 't4'), (5, 't5')",
    );
    ctx.exec(
        "INSERT INTO playlist_track VALUES \
         (1, 1), (1, 2), (1, 3), (1, 4), (1, 5), (3, 1), (3, 2), (3, 3), (2, 1)",
    );
    ctx.assert_rows(
        "SELECT playlist.name, count(pt.track_id) FROM playlist \
           JOIN playlist_track pt ON pt.playlist_id = playlist.playlist_id \
           JOIN track ON track.track_id = pt.track_id \
         GROUP BY 1 ORDER BY 2 DESC LIMIT 3",
        vec![
            vec![s("Music"), i(5)],
            vec![s("TV Shows"), i(3)],
            vec![s("Movies"), i(1)],
        ],
    );
}
