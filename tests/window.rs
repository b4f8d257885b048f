//! Window function integration tests

mod common;

use common::{TestContext, i, null, s, setup_t1};
use peaql::Value;

#[test]
fn range_current_row_to_unbounded_following() {
    let mut ctx = setup_t1();
    ctx.assert_rows(
        "SELECT c, a, b, group_concat(b, '.') OVER (\
           PARTITION BY c ORDER BY a RANGE BETWEEN CURRENT ROW AND UNBOUNDED FOLLOWING\
         ) FROM t1 ORDER BY c, a",
        vec![
            vec![s("one"), i(1), s("A"), s("A.D.G")],
            vec![s("one"), i(4), s("D"), s("D.G")],
            vec![s("one"), i(7), s("G"), s("G")],
            vec![s("three"), i(3), s("C"), s("C.F")],
            vec![s("three"), i(6), s("F"), s("F")],
            vec![s("two"), i(2), s("B"), s("B.E")],
            vec![s("two"), i(5), s("E"), s("E")],
        ],
    );
}

#[test]
fn named_window_reference() {
    let mut ctx = setup_t1();
    ctx.assert_rows(
        "SELECT a, count(*) OVER w FROM t1 WINDOW w AS (PARTITION BY c) ORDER BY a LIMIT 3",
        vec![vec![i(1), i(3)], vec![i(2), i(2)], vec![i(3), i(2)]],
    );
    // The reference site may override subfields of the named window.
    ctx.assert_rows(
        "SELECT a, group_concat(b, '') OVER (w ORDER BY a DESC) FROM t1 \
         WINDOW w AS (PARTITION BY c) ORDER BY a LIMIT 2",
        vec![vec![i(1), s("GDA")], vec![i(2), s("EB")]],
    );
}

#[test]
fn cumulative_sum_is_non_decreasing() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (v INTEGER)");
    ctx.exec("INSERT INTO t VALUES (3), (1), (4), (1), (5), (9), (2), (6)");
    let rows = ctx.rows(
        "SELECT sum(v) OVER (ORDER BY v ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW) \
         FROM t ORDER BY 1",
    );
    let mut previous = i64::MIN;
    for row in rows {
        let Value::Integer(value) = row[0] else { panic!() };
        assert!(value >= previous, "cumulative sum decreased");
        previous = value;
    }
}

#[test]
fn row_number_rank_dense_rank() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (v INTEGER)");
    ctx.exec("INSERT INTO t VALUES (10), (20), (20), (30)");
    ctx.assert_rows(
        "SELECT v, row_number() OVER (ORDER BY v), rank() OVER (ORDER BY v), \
                dense_rank() OVER (ORDER BY v) \
         FROM t ORDER BY v, 2",
        vec![
            vec![i(10), i(1), i(1), i(1)],
            vec![i(20), i(2), i(2), i(2)],
            vec![i(20), i(3), i(2), i(2)],
            vec![i(30), i(4), i(4), i(3)],
        ],
    );
}

#[test]
fn lead_lag_with_default() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (v INTEGER)");
    ctx.exec("INSERT INTO t VALUES (1), (2), (3)");
    ctx.assert_rows(
        "SELECT v, lag(v) OVER (ORDER BY v), lead(v, 1, 0) OVER (ORDER BY v) \
         FROM t ORDER BY v",
        vec![
            vec![i(1), null(), i(2)],
            vec![i(2), i(1), i(3)],
            vec![i(3), i(2), i(0)],
        ],
    );
}

#[test]
fn first_last_nth_value() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (v INTEGER)");
    ctx.exec("INSERT INTO t VALUES (1), (2), (3)");
    ctx.assert_rows(
        "SELECT v, first_value(v) OVER (ORDER BY v ROWS BETWEEN UNBOUNDED PRECEDING AND UNBOUNDED FOLLOWING), \
                last_value(v) OVER (ORDER BY v ROWS BETWEEN UNBOUNDED PRECEDING AND UNBOUNDED FOLLOWING), \
                nth_value(v, 2) OVER (ORDER BY v ROWS BETWEEN UNBOUNDED PRECEDING AND UNBOUNDED FOLLOWING) \
         FROM t ORDER BY v",
        vec![
            vec![i(1), i(1), i(3), i(2)],
            vec![i(2), i(1), i(3), i(2)],
            vec![i(3), i(1), i(3), i(2)],
        ],
    );
}

#[test]
fn rows_frame_with_offsets() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (v INTEGER)");
    ctx.exec("INSERT INTO t VALUES (1), (2), (3), (4)");
    ctx.assert_rows(
        "SELECT v, sum(v) OVER (ORDER BY v ROWS BETWEEN 1 PRECEDING AND 1 FOLLOWING) \
         FROM t ORDER BY v",
        vec![
            vec![i(1), i(3)],
            vec![i(2), i(6)],
            vec![i(3), i(9)],
            vec![i(4), i(7)],
        ],
    );
}

#[test]
fn groups_frame() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (v INTEGER)");
    ctx.exec("INSERT INTO t VALUES (1), (1), (2), (3)");
    // One bucket either side of the current equivalence class.
    ctx.assert_rows(
        "SELECT v, sum(v) OVER (ORDER BY v GROUPS BETWEEN 1 PRECEDING AND 1 FOLLOWING) \
         FROM t ORDER BY v, 2",
        vec![
            vec![i(1), i(4)],
            vec![i(1), i(4)],
            vec![i(2), i(7)],
            vec![i(3), i(5)],
        ],
    );
}

#[test]
fn range_numeric_offsets() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (v INTEGER)");
    ctx.exec("INSERT INTO t VALUES (1), (2), (5), (6)");
    ctx.assert_rows(
        "SELECT v, sum(v) OVER (ORDER BY v RANGE BETWEEN 1 PRECEDING AND CURRENT ROW) \
         FROM t ORDER BY v",
        vec![
            vec![i(1), i(1)],
            vec![i(2), i(3)],
            vec![i(5), i(5)],
            vec![i(6), i(11)],
        ],
    );
}

#[test]
fn range_offset_on_text_is_rejected() {
    let mut ctx = common::setup_sales();
    ctx.assert_error_contains(
        "SELECT sum(revenue) OVER (ORDER BY product RANGE BETWEEN 10 PRECEDING AND CURRENT ROW) \
         FROM sales",
        "RANGE with offset PRECEDING/FOLLOWING is not supported for column type text",
    );
}

#[test]
fn exclude_modes() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE t (v INTEGER)");
    ctx.exec("INSERT INTO t VALUES (1), (2), (2), (3)");
    // EXCLUDE CURRENT ROW drops only the current row.
    ctx.assert_rows(
        "SELECT v, sum(v) OVER (ORDER BY v ROWS BETWEEN UNBOUNDED PRECEDING AND \
         UNBOUNDED FOLLOWING EXCLUDE CURRENT ROW) FROM t ORDER BY v, 2",
        vec![
            vec![i(1), i(7)],
            vec![i(2), i(6)],
            vec![i(2), i(6)],
            vec![i(3), i(5)],
        ],
    );
    // EXCLUDE GROUP drops the whole equivalence class.
    ctx.assert_rows(
        "SELECT v, sum(v) OVER (ORDER BY v ROWS BETWEEN UNBOUNDED PRECEDING AND \
         UNBOUNDED FOLLOWING EXCLUDE GROUP) FROM t ORDER BY v, 2",
        vec![
            vec![i(1), i(7)],
            vec![i(2), i(4)],
            vec![i(2), i(4)],
            vec![i(3), i(5)],
        ],
    );
    // EXCLUDE TIES keeps the current row but drops its peers.
    ctx.assert_rows(
        "SELECT v, sum(v) OVER (ORDER BY v ROWS BETWEEN UNBOUNDED PRECEDING AND \
         UNBOUNDED FOLLOWING EXCLUDE TIES) FROM t ORDER BY v, 2",
        vec![
            vec![i(1), i(8)],
            vec![i(2), i(6)],
            vec![i(2), i(6)],
            vec![i(3), i(8)],
        ],
    );
}

#[test]
fn window_function_without_over_is_rejected() {
    let mut ctx = setup_t1();
    ctx.assert_error_contains(
        "SELECT row_number() FROM t1",
        "requires an OVER clause",
    );
}

#[test]
fn unknown_named_window() {
    let mut ctx = setup_t1();
    ctx.assert_error_contains("SELECT sum(a) OVER missing FROM t1", "unknown window");
}

#[test]
fn count_distinct_over_window() {
    let mut ctx = setup_t1();
    ctx.assert_rows(
        "SELECT c, count(DISTINCT c) OVER (PARTITION BY c) FROM t1 ORDER BY c LIMIT 1",
        vec![vec![s("one"), i(1)]],
    );
}

#[test]
fn window_after_grouping() {
    let mut ctx = common::setup_sales();
    // The window runs over the grouped result rows.
    ctx.assert_rows(
        "SELECT region, sum(revenue), rank() OVER (ORDER BY sum(revenue) DESC) \
         FROM sales GROUP BY 1 ORDER BY 3, 1",
        vec![
            vec![s("S"), i(450), i(1)],
            vec![s("E"), i(350), i(2)],
            vec![s("W"), i(350), i(2)],
            vec![s("N"), i(300), i(4)],
        ],
    );
}
