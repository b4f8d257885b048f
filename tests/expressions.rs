//! Expression, operator and builtin-function integration tests

mod common;

use common::{TestContext, i, null, r, s};
use peaql::Value;

fn ctx() -> TestContext {
    TestContext::new()
}

#[test]
fn arithmetic_and_division_by_zero() {
    let mut ctx = ctx();
    assert_eq!(ctx.scalar("SELECT 2 + 3 * 4"), i(14));
    assert_eq!(ctx.scalar("SELECT 7 / 2"), i(3));
    assert_eq!(ctx.scalar("SELECT -7 / 2"), i(-3));
    assert_eq!(ctx.scalar("SELECT 7.0 / 2"), r(3.5));
    assert_eq!(ctx.scalar("SELECT 1 / 0"), null());
    assert_eq!(ctx.scalar("SELECT 7 % 3"), i(1));
    assert_eq!(ctx.scalar("SELECT 2 * (3 + 4)"), i(14));
}

#[test]
fn null_propagation() {
    let mut ctx = ctx();
    assert_eq!(ctx.scalar("SELECT 1 + NULL"), null());
    assert_eq!(ctx.scalar("SELECT NULL = NULL"), null());
    assert_eq!(ctx.scalar("SELECT NOT NULL"), null());
    assert_eq!(ctx.scalar("SELECT NULL IS NULL"), Value::Boolean(true));
    assert_eq!(ctx.scalar("SELECT 1 IS NOT NULL"), Value::Boolean(true));
    assert_eq!(ctx.scalar("SELECT upper(NULL)"), null());
    assert_eq!(ctx.scalar("SELECT coalesce(NULL, NULL, 'x')"), s("x"));
}

#[test]
fn three_valued_logic() {
    let mut ctx = ctx();
    assert_eq!(ctx.scalar("SELECT NULL AND FALSE"), Value::Boolean(false));
    assert_eq!(ctx.scalar("SELECT NULL AND TRUE"), null());
    assert_eq!(ctx.scalar("SELECT NULL OR TRUE"), Value::Boolean(true));
    assert_eq!(ctx.scalar("SELECT NULL OR FALSE"), null());
}

#[test]
fn string_concatenation_with_plus() {
    let mut ctx = ctx();
    assert_eq!(ctx.scalar("SELECT 'a' + 'b'"), s("ab"));
    assert_eq!(ctx.scalar("SELECT 'n=' + 5"), s("n=5"));
    assert_eq!(ctx.scalar("SELECT 1.5 + 'x'"), s("1.5x"));
}

#[test]
fn comparisons_with_coercion() {
    let mut ctx = ctx();
    assert_eq!(ctx.scalar("SELECT 2 < 2.5"), Value::Boolean(true));
    assert_eq!(
        ctx.scalar("SELECT '2024-06-01'::datetime > '2024-01-01'"),
        Value::Boolean(true)
    );
    assert_eq!(
        ctx.scalar("SELECT '2 days'::interval > '1 day'"),
        Value::Boolean(true)
    );
    // An invalid comparison yields NULL, not an error.
    assert_eq!(ctx.scalar("SELECT '2024-06-01'::datetime = 'pear'"), null());
}

#[test]
fn regex_operators() {
    let mut ctx = ctx();
    assert_eq!(ctx.scalar("SELECT 'hello' ~ '^he'"), Value::Boolean(true));
    assert_eq!(ctx.scalar("SELECT 'HELLO' ~* '^he'"), Value::Boolean(true));
    assert_eq!(ctx.scalar("SELECT 'HELLO' ~ '^he'"), Value::Boolean(false));
    assert_eq!(ctx.scalar("SELECT 'world' !~ '^he'"), Value::Boolean(true));
    assert_eq!(ctx.scalar("SELECT 'world' !~* '^WO'"), Value::Boolean(false));
    // ?~ swaps the operands: the pattern is on the left.
    assert_eq!(ctx.scalar("SELECT '^he' ?~ 'hello'"), Value::Boolean(true));
    assert_eq!(ctx.scalar("SELECT '(?i)^he' ?~ 'HELLO'"), Value::Boolean(true));
}

#[test]
fn in_and_between() {
    let mut ctx = ctx();
    assert_eq!(ctx.scalar("SELECT 2 IN (1, 2, 3)"), Value::Boolean(true));
    assert_eq!(ctx.scalar("SELECT 4 NOT IN (1, 2, 3)"), Value::Boolean(true));
    assert_eq!(ctx.scalar("SELECT 4 IN (1, NULL)"), null());
    assert_eq!(ctx.scalar("SELECT 2 IN [1, 2]"), Value::Boolean(true));
    assert_eq!(ctx.scalar("SELECT 2 BETWEEN 1 AND 3"), Value::Boolean(true));
    assert_eq!(ctx.scalar("SELECT 2 NOT BETWEEN 1 AND 3"), Value::Boolean(false));
    assert_eq!(ctx.scalar("SELECT NULL BETWEEN 1 AND 3"), null());
}

#[test]
fn case_expressions() {
    let mut ctx = ctx();
    assert_eq!(
        ctx.scalar("SELECT CASE WHEN 1 > 2 THEN 'a' WHEN 2 > 1 THEN 'b' ELSE 'c' END"),
        s("b")
    );
    assert_eq!(
        ctx.scalar("SELECT CASE 2 WHEN 1 THEN 'one' WHEN 2 THEN 'two' END"),
        s("two")
    );
    assert_eq!(ctx.scalar("SELECT CASE 9 WHEN 1 THEN 'one' END"), null());
}

#[test]
fn casts() {
    let mut ctx = ctx();
    assert_eq!(ctx.scalar("SELECT '42'::integer"), i(42));
    assert_eq!(ctx.scalar("SELECT 42::string"), s("42"));
    assert_eq!(ctx.scalar("SELECT '2.5'::number"), r(2.5));
    assert_eq!(ctx.scalar("SELECT 'true'::boolean"), Value::Boolean(true));
    assert_eq!(ctx.scalar("SELECT 'nope'::integer"), null());
    assert_eq!(ctx.scalar("SELECT numeric('1.50')").to_string(), "1.50");
    ctx.assert_error_contains("SELECT 1::widget", "unknown type widget");
}

#[test]
fn datetime_attributes_and_methods() {
    let mut ctx = ctx();
    assert_eq!(
        ctx.scalar("SELECT '2024-03-05'::datetime.year"),
        i(2024)
    );
    assert_eq!(
        ctx.scalar("SELECT year('2024-03-05'::datetime)"),
        i(2024)
    );
    // Dotted-method syntax is function application with the receiver first.
    assert_eq!(ctx.scalar("SELECT 2.5.toFixed(3)"), s("2.500"));
    assert_eq!(ctx.scalar("SELECT 'abc'.upper()"), s("ABC"));
}

#[test]
fn datetime_attribute_on_column() {
    let mut ctx = ctx();
    ctx.exec("CREATE TABLE t (d DATETIME)");
    ctx.exec("INSERT INTO t VALUES ('2024-03-05 10:30:00')");
    ctx.assert_rows(
        "SELECT d.year, d.month, d.quarter, d.yearmonth FROM t",
        vec![vec![i(2024), i(3), i(1), s("2024-03")]],
    );
    // Structured wildcard expansion.
    let columns = ctx.columns("SELECT d.* FROM t");
    assert_eq!(columns[0].0, "d.year");
    assert_eq!(columns.len(), 9);
}

#[test]
fn datetime_arithmetic() {
    let mut ctx = ctx();
    assert_eq!(
        ctx.scalar("SELECT ('2024-01-01'::datetime + 31)::string"),
        s("2024-02-01 00:00:00")
    );
    assert_eq!(
        ctx.scalar("SELECT ('2024-01-31'::datetime + '1 month'::interval)::string"),
        s("2024-02-29 00:00:00")
    );
    assert_eq!(
        ctx.scalar("SELECT ('2024-02-01'::datetime - '2024-01-01'::datetime).days"),
        r(31.0)
    );
}

#[test]
fn string_functions() {
    let mut ctx = ctx();
    assert_eq!(ctx.scalar("SELECT length('hello')"), i(5));
    assert_eq!(ctx.scalar("SELECT substr('hello', 2, 3)"), s("ell"));
    assert_eq!(ctx.scalar("SELECT concat('a', 1, NULL, 'b')"), s("a1b"));
    assert_eq!(ctx.scalar("SELECT maxwidth('abcdef', 3)"), s("abc"));
    assert_eq!(ctx.scalar("SELECT splitcomp('a/b/c', '/', 2)"), s("c"));
    assert_eq!(ctx.scalar("SELECT subst('a1b2', '[0-9]', '_')"), s("a_b_"));
    assert_eq!(ctx.scalar("SELECT findFirst('abc123', '[0-9]+')"), s("123"));
    assert_eq!(ctx.scalar("SELECT joinstr(['a', 'b'], '-')"), s("a-b"));
    assert_eq!(
        ctx.scalar("SELECT format('%s=%05.1f', 'pi', 3.14159)"),
        s("pi=003.1")
    );
    assert_eq!(
        ctx.scalar("SELECT to_char(1234.5, '9,999.99')"),
        s("1,234.50")
    );
}

#[test]
fn temporal_functions() {
    let mut ctx = ctx();
    assert_eq!(
        ctx.scalar("SELECT date_diff('day', '2024-01-01'::datetime, '2024-02-01'::datetime)"),
        i(31)
    );
    assert_eq!(
        ctx.scalar("SELECT date_trunc('month', '2024-03-15'::datetime)::string"),
        s("2024-03-01 00:00:00")
    );
    assert_eq!(
        ctx.scalar("SELECT date_part('quarter', '2024-08-01'::datetime)"),
        i(3)
    );
    assert_eq!(
        ctx.scalar("SELECT parse_date('05.03.2024', '%d.%m.%Y').month"),
        i(3)
    );
    assert_eq!(
        ctx.scalar(
            "SELECT date_bin('15 minutes'::interval, '2024-01-01 10:22:00'::datetime)::string"
        ),
        s("2024-01-01 10:15:00")
    );
}

#[test]
fn numeric_functions() {
    let mut ctx = ctx();
    assert_eq!(ctx.scalar("SELECT abs(-5)"), i(5));
    assert_eq!(ctx.scalar("SELECT round(1.2345)"), r(1.23));
    assert_eq!(ctx.scalar("SELECT round(1.2345, 3)"), r(1.235));
    assert_eq!(ctx.scalar("SELECT safediv(10, 0)"), i(0));
    assert_eq!(ctx.scalar("SELECT safediv(10, 4)"), i(2));
    assert_eq!(ctx.scalar("SELECT sqrt(-1)"), null());
}

#[test]
fn decimal_remainder_truncates_toward_zero() {
    let mut ctx = ctx();
    assert_eq!(
        ctx.scalar("SELECT ('-7'::numeric % '2'::numeric)::string"),
        s("-1")
    );
}

#[test]
fn not_supported_renders_signature() {
    let mut ctx = ctx();
    ctx.assert_error_contains("SELECT TRUE - '2024-01-01'::datetime", "-(boolean, datetime)");
}

#[test]
fn unknown_function_and_column() {
    let mut ctx = ctx();
    ctx.exec("CREATE TABLE t (a INTEGER)");
    ctx.assert_error_contains("SELECT frobnicate(1)", "unknown function frobnicate");
    ctx.assert_error_contains("SELECT b FROM t", "Column not found: b");
}

#[test]
fn timestamptz_zone() {
    let mut ctx = ctx();
    assert_eq!(
        ctx.scalar("SELECT timestamptz('2024-06-01 12:00:00', '+02:00')::string"),
        s("2024-06-01 14:00:00")
    );
    // The instant is unchanged, only the displayed offset moves.
    assert_eq!(
        ctx.scalar(
            "SELECT timestamptz('2024-06-01 12:00:00', '+02:00') = '2024-06-01 12:00:00'::datetime"
        ),
        Value::Boolean(true)
    );
}

#[test]
fn subscripts() {
    let mut ctx = ctx();
    assert_eq!(ctx.scalar("SELECT [1, 2, 3][1]"), i(2));
    assert_eq!(ctx.scalar("SELECT [1, 2, 3][9]"), null());
}

#[test]
fn constant_folding_of_impure_functions() {
    let mut ctx = ctx();
    // now() is not folded; two plans compiled at different times differ.
    assert!(matches!(ctx.scalar("SELECT now()"), Value::DateTime(_)));
    assert!(matches!(ctx.scalar("SELECT today()"), Value::DateTime(_)));
}
