//! Join integration tests

mod common;

use common::{TestContext, i, null, s};

fn setup() -> TestContext {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE users (id INTEGER, name STRING)");
    ctx.exec("INSERT INTO users VALUES (1, 'ada'), (2, 'bob'), (3, 'cyd')");
    ctx.exec("CREATE TABLE orders (id INTEGER, user_id INTEGER, amount INTEGER)");
    ctx.exec("INSERT INTO orders VALUES (10, 1, 100), (11, 1, 200), (12, 2, 150)");
    ctx
}

#[test]
fn inner_join_on() {
    let mut ctx = setup();
    ctx.assert_rows(
        "SELECT name, amount FROM users JOIN orders ON orders.user_id = users.id \
         ORDER BY amount",
        vec![
            vec![s("ada"), i(100)],
            vec![s("bob"), i(150)],
            vec![s("ada"), i(200)],
        ],
    );
}

#[test]
fn left_join_pads_with_nulls() {
    let mut ctx = setup();
    ctx.assert_rows(
        "SELECT name, amount FROM users LEFT JOIN orders ON orders.user_id = users.id \
         ORDER BY name, amount",
        vec![
            vec![s("ada"), i(100)],
            vec![s("ada"), i(200)],
            vec![s("bob"), i(150)],
            vec![s("cyd"), null()],
        ],
    );
}

#[test]
fn right_and_full_join() {
    let mut ctx = setup();
    ctx.exec("INSERT INTO orders VALUES (13, 99, 500)");
    ctx.assert_rows(
        "SELECT name, amount FROM users RIGHT JOIN orders ON orders.user_id = users.id \
         ORDER BY amount",
        vec![
            vec![s("ada"), i(100)],
            vec![s("bob"), i(150)],
            vec![s("ada"), i(200)],
            vec![null(), i(500)],
        ],
    );
    let rows = ctx.rows(
        "SELECT name, amount FROM users FULL JOIN orders ON orders.user_id = users.id",
    );
    // 4 matches/padded-left rows plus the unmatched user.
    assert_eq!(rows.len(), 5);
    assert!(rows.contains(&vec![s("cyd"), null()]));
    assert!(rows.contains(&vec![null(), i(500)]));
}

#[test]
fn anti_join_keeps_unmatched_left() {
    let mut ctx = setup();
    ctx.assert_rows(
        "SELECT name FROM users ANTI JOIN orders ON orders.user_id = users.id",
        vec![vec![s("cyd")]],
    );
}

#[test]
fn cross_join_and_comma_relations() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE a (x INTEGER)");
    ctx.exec("CREATE TABLE b (y INTEGER)");
    ctx.exec("INSERT INTO a VALUES (1), (2)");
    ctx.exec("INSERT INTO b VALUES (10), (20)");
    assert_eq!(ctx.rows("SELECT x, y FROM a CROSS JOIN b").len(), 4);
    assert_eq!(ctx.rows("SELECT x, y FROM a, b").len(), 4);
    // CROSS JOIN with an ON condition behaves like INNER JOIN.
    ctx.assert_rows(
        "SELECT x, y FROM a CROSS JOIN b ON b.y = a.x * 10",
        vec![vec![i(1), i(10)], vec![i(2), i(20)]],
    );
}

#[test]
fn join_using() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE l (id INTEGER, v STRING)");
    ctx.exec("CREATE TABLE r (id INTEGER, w STRING)");
    ctx.exec("INSERT INTO l VALUES (1, 'a'), (2, 'b')");
    ctx.exec("INSERT INTO r VALUES (2, 'x'), (3, 'y')");
    ctx.assert_rows(
        "SELECT v, w FROM l JOIN r USING (id)",
        vec![vec![s("b"), s("x")]],
    );
}

#[test]
fn hash_and_nested_loop_agree() {
    let mut ctx = setup();
    // The equi form takes the hash path; the rewritten form disqualifies
    // the split and goes through the nested loop. Same row bag either way.
    let mut hash = ctx.rows(
        "SELECT users.id, orders.id FROM users JOIN orders ON users.id = orders.user_id",
    );
    let mut nested = ctx.rows(
        "SELECT users.id, orders.id FROM users JOIN orders ON users.id + 0 = orders.user_id",
    );
    hash.sort();
    nested.sort();
    assert_eq!(hash, nested);
}

#[test]
fn null_keys_never_match() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE l (k INTEGER)");
    ctx.exec("CREATE TABLE r (k INTEGER)");
    ctx.exec("INSERT INTO l VALUES (1), (NULL)");
    ctx.exec("INSERT INTO r VALUES (1), (NULL)");
    ctx.assert_rows(
        "SELECT l.k, r.k FROM l JOIN r ON l.k = r.k",
        vec![vec![i(1), i(1)]],
    );
}

#[test]
fn multi_key_equi_join() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE l (a INTEGER, b INTEGER, v STRING)");
    ctx.exec("CREATE TABLE r (a INTEGER, b INTEGER, w STRING)");
    ctx.exec("INSERT INTO l VALUES (1, 1, 'x'), (1, 2, 'y')");
    ctx.exec("INSERT INTO r VALUES (1, 2, 'z'), (1, 3, 'q')");
    ctx.assert_rows(
        "SELECT v, w FROM l JOIN r ON l.a = r.a AND l.b = r.b",
        vec![vec![s("y"), s("z")]],
    );
}

#[test]
fn ambiguous_column_across_join() {
    let mut ctx = TestContext::new();
    ctx.exec("CREATE TABLE l (id INTEGER)");
    ctx.exec("CREATE TABLE r (id INTEGER)");
    ctx.exec("INSERT INTO l VALUES (1)");
    ctx.exec("INSERT INTO r VALUES (1)");
    ctx.assert_error_contains(
        "SELECT id FROM l JOIN r ON l.id = r.id",
        "Ambiguous column reference: id",
    );
}

#[test]
fn join_aliases() {
    let mut ctx = setup();
    ctx.assert_rows(
        "SELECT u.name FROM users u JOIN orders o ON o.user_id = u.id \
         WHERE o.amount > 150",
        vec![vec![s("ada")]],
    );
    // The original name is hidden behind the alias.
    ctx.assert_error_contains(
        "SELECT users.name FROM users u",
        "Column not found: users.name",
    );
}

#[test]
fn subquery_in_from() {
    let mut ctx = setup();
    ctx.assert_rows(
        "SELECT t.name FROM (SELECT name, id FROM users WHERE id < 3) t ORDER BY t.id DESC",
        vec![vec![s("bob")], vec![s("ada")]],
    );
    ctx.assert_error_contains(
        "SELECT * FROM (SELECT 1)",
        "subquery in FROM requires an alias",
    );
}
