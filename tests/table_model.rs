//! Table model integration tests: type inference, JSON round-trip,
//! database construction

mod common;

use common::{TestContext, i, s};
use peaql::{Constraint, DataType, Table, create_database};
use serde_json::json;

#[test]
fn from_records_infers_and_queries() {
    let mut ctx = TestContext::new();
    let table = Table::from_records(
        "people",
        &json!([
            {"name": "ada", "age": 36},
            {"name": "bob", "age": 41},
            {"name": "cyd", "age": null},
        ]),
    )
    .unwrap();
    ctx.db.register(table).unwrap();

    assert_eq!(ctx.scalar("SELECT count(age) FROM people"), i(2));
    ctx.assert_rows(
        "SELECT name FROM people WHERE age > 40",
        vec![vec![s("bob")]],
    );
}

#[test]
fn json_round_trip_preserves_table() {
    let table = Table::from_records(
        "t",
        &json!([
            {"a": "x", "b": 1, "c": 1.5},
            {"a": "y", "b": 2, "c": 2.5},
        ]),
    )
    .unwrap()
    .with_constraint(Constraint::check("t_b_check", "(b > 0)"));

    let restored = Table::from_json(&table.to_json()).unwrap();
    assert_eq!(restored.name, table.name);
    assert_eq!(restored.rows, table.rows);
    assert_eq!(restored.constraints, table.constraints);
    for (a, b) in restored.columns.iter().zip(&table.columns) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.data_type, b.data_type);
    }
}

#[test]
fn round_tripped_constraints_are_enforced() {
    let table = Table::from_records("t", &json!([{"b": 5}]))
        .unwrap()
        .with_constraint(Constraint::check("t_b_check", "(b > 0)"));

    let mut ctx = TestContext::new();
    ctx.db
        .register(Table::from_json(&table.to_json()).unwrap())
        .unwrap();
    ctx.assert_count("INSERT INTO t VALUES (1)", 1);
    ctx.assert_error_contains("INSERT INTO t VALUES (-1)", "violates check constraint");
}

#[test]
fn load_validates_rows_against_types() {
    // A row value that cannot coerce to the declared column type fails the
    // load.
    let model = json!({
        "name": "t",
        "columns": [{"name": "a", "type": "integer"}],
        "constraints": [],
        "data": [{"a": "pear"}],
    });
    assert!(Table::from_json(&model).is_err());

    // Coercible values load fine.
    let model = json!({
        "name": "t",
        "columns": [{"name": "a", "type": "datetime"}],
        "constraints": [],
        "data": [{"a": "2024-03-05"}],
    });
    let table = Table::from_json(&model).unwrap();
    assert_eq!(table.rows.len(), 1);
}

#[test]
fn create_database_convenience() {
    let mut db = create_database(&json!({
        "users": [
            {"id": 1, "name": "ada"},
            {"id": 2, "name": "bob"},
        ],
        "orders": {"data": [
            {"id": 10, "user_id": 1, "amount": 250},
        ]},
    }))
    .unwrap();

    let result = db
        .execute(
            "SELECT name FROM users JOIN orders ON orders.user_id = users.id \
             WHERE amount > 100",
        )
        .unwrap();
    assert_eq!(result.rows().unwrap(), vec![vec![s("ada")]]);
}

#[test]
fn not_null_round_trip() {
    let model = json!({
        "name": "t",
        "columns": [{"name": "a", "type": "integer"}],
        "constraints": [{"name": "t_a_not_null", "column": "a"}],
        "data": [],
    });
    let table = Table::from_json(&model).unwrap();
    assert_eq!(table.columns[0].nullable, false);
    assert_eq!(table.columns[0].data_type, DataType::Integer);

    let mut ctx = TestContext::new();
    ctx.db.register(table).unwrap();
    ctx.assert_error_contains("INSERT INTO t VALUES (NULL)", "NULL constraint violation");
}
