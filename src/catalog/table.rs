//! Tables, columns and constraints

use crate::error::{Error, Result};
use crate::functions::casts::type_for_name;
use crate::parsing::ast::Expression;
use crate::types::{DataType, Row, Value};
use serde_json::{Map, json};

/// An in-memory table: named columns, constraints, and the backing rows.
#[derive(Clone, Debug)]
pub struct Table {
    /// The table name. Unique within a catalog. Can't be empty.
    pub name: String,
    /// The table's columns. Must have at least one.
    pub columns: Vec<Column>,
    /// Columns selected by `*`. None means all columns.
    pub wildcard: Option<Vec<String>>,
    /// Row-level constraints checked on INSERT/UPDATE.
    pub constraints: Vec<Constraint>,
    /// The backing rows, positionally matching `columns`.
    pub rows: Vec<Row>,
}

/// A table column.
#[derive(Clone, Debug)]
pub struct Column {
    /// Column name. Can't be empty.
    pub name: String,
    pub data_type: DataType,
    /// Whether the column allows null values.
    pub nullable: bool,
    /// DEFAULT expression used when INSERT omits the column.
    pub default: Option<Expression>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Column {
            name: name.into(),
            data_type,
            nullable: true,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: Expression) -> Self {
        self.default = Some(default);
        self
    }
}

/// A row constraint. The expression is kept as SQL text and compiled against
/// the table's columns when a statement needs it, which also makes the JSON
/// round-trip trivial.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub name: String,
    /// The column a NOT NULL constraint guards, for error messages.
    pub column: Option<String>,
    /// Boolean SQL expression over the table's columns. Empty for NOT NULL
    /// constraints (which are checked structurally).
    pub expr: String,
}

impl Constraint {
    pub fn check(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Constraint {
            name: name.into(),
            column: None,
            expr: expr.into(),
        }
    }

    pub fn not_null(table: &str, column: &str) -> Self {
        Constraint {
            name: format!("{}_{}_not_null", table, column),
            column: Some(column.to_string()),
            expr: String::new(),
        }
    }

    pub fn is_not_null(&self) -> bool {
        self.expr.is_empty() && self.column.is_some()
    }
}

impl Table {
    /// Creates a new empty table.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidValue("table name cannot be empty".into()));
        }
        if columns.is_empty() {
            return Err(Error::InvalidValue(format!(
                "table {} must have at least one column",
                name
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(Error::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Table {
            name,
            columns,
            wildcard: None,
            constraints: Vec::new(),
            rows: Vec::new(),
        })
    }

    /// Restricts the wildcard column set selected by `*`.
    pub fn with_wildcard(mut self, columns: Vec<String>) -> Self {
        self.wildcard = Some(columns);
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    /// Returns the index and column for a name, if present.
    pub fn column(&self, name: &str) -> Option<(usize, &Column)> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.name == name)
    }

    /// The column names selected by `*`: the wildcard list when set, all
    /// columns otherwise.
    pub fn wildcard_columns(&self) -> Vec<String> {
        match &self.wildcard {
            Some(names) => names.clone(),
            None => self.columns.iter().map(|c| c.name.clone()).collect(),
        }
    }

    /// Builds a table from JSON records, inferring column types from the
    /// first non-null value seen per key. Key order of the first record
    /// decides column order.
    pub fn from_records(name: impl Into<String>, records: &serde_json::Value) -> Result<Self> {
        let name = name.into();
        let Some(records) = records.as_array() else {
            return Err(Error::InvalidValue(format!(
                "table {} model must be an array of records",
                name
            )));
        };

        let mut columns: Vec<Column> = Vec::new();
        for record in records {
            let Some(object) = record.as_object() else {
                return Err(Error::InvalidValue(format!(
                    "table {} rows must be objects",
                    name
                )));
            };
            for (key, value) in object {
                match columns.iter_mut().find(|c| c.name == *key) {
                    Some(column) => {
                        if column.data_type == DataType::Null {
                            column.data_type = infer_type(value);
                        }
                    }
                    None => columns.push(Column::new(key.clone(), infer_type(value))),
                }
            }
        }
        for column in &mut columns {
            if column.data_type == DataType::Null {
                column.data_type = DataType::Object;
            }
        }

        let mut table = Table::new(name, columns)?;
        let rows = records
            .iter()
            .map(|record| table.row_from_object(record))
            .collect::<Result<Vec<_>>>()?;
        table.rows = rows;
        Ok(table)
    }

    /// Converts a row-as-object into a positional row, coercing each value
    /// to its declared column type.
    pub fn row_from_object(&self, record: &serde_json::Value) -> Result<Row> {
        let Some(object) = record.as_object() else {
            return Err(Error::InvalidValue(format!(
                "table {} rows must be objects",
                self.name
            )));
        };
        self.columns
            .iter()
            .map(|column| {
                let value = object
                    .get(&column.name)
                    .map(value_from_json)
                    .unwrap_or(Value::Null);
                crate::coercion::coerce_value(value, &column.data_type)
            })
            .collect()
    }

    /// Serializes to the persisted model: column names with type names from
    /// the cast registry, constraints as text, rows as objects.
    pub fn to_json(&self) -> serde_json::Value {
        let columns: Vec<serde_json::Value> = self
            .columns
            .iter()
            .map(|c| json!({"name": c.name, "type": c.data_type.to_string()}))
            .collect();
        let constraints: Vec<serde_json::Value> = self
            .constraints
            .iter()
            .map(|c| {
                let mut object = Map::new();
                object.insert("name".into(), json!(c.name));
                if let Some(column) = &c.column {
                    object.insert("column".into(), json!(column));
                }
                if !c.expr.is_empty() {
                    object.insert("expr".into(), json!(c.expr));
                }
                serde_json::Value::Object(object)
            })
            .collect();
        let data: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|row| {
                let mut object = Map::new();
                for (column, value) in self.columns.iter().zip(row.iter()) {
                    object.insert(column.name.clone(), value_to_json(value));
                }
                serde_json::Value::Object(object)
            })
            .collect();
        json!({
            "name": self.name,
            "columns": columns,
            "constraints": constraints,
            "data": data,
        })
    }

    /// Loads a table from the persisted model, validating every row against
    /// the declared types and every constraint.
    pub fn from_json(model: &serde_json::Value) -> Result<Self> {
        let name = model
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidValue("table model is missing a name".into()))?;

        let columns = model
            .get("columns")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::InvalidValue("table model is missing columns".into()))?
            .iter()
            .map(|c| {
                let column_name = c
                    .get("name")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| Error::InvalidValue("column without a name".into()))?;
                let type_name = c.get("type").and_then(|v| v.as_str()).unwrap_or("any");
                let data_type = type_for_name(type_name).ok_or_else(|| {
                    Error::InvalidValue(format!("unknown column type '{}'", type_name))
                })?;
                Ok(Column::new(column_name, data_type))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut table = Table::new(name, columns)?;

        if let Some(constraints) = model.get("constraints").and_then(|v| v.as_array()) {
            for constraint in constraints {
                let cname = constraint
                    .get("name")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| Error::InvalidValue("constraint without a name".into()))?;
                let column = constraint
                    .get("column")
                    .and_then(|v| v.as_str())
                    .map(String::from);
                let expr = constraint
                    .get("expr")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                if expr.is_empty()
                    && let Some(index) =
                        column.as_ref().and_then(|c| table.column(c).map(|(i, _)| i))
                {
                    table.columns[index].nullable = false;
                }
                table.constraints.push(Constraint {
                    name: cname.to_string(),
                    column,
                    expr,
                });
            }
        }

        if let Some(data) = model.get("data").and_then(|v| v.as_array()) {
            let rows = data
                .iter()
                .map(|record| table.row_from_object(record))
                .collect::<Result<Vec<_>>>()?;
            table.rows = rows;
        }

        Ok(table)
    }
}

fn infer_type(value: &serde_json::Value) -> DataType {
    match value {
        serde_json::Value::Null => DataType::Null,
        serde_json::Value::Bool(_) => DataType::Boolean,
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => DataType::Integer,
        serde_json::Value::Number(_) => DataType::Real,
        serde_json::Value::String(_) => DataType::Str,
        serde_json::Value::Array(items) => DataType::List(Box::new(
            items.first().map(infer_type).unwrap_or(DataType::Object),
        )),
        serde_json::Value::Object(_) => DataType::Object,
    }
}

/// Converts a JSON value into an engine value.
pub fn value_from_json(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::real(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(value_from_json).collect()),
        serde_json::Value::Object(_) => Value::Null,
    }
}

/// Converts an engine value into JSON for the persisted model.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(n) => json!(n),
        Value::Real(n) => json!(n),
        Value::Decimal(d) => json!(d.to_string()),
        Value::Boolean(b) => json!(b),
        Value::Str(s) => json!(s),
        Value::DateTime(dt) => json!(dt.to_rfc3339()),
        Value::Interval(i) => json!(i.to_string()),
        Value::List(items) | Value::Set(items) => {
            serde_json::Value::Array(items.iter().map(value_to_json).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_records_infers_types() {
        let table = Table::from_records(
            "people",
            &json!([
                {"name": "ada", "age": 36, "score": 1.5},
                {"name": "bob", "age": null, "score": 2.0},
            ]),
        )
        .unwrap();
        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.column("age").unwrap().1.data_type, DataType::Integer);
        assert_eq!(table.column("score").unwrap().1.data_type, DataType::Real);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][1], Value::Null);
    }

    #[test]
    fn test_json_round_trip() {
        let table = Table::from_records("t", &json!([{"a": "x", "b": 1}]))
            .unwrap()
            .with_constraint(Constraint::check("t_b_check", "b > 0"));
        let restored = Table::from_json(&table.to_json()).unwrap();
        assert_eq!(restored.name, table.name);
        assert_eq!(restored.rows, table.rows);
        assert_eq!(restored.constraints, table.constraints);
        assert_eq!(
            restored
                .columns
                .iter()
                .map(|c| (&c.name, &c.data_type))
                .collect::<Vec<_>>(),
            table
                .columns
                .iter()
                .map(|c| (&c.name, &c.data_type))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let columns = vec![
            Column::new("a", DataType::Integer),
            Column::new("a", DataType::Str),
        ];
        assert!(Table::new("t", columns).is_err());
    }
}
