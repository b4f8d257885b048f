//! The catalog: named tables, settings, statement preparation

mod statement;
mod table;

pub use statement::{Params, PreparedStatement};
pub use table::{Column, Constraint, Table, value_from_json, value_to_json};

use crate::error::{Error, Result};
use crate::execution::{self, ExecutionResult};
use crate::parsing::ast::{Literal, Statement};
use crate::parsing::Parser;
use crate::planning::{self, CompileOptions, Plan};
use crate::types::Value;
use lru::LruCache;
use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroUsize;

const PREPARE_CACHE_SIZE: usize = 256;

/// A catalog of tables plus the statement entry points: prepare, compile,
/// execute. The engine is single-threaded; a Context is not shared across
/// threads and the application owns any locking around it.
pub struct Context {
    tables: HashMap<String, Table>,
    default_table: Option<String>,
    prepare_cache: RefCell<LruCache<String, PreparedStatement>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Context {
    fn clone(&self) -> Self {
        Context {
            tables: self.tables.clone(),
            default_table: self.default_table.clone(),
            prepare_cache: RefCell::new(LruCache::new(
                NonZeroUsize::new(PREPARE_CACHE_SIZE).unwrap(),
            )),
        }
    }
}

impl Context {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Context {
            tables: HashMap::new(),
            default_table: None,
            prepare_cache: RefCell::new(LruCache::new(
                NonZeroUsize::new(PREPARE_CACHE_SIZE).unwrap(),
            )),
        }
    }

    /// Creates a catalog holding the given tables.
    pub fn with_tables(tables: impl IntoIterator<Item = Table>) -> Result<Self> {
        let mut context = Context::new();
        for table in tables {
            context.register(table)?;
        }
        Ok(context)
    }

    /// Selects the table used when a query omits FROM.
    pub fn with_default_table(mut self, name: impl Into<String>) -> Self {
        self.default_table = Some(name.into());
        self
    }

    /// Registers a table. The name must be free.
    pub fn register(&mut self, table: Table) -> Result<()> {
        if self.tables.contains_key(&table.name) {
            return Err(Error::DuplicateTable(table.name.clone()));
        }
        tracing::debug!(table = %table.name, rows = table.rows.len(), "registering table");
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub(crate) fn remove_table(&mut self, name: &str) -> Option<Table> {
        self.tables.remove(name)
    }

    /// The configured default table name, if any.
    pub fn default_table(&self) -> Option<&str> {
        self.default_table.as_deref()
    }

    /// Table names in the catalog.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(|s| s.as_str()).collect()
    }

    /// Parses statement text and harvests SET settings. Parse failures are
    /// collected on the prepared statement rather than returned; compiling
    /// a broken statement is what fails. Results are cached by text.
    pub fn prepare(&self, text: &str) -> PreparedStatement {
        if let Some(prepared) = self.prepare_cache.borrow_mut().get(text) {
            return prepared.clone();
        }

        let mut prepared = PreparedStatement {
            query: text.to_string(),
            ..PreparedStatement::default()
        };
        let mut parser = Parser::new(text);
        match parser.parse_all() {
            Ok(statements) => {
                for statement in statements {
                    match statement {
                        Statement::Set { name, value } => {
                            prepared.settings.insert(name, literal_value(value));
                        }
                        statement => prepared.statements.push(statement),
                    }
                }
            }
            Err(error) => prepared.parse_errors.push(error),
        }
        prepared.placeholders = parser.placeholders;

        tracing::debug!(
            statements = prepared.statements.len(),
            errors = prepared.parse_errors.len(),
            "prepared statement"
        );
        self.prepare_cache
            .borrow_mut()
            .put(text.to_string(), prepared.clone());
        prepared
    }

    /// Compiles a prepared statement against this catalog.
    pub fn compile(
        &self,
        prepared: &PreparedStatement,
        params: Option<&Params>,
        options: &CompileOptions,
    ) -> Result<Plan> {
        if !prepared.is_ok() {
            let rendered: Vec<String> = prepared
                .parse_errors
                .iter()
                .map(|e| e.to_string())
                .collect();
            return Err(Error::ParseError(rendered.join("; ")));
        }
        if let Some(params) = params {
            params.check(&prepared.placeholders)?;
        } else if prepared.placeholders.positional > 0 || prepared.placeholders.named {
            return Err(Error::ProgrammingError(
                "statement has placeholders but no parameters were given".into(),
            ));
        }

        match prepared.statements.as_slice() {
            // A SET-only statement is a valid no-op batch.
            [] if !prepared.settings.is_empty() => Ok(Plan::Batch(planning::BatchPlan {
                statements: Vec::new(),
                params: params.cloned(),
                options: options.clone(),
                settings: prepared.settings.clone(),
            })),
            [] => Err(Error::ProgrammingError("empty statement".into())),
            [statement] => planning::plan_statement(statement, self, params, options),
            statements => Ok(Plan::Batch(planning::BatchPlan {
                statements: statements.to_vec(),
                params: params.cloned(),
                options: options.clone(),
                settings: prepared.settings.clone(),
            })),
        }
    }

    /// Compiles statement text with default options.
    pub fn compile_text(&self, text: &str, params: Option<&Params>) -> Result<Plan> {
        let prepared = self.prepare(text);
        self.compile(&prepared, params, &CompileOptions::default())
    }

    /// Parses, compiles and executes statement text.
    pub fn execute(&mut self, text: &str) -> Result<ExecutionResult> {
        self.execute_with(text, None)
    }

    /// Parses, compiles and executes with parameters.
    pub fn execute_with(
        &mut self,
        text: &str,
        params: Option<&Params>,
    ) -> Result<ExecutionResult> {
        let prepared = self.prepare(text);
        self.execute_prepared(&prepared, params, &CompileOptions::default())
    }

    /// Compiles and executes a prepared statement.
    pub fn execute_prepared(
        &mut self,
        prepared: &PreparedStatement,
        params: Option<&Params>,
        options: &CompileOptions,
    ) -> Result<ExecutionResult> {
        let plan = self.compile(prepared, params, options)?;
        execution::execute_plan(&plan, self)
    }
}

fn literal_value(literal: Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Boolean(b) => Value::Boolean(b),
        Literal::Integer(n) => Value::Integer(n),
        Literal::Float(n) => Value::real(n),
        Literal::String(s) => Value::Str(s),
    }
}

/// Builds a catalog from per-table JSON models: each entry maps a table
/// name to either an array of records or `{"data": [...]}`.
pub fn create_database(models: &serde_json::Value) -> Result<Context> {
    let Some(models) = models.as_object() else {
        return Err(Error::InvalidValue(
            "database model must be an object of tables".into(),
        ));
    };
    let mut context = Context::new();
    for (name, model) in models {
        let records = match model {
            serde_json::Value::Array(_) => model,
            serde_json::Value::Object(object) => object
                .get("data")
                .ok_or_else(|| Error::InvalidValue(format!("table {} model has no data", name)))?,
            _ => {
                return Err(Error::InvalidValue(format!(
                    "table {} model must be an array or object",
                    name
                )));
            }
        };
        context.register(Table::from_records(name.clone(), records)?)?;
    }
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_collects_settings() {
        let context = Context::new();
        let prepared = context.prepare("SET identifier_quoting = backtick; SELECT 1");
        assert!(prepared.is_ok());
        assert_eq!(prepared.statements.len(), 1);
        assert_eq!(
            prepared.settings.get("identifier_quoting"),
            Some(&Value::string("backtick"))
        );
    }

    #[test]
    fn test_prepare_collects_parse_errors() {
        let context = Context::new();
        let prepared = context.prepare("SELECT $");
        assert!(!prepared.is_ok());
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut context = Context::new();
        let columns = vec![Column::new("a", crate::types::DataType::Integer)];
        context.register(Table::new("t", columns.clone()).unwrap()).unwrap();
        assert!(matches!(
            context.register(Table::new("t", columns).unwrap()),
            Err(Error::DuplicateTable(_))
        ));
    }
}
