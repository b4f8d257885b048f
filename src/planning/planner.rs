//! Statement planning and compile scopes

use super::expression_resolver::ExprState;
use super::plan::*;
use crate::catalog::{Column, Constraint, Context, Params, Table};
use crate::error::{Error, Result};
use crate::functions::casts::type_for_name;
use crate::parsing::ast::{self, SelectStatement, Statement};
use crate::parsing::Parser;
use crate::types::{DataType, Value};
use std::collections::HashMap;

/// A CTE registered while planning the enclosing statement.
pub(super) struct CteEntry {
    pub plan: QueryPlan,
    pub columns: Vec<SourceColumn>,
}

/// A compile scope: the column layout names resolve against, linked to the
/// enclosing query's scope for correlated subqueries.
pub struct Scope<'a> {
    pub columns: Vec<SourceColumn>,
    pub parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    pub fn empty() -> Scope<'static> {
        Scope {
            columns: Vec::new(),
            parent: None,
        }
    }

    /// Resolves a column in this scope only. Ambiguous unqualified names
    /// across join sides are an error.
    pub fn lookup_local(
        &self,
        qualifier: Option<&str>,
        name: &str,
    ) -> Result<Option<(usize, DataType)>> {
        let mut found = None;
        for (i, column) in self.columns.iter().enumerate() {
            let qualifier_matches = match qualifier {
                Some(q) => column.qualifier.as_deref() == Some(q),
                None => true,
            };
            if qualifier_matches && column.name == name {
                if found.is_some() {
                    let rendered = match qualifier {
                        Some(q) => format!("{}.{}", q, name),
                        None => name.to_string(),
                    };
                    return Err(Error::AmbiguousColumn(rendered));
                }
                found = Some((i, column.data_type.clone()));
            }
        }
        Ok(found)
    }

    /// Whether a qualifier names a table/alias in this scope.
    pub fn has_qualifier(&self, qualifier: &str) -> bool {
        self.columns
            .iter()
            .any(|c| c.qualifier.as_deref() == Some(qualifier))
    }
}

/// The statement planner. Tracks CTE scopes and outer-reference counts for
/// the subquery cache.
pub struct Planner<'a> {
    pub catalog: &'a Context,
    pub params: Option<&'a Params>,
    pub options: &'a CompileOptions,
    pub(super) ctes: Vec<HashMap<String, CteEntry>>,
    pub(super) outer_refs: usize,
}

impl<'a> Planner<'a> {
    pub fn new(
        catalog: &'a Context,
        params: Option<&'a Params>,
        options: &'a CompileOptions,
    ) -> Self {
        Planner {
            catalog,
            params,
            options,
            ctes: Vec::new(),
            outer_refs: 0,
        }
    }

    pub fn plan_statement(&mut self, statement: &Statement) -> Result<Plan> {
        match statement {
            Statement::Select(select) => Ok(Plan::Query(self.plan_select(select, None)?)),
            Statement::Insert {
                table,
                columns,
                values,
                returning,
            } => self.plan_insert(table, columns.as_deref(), values, returning.as_deref()),
            Statement::Update {
                table,
                set,
                r#where,
                returning,
            } => self.plan_update(table, set, r#where.as_ref(), returning.as_deref()),
            Statement::CreateTable(create) => self.plan_create_table(create),
            Statement::Set { .. } => Err(Error::Internal(
                "SET statements are harvested during preparation".into(),
            )),
        }
    }

    pub(super) fn cte(&self, name: &str) -> Option<&CteEntry> {
        self.ctes.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Plans a SELECT, registering its CTEs first and marking the plan
    /// correlated when anything inside referenced an enclosing scope.
    pub fn plan_select(
        &mut self,
        select: &SelectStatement,
        outer: Option<&Scope>,
    ) -> Result<QueryPlan> {
        let refs_before = self.outer_refs;

        let mut frame = HashMap::new();
        for (name, query) in &select.with {
            let plan = self.plan_select(query, None)?;
            let columns = visible_columns(&plan, name);
            frame.insert(name.clone(), CteEntry { plan, columns });
        }
        self.ctes.push(frame);
        let result = self.plan_select_inner(select, outer);
        self.ctes.pop();

        let mut plan = result?;
        plan.correlated = self.outer_refs > refs_before;
        Ok(plan)
    }

    fn plan_select_inner(
        &mut self,
        select: &SelectStatement,
        outer: Option<&Scope>,
    ) -> Result<QueryPlan> {
        let source = self.plan_from(&select.from, outer)?;
        let scope = Scope {
            columns: source.columns(),
            parent: outer,
        };

        let mut state = ExprState::new(select.windows.clone());

        // WHERE runs before grouping, so aggregates and windows are
        // structural misuse there.
        let filter = match &select.r#where {
            Some(predicate) => {
                let (expr, _) = self.resolve_plain(predicate, &scope, &mut state, "WHERE")?;
                Some(expr)
            }
            None => None,
        };

        // Targets, with * expansion.
        let expanded = self.expand_targets(&select.select, &scope)?;
        let mut targets = Vec::new();
        for (index, (ast_expr, name)) in expanded.into_iter().enumerate() {
            let (expr, data_type) = self.resolve_target(&ast_expr, &scope, &mut state)?;
            let name = name.unwrap_or_else(|| derived_name(&ast_expr, index));
            targets.push(Target {
                name,
                expr,
                data_type,
                hidden: false,
            });
        }
        let visible = targets.len();

        // GROUP BY / HAVING / ORDER BY / PIVOT BY index-or-expression
        // lowering; may append hidden targets.
        let mut group_by =
            self.lower_group_by(&select.group_by, &mut targets, &scope, &mut state)?;

        let having = match &select.having {
            Some(expr) => {
                let (compiled, data_type) = self.resolve_target(expr, &scope, &mut state)?;
                targets.push(Target {
                    name: "having".into(),
                    expr: compiled,
                    data_type,
                    hidden: true,
                });
                Some(targets.len() - 1)
            }
            None => None,
        };

        let order_by = self.lower_order_by(&select.order_by, &mut targets, &scope, &mut state)?;
        let pivot = self.lower_pivot(&select.pivot_by, &mut targets, &scope, &mut state)?;

        // Window attachment: lower each pending window's arguments and keys
        // to target indices.
        let windows = self.attach_windows(&mut targets, &mut state)?;

        // A query groups iff any aggregate target exists or GROUP BY was
        // given. Every non-aggregate target must then be a group key; the
        // default mode silently adds missing keys.
        let grouped = !state.aggregates.is_empty() || !group_by.is_empty();
        if grouped {
            for (i, target) in targets.iter().enumerate() {
                if group_by.contains(&i) || contains_slot(&target.expr) {
                    continue;
                }
                if self.options.implicit_group_by {
                    group_by.push(i);
                } else {
                    return Err(Error::CompileError(format!(
                        "column {} must appear in the GROUP BY clause or be used in an aggregate",
                        target.name
                    )));
                }
            }
        }

        if let Some((_, b)) = pivot
            && !group_by.contains(&b)
        {
            return Err(Error::CompileError(
                "the second PIVOT BY axis must be a GROUP BY key".into(),
            ));
        }

        let limit = match &select.limit {
            Some(expr) => Some(self.fold_limit(expr, &scope)?),
            None => None,
        };

        let mut compound = Vec::new();
        for (op, rhs) in &select.compound {
            let rhs_plan = self.plan_select(rhs, outer)?;
            let rhs_visible = rhs_plan.targets.iter().filter(|t| !t.hidden).count();
            if rhs_visible != visible {
                return Err(Error::CompileError(format!(
                    "set operation operands have {} and {} columns",
                    visible, rhs_visible
                )));
            }
            compound.push((*op, rhs_plan));
        }

        Ok(QueryPlan {
            source,
            filter,
            targets,
            grouped,
            group_by,
            having,
            aggregates: state.aggregates,
            windows,
            order_by,
            pivot,
            distinct: select.distinct,
            limit,
            compound,
            correlated: false,
        })
    }

    fn fold_limit(&mut self, expr: &ast::Expression, scope: &Scope) -> Result<usize> {
        let mut state = ExprState::new(Vec::new());
        let (compiled, _) = self.resolve_plain(expr, scope, &mut state, "LIMIT")?;
        match compiled {
            Expression::Constant(Value::Integer(n)) if n >= 0 => Ok(n as usize),
            other => Err(Error::CompileError(format!(
                "LIMIT must be a non-negative integer constant, got {}",
                other
            ))),
        }
    }

    /// INSERT: resolve the column list, type-check each value row, compile
    /// defaults and constraints.
    fn plan_insert(
        &mut self,
        table_name: &str,
        columns: Option<&[String]>,
        values: &[Vec<ast::Expression>],
        returning: Option<&[(ast::Expression, Option<String>)]>,
    ) -> Result<Plan> {
        let table = self
            .catalog
            .table(table_name)
            .ok_or_else(|| Error::TableNotFound(table_name.to_string()))?;

        let column_indices: Vec<usize> = match columns {
            Some(names) => names
                .iter()
                .map(|name| {
                    table
                        .column(name)
                        .map(|(i, _)| i)
                        .ok_or_else(|| Error::ColumnNotFound(name.clone()))
                })
                .collect::<Result<_>>()?,
            None => (0..table.columns.len()).collect(),
        };

        let empty = Scope::empty();
        let mut rows = Vec::new();
        for row in values {
            if row.len() != column_indices.len() {
                return Err(Error::CompileError(format!(
                    "INSERT row has {} values for {} columns",
                    row.len(),
                    column_indices.len()
                )));
            }
            let mut compiled_row = Vec::new();
            for (value, &column_index) in row.iter().zip(&column_indices) {
                let column = &table.columns[column_index];
                let mut state = ExprState::new(Vec::new());
                let (compiled, data_type) =
                    self.resolve_plain(value, &empty, &mut state, "INSERT")?;
                check_assignable(&data_type, column)?;
                compiled_row.push(compiled);
            }
            rows.push(compiled_row);
        }

        let constraints = self.compile_constraints(table)?;
        let returning = self.compile_returning(table, returning)?;

        Ok(Plan::Insert(InsertPlan {
            table: table_name.to_string(),
            column_indices,
            defaults: self.compile_defaults(table)?,
            rows,
            constraints,
            returning,
        }))
    }

    /// UPDATE: validate assignments, compile the filter against the table
    /// layout.
    fn plan_update(
        &mut self,
        table_name: &str,
        set: &[(String, ast::Expression)],
        filter: Option<&ast::Expression>,
        returning: Option<&[(ast::Expression, Option<String>)]>,
    ) -> Result<Plan> {
        let table = self
            .catalog
            .table(table_name)
            .ok_or_else(|| Error::TableNotFound(table_name.to_string()))?;
        let scope = table_scope(table);

        let mut assignments = Vec::new();
        for (column_name, value) in set {
            let (column_index, column) = table
                .column(column_name)
                .ok_or_else(|| Error::ColumnNotFound(column_name.clone()))?;
            let mut state = ExprState::new(Vec::new());
            let (compiled, data_type) = self.resolve_plain(value, &scope, &mut state, "UPDATE")?;
            check_assignable(&data_type, column)?;
            assignments.push((column_index, compiled));
        }

        let filter = match filter {
            Some(predicate) => {
                let mut state = ExprState::new(Vec::new());
                let (compiled, _) = self.resolve_plain(predicate, &scope, &mut state, "WHERE")?;
                Some(compiled)
            }
            None => None,
        };

        let constraints = self.compile_constraints(table)?;
        let returning = self.compile_returning(table, returning)?;

        Ok(Plan::Update(UpdatePlan {
            table: table_name.to_string(),
            assignments,
            filter,
            constraints,
            returning,
        }))
    }

    /// CREATE TABLE: build the schema, lowering column options into
    /// constraints.
    fn plan_create_table(&mut self, create: &ast::CreateTable) -> Result<Plan> {
        if let Some(query) = &create.as_query {
            let plan = self.plan_select(query, None)?;
            let columns = plan
                .targets
                .iter()
                .filter(|t| !t.hidden)
                .map(|t| Column::new(t.name.clone(), t.data_type.clone()))
                .collect();
            let table = Table::new(create.name.clone(), columns)?;
            return Ok(Plan::CreateTable(CreateTablePlan {
                table,
                if_not_exists: create.if_not_exists,
                as_query: Some(plan),
            }));
        }

        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        for def in &create.columns {
            let base_type = type_for_name(&def.type_name).ok_or_else(|| {
                Error::CompileError(format!("unknown column type {}", def.type_name))
            })?;
            let data_type = if def.is_array {
                DataType::List(Box::new(base_type))
            } else {
                base_type
            };

            let mut column = Column::new(def.name.clone(), data_type.clone());
            if def.not_null || def.primary_key {
                column = column.not_null();
                constraints.push(Constraint::not_null(&create.name, &def.name));
            }
            if let Some(default) = &def.default {
                let mut state = ExprState::new(Vec::new());
                let empty = Scope::empty();
                let (_, default_type) =
                    self.resolve_plain(default, &empty, &mut state, "DEFAULT")?;
                if !data_type.accepts(&default_type)
                    && !crate::coercion::can_coerce(&default_type, &data_type)
                {
                    return Err(Error::TypeMismatch {
                        expected: data_type.to_string(),
                        found: default_type.to_string(),
                    });
                }
                column = column.with_default(default.clone());
            }
            if let Some(check) = &def.check {
                constraints.push(Constraint::check(
                    format!("{}_{}_check", create.name, def.name),
                    check.to_string(),
                ));
            }
            if def.unique {
                constraints.push(Constraint {
                    name: format!("{}_{}_key", create.name, def.name),
                    column: Some(def.name.clone()),
                    expr: String::new(),
                });
            }
            columns.push(column);
        }

        for constraint in &create.constraints {
            match constraint {
                ast::TableConstraint::Check { name, expr } => {
                    // Unnamed checks are named after the columns they
                    // reference: {table}_{col}_check.
                    let name = name
                        .clone()
                        .unwrap_or_else(|| check_name(&create.name, expr));
                    constraints.push(Constraint::check(name, expr.to_string()));
                }
                ast::TableConstraint::Unique { name, columns: cols }
                | ast::TableConstraint::PrimaryKey { name, columns: cols } => {
                    let kind = if matches!(constraint, ast::TableConstraint::Unique { .. }) {
                        "key"
                    } else {
                        "pkey"
                    };
                    let name = name
                        .clone()
                        .unwrap_or_else(|| format!("{}_{}_{}", create.name, cols.join("_"), kind));
                    constraints.push(Constraint {
                        name,
                        column: cols.first().cloned(),
                        expr: String::new(),
                    });
                }
                ast::TableConstraint::ForeignKey {
                    name,
                    columns: cols,
                    references,
                    ..
                } => {
                    let name = name.clone().unwrap_or_else(|| {
                        format!("{}_{}_fkey", create.name, cols.join("_"))
                    });
                    if self.catalog.table(references).is_none() && references != &create.name {
                        return Err(Error::TableNotFound(references.clone()));
                    }
                    constraints.push(Constraint {
                        name,
                        column: cols.first().cloned(),
                        expr: String::new(),
                    });
                }
            }
        }

        let mut table = Table::new(create.name.clone(), columns)?;
        table.constraints = constraints;

        // Validate check expressions against the finished schema now so a
        // broken CREATE TABLE fails at compile time.
        self.compile_constraints(&table)?;

        Ok(Plan::CreateTable(CreateTablePlan {
            table,
            if_not_exists: create.if_not_exists,
            as_query: None,
        }))
    }

    /// Compiles a table's constraints against its own column layout.
    pub(super) fn compile_constraints(&mut self, table: &Table) -> Result<Vec<CompiledConstraint>> {
        let scope = table_scope(table);
        let mut compiled = Vec::new();
        for constraint in &table.constraints {
            if constraint.is_not_null() {
                let column_name = constraint.column.as_ref().unwrap();
                let Some((index, _)) = table.column(column_name) else {
                    return Err(Error::ColumnNotFound(column_name.clone()));
                };
                compiled.push(CompiledConstraint {
                    name: constraint.name.clone(),
                    column: Some(index),
                    expr: None,
                });
                continue;
            }
            if constraint.expr.is_empty() {
                // UNIQUE/PRIMARY KEY/FOREIGN KEY metadata; carried, not
                // checked per row.
                continue;
            }
            let parsed = parse_constraint_expr(&constraint.expr)?;
            let mut state = ExprState::new(Vec::new());
            let (expr, _) = self.resolve_plain(&parsed, &scope, &mut state, "CHECK")?;
            compiled.push(CompiledConstraint {
                name: constraint.name.clone(),
                column: None,
                expr: Some(expr),
            });
        }
        Ok(compiled)
    }

    fn compile_defaults(&mut self, table: &Table) -> Result<Vec<Option<Expression>>> {
        let empty = Scope::empty();
        table
            .columns
            .iter()
            .map(|column| {
                column
                    .default
                    .as_ref()
                    .map(|default| {
                        let mut state = ExprState::new(Vec::new());
                        self.resolve_plain(default, &empty, &mut state, "DEFAULT")
                            .map(|(expr, _)| expr)
                    })
                    .transpose()
            })
            .collect()
    }

    fn compile_returning(
        &mut self,
        table: &Table,
        returning: Option<&[(ast::Expression, Option<String>)]>,
    ) -> Result<Option<Vec<Target>>> {
        let Some(returning) = returning else {
            return Ok(None);
        };
        let scope = table_scope(table);
        let expanded = self.expand_targets(returning, &scope)?;
        let mut targets = Vec::new();
        for (index, (ast_expr, name)) in expanded.into_iter().enumerate() {
            let mut state = ExprState::new(Vec::new());
            let (expr, data_type) =
                self.resolve_plain(&ast_expr, &scope, &mut state, "RETURNING")?;
            targets.push(Target {
                name: name.unwrap_or_else(|| derived_name(&ast_expr, index)),
                expr,
                data_type,
                hidden: false,
            });
        }
        Ok(Some(targets))
    }
}

/// The scope of a table's own columns (INSERT/UPDATE/constraints).
pub(super) fn table_scope(table: &Table) -> Scope<'static> {
    Scope {
        columns: table
            .columns
            .iter()
            .map(|c| SourceColumn {
                qualifier: Some(table.name.clone()),
                name: c.name.clone(),
                data_type: c.data_type.clone(),
                in_wildcard: true,
            })
            .collect(),
        parent: None,
    }
}

/// The visible output columns of a compiled query, qualified by an alias.
pub(super) fn visible_columns(plan: &QueryPlan, qualifier: &str) -> Vec<SourceColumn> {
    plan.targets
        .iter()
        .filter(|t| !t.hidden)
        .map(|t| SourceColumn {
            qualifier: Some(qualifier.to_string()),
            name: t.name.clone(),
            data_type: t.data_type.clone(),
            in_wildcard: true,
        })
        .collect()
}

fn parse_constraint_expr(text: &str) -> Result<ast::Expression> {
    let statement = Parser::parse(&format!("SELECT {}", text))?;
    match statement {
        Statement::Select(select) if select.select.len() == 1 => {
            Ok(select.select.into_iter().next().unwrap().0)
        }
        _ => Err(Error::CompileError(format!(
            "invalid constraint expression: {}",
            text
        ))),
    }
}

fn check_assignable(value_type: &DataType, column: &Column) -> Result<()> {
    if column.data_type.accepts(value_type)
        || matches!(value_type, DataType::Object)
        || crate::coercion::can_coerce(value_type, &column.data_type)
    {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            expected: column.data_type.to_string(),
            found: value_type.to_string(),
        })
    }
}

/// Generates the conventional name of an unnamed check constraint from the
/// columns its expression references.
fn check_name(table: &str, expr: &ast::Expression) -> String {
    let mut columns: Vec<String> = Vec::new();
    expr.walk(&mut |node| {
        if let ast::Expression::Column(_, name) = node
            && !columns.contains(name)
        {
            columns.push(name.clone());
        }
        true
    });
    if columns.is_empty() {
        format!("{}_check", table)
    } else {
        format!("{}_{}_check", table, columns.join("_"))
    }
}

/// Whether a compiled expression contains an aggregate or window slot.
pub(super) fn contains_slot(expr: &Expression) -> bool {
    use Expression::*;
    match expr {
        AggregateSlot(_) | WindowSlot(_) => true,
        Constant(_) | Column(_) | OuterColumn(..) => false,
        Binary(_, lhs, rhs) => contains_slot(lhs) || contains_slot(rhs),
        Unary(_, e) | IsNull(e, _) => contains_slot(e),
        In { expr, list, .. } => contains_slot(expr) || list.iter().any(contains_slot),
        InSubquery { expr, .. } => contains_slot(expr),
        Between {
            expr, low, high, ..
        } => contains_slot(expr) || contains_slot(low) || contains_slot(high),
        Function(_, args) => args.iter().any(contains_slot),
        Case {
            operand,
            when_clauses,
            else_clause,
        } => {
            operand.as_deref().is_some_and(contains_slot)
                || when_clauses
                    .iter()
                    .any(|(w, t)| contains_slot(w) || contains_slot(t))
                || else_clause.as_deref().is_some_and(contains_slot)
        }
        MakeList(items) => items.iter().any(contains_slot),
        Subscript(base, index) => contains_slot(base) || contains_slot(index),
        ScalarSubquery(_) => false,
    }
}

/// Derives an output column name from a target expression.
pub(super) fn derived_name(expr: &ast::Expression, index: usize) -> String {
    match expr {
        ast::Expression::Column(_, name) => name.clone(),
        ast::Expression::FieldAccess { base, field } => match base.as_ref() {
            ast::Expression::Column(None, q) => format!("{}.{}", q, field),
            _ => field.clone(),
        },
        ast::Expression::Function(call) => call.name.clone(),
        ast::Expression::Method { name, .. } => name.clone(),
        ast::Expression::Cast { expr, .. } => derived_name(expr, index),
        _ => format!("column_{}", index),
    }
}
