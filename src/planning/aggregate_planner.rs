//! Target expansion and GROUP BY / ORDER BY / PIVOT BY lowering
//!
//! Group, order and pivot keys are "index or expression": a positive
//! integer literal is a 1-based reference into the visible target list; an
//! expression that structurally matches an existing target reuses its
//! index; anything else appends a hidden target.

use super::expression_resolver::ExprState;
use super::plan::{Expression, OrderKey, Target};
use super::planner::{Planner, Scope, contains_slot, derived_name};
use crate::error::{Error, Result};
use crate::parsing::ast::{self, Direction, NullOrder};
use crate::types::DataType;

impl Planner<'_> {
    /// Expands `*` and `t.*` targets into per-column references. `t.*` on a
    /// structured column expands to the structure's attribute list with
    /// fabricated `t.attr` names.
    pub(super) fn expand_targets(
        &mut self,
        targets: &[(ast::Expression, Option<String>)],
        scope: &Scope,
    ) -> Result<Vec<(ast::Expression, Option<String>)>> {
        let mut expanded = Vec::new();
        for (expr, alias) in targets {
            match expr {
                ast::Expression::All => {
                    if scope.columns.is_empty() {
                        return Err(Error::CompileError("* with no FROM clause".into()));
                    }
                    for column in scope.columns.iter().filter(|c| c.in_wildcard) {
                        expanded.push((
                            ast::Expression::Column(column.qualifier.clone(), column.name.clone()),
                            Some(column.name.clone()),
                        ));
                    }
                }
                ast::Expression::QualifiedAll(base) => {
                    self.expand_qualified_all(base, scope, &mut expanded)?;
                }
                _ => expanded.push((expr.clone(), alias.clone())),
            }
        }
        Ok(expanded)
    }

    fn expand_qualified_all(
        &mut self,
        base: &ast::Expression,
        scope: &Scope,
        expanded: &mut Vec<(ast::Expression, Option<String>)>,
    ) -> Result<()> {
        // `t.*` over a table or alias in scope.
        if let ast::Expression::Column(None, qualifier) = base
            && scope.has_qualifier(qualifier)
        {
            for column in scope
                .columns
                .iter()
                .filter(|c| c.qualifier.as_deref() == Some(qualifier) && c.in_wildcard)
            {
                expanded.push((
                    ast::Expression::Column(Some(qualifier.clone()), column.name.clone()),
                    Some(column.name.clone()),
                ));
            }
            return Ok(());
        }

        // `expr.*` over a structured value expands its attribute list.
        let mut probe = ExprState::new(Vec::new());
        let (_, base_type) = self.resolve_expr(base, scope, &mut probe)?;
        let attributes = base_type.attributes();
        if attributes.is_empty() {
            return Err(Error::CompileError(format!(
                "type {} has no expandable attributes",
                base_type
            )));
        }
        for (attribute, _) in attributes {
            expanded.push((
                ast::Expression::FieldAccess {
                    base: Box::new(base.clone()),
                    field: (*attribute).to_string(),
                },
                Some(format!("{}.{}", base, attribute)),
            ));
        }
        Ok(())
    }

    /// Lowers GROUP BY keys to target indices.
    pub(super) fn lower_group_by(
        &mut self,
        group_by: &[ast::Expression],
        targets: &mut Vec<Target>,
        scope: &Scope,
        state: &mut ExprState,
    ) -> Result<Vec<usize>> {
        let mut keys = Vec::new();
        for expr in group_by {
            let index = self.lower_key(expr, targets, scope, state, "GROUP BY")?;
            if contains_slot(&targets[index].expr) {
                return Err(Error::CompileError(
                    "aggregate functions are not allowed in GROUP BY".into(),
                ));
            }
            if !keys.contains(&index) {
                keys.push(index);
            }
        }
        Ok(keys)
    }

    /// Lowers ORDER BY keys to target indices with their directions.
    pub(super) fn lower_order_by(
        &mut self,
        order_by: &[(ast::Expression, Direction, Option<NullOrder>)],
        targets: &mut Vec<Target>,
        scope: &Scope,
        state: &mut ExprState,
    ) -> Result<Vec<OrderKey>> {
        order_by
            .iter()
            .map(|(expr, direction, nulls)| {
                let target = self.lower_key(expr, targets, scope, state, "ORDER BY")?;
                Ok(OrderKey {
                    target,
                    direction: *direction,
                    nulls: *nulls,
                })
            })
            .collect()
    }

    /// Lowers PIVOT BY to the two axis target indices. The group-key
    /// requirement on the second axis is checked by the caller once
    /// implicit group keys are in place.
    pub(super) fn lower_pivot(
        &mut self,
        pivot_by: &[ast::Expression],
        targets: &mut Vec<Target>,
        scope: &Scope,
        state: &mut ExprState,
    ) -> Result<Option<(usize, usize)>> {
        if pivot_by.is_empty() {
            return Ok(None);
        }
        if pivot_by.len() != 2 {
            return Err(Error::CompileError(format!(
                "PIVOT BY requires exactly two axes, got {}",
                pivot_by.len()
            )));
        }
        let a = self.lower_key(&pivot_by[0], targets, scope, state, "PIVOT BY")?;
        let b = self.lower_key(&pivot_by[1], targets, scope, state, "PIVOT BY")?;
        if a == b {
            return Err(Error::CompileError("PIVOT BY axes must differ".into()));
        }
        Ok(Some((a, b)))
    }

    /// The shared index-or-expression lowering.
    fn lower_key(
        &mut self,
        expr: &ast::Expression,
        targets: &mut Vec<Target>,
        scope: &Scope,
        state: &mut ExprState,
        clause: &'static str,
    ) -> Result<usize> {
        let visible = targets.iter().filter(|t| !t.hidden).count();

        // A positive integer literal is a 1-based target reference.
        if let ast::Expression::Literal(ast::Literal::Integer(i)) = expr {
            let i = *i;
            if i < 1 || i as usize > visible {
                return Err(Error::CompileError(format!(
                    "{} index {} is out of range (1..{})",
                    clause, i, visible
                )));
            }
            return Ok(i as usize - 1);
        }

        // A bare identifier matching an output alias refers to that target.
        if let ast::Expression::Column(None, name) = expr
            && scope.lookup_local(None, name)?.is_none()
            && let Some(index) = targets
                .iter()
                .position(|t| !t.hidden && t.name == *name)
        {
            return Ok(index);
        }

        let (compiled, data_type) = self.resolve_target(expr, scope, state)?;
        let name = derived_name(expr, targets.len());
        Ok(find_or_append(targets, compiled, data_type, name))
    }
}

/// Reuses a structurally equal target or appends a hidden one.
pub(super) fn find_or_append(
    targets: &mut Vec<Target>,
    expr: Expression,
    data_type: DataType,
    name: String,
) -> usize {
    if let Some(index) = targets
        .iter()
        .position(|t| t.expr.structurally_equals(&expr))
    {
        return index;
    }
    targets.push(Target {
        name,
        expr,
        data_type,
        hidden: true,
    });
    targets.len() - 1
}
