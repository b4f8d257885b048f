//! FROM and JOIN lowering

use super::expression_resolver::ExprState;
use super::plan::{EquiJoin, Expression, Source, SourceColumn};
use super::planner::{Planner, Scope, visible_columns};
use crate::error::{Error, Result};
use crate::parsing::ast::{self, FromClause, JoinType};

impl Planner<'_> {
    /// Lowers the FROM clause list. Comma-separated relations become CROSS
    /// joins; an empty FROM uses the catalog's default table when one is
    /// configured, and the single empty row otherwise.
    pub(super) fn plan_from(
        &mut self,
        from: &[FromClause],
        outer: Option<&Scope>,
    ) -> Result<Source> {
        if from.is_empty() {
            if let Some(name) = self.catalog.default_table() {
                let name = name.to_string();
                return self.scan_relation(&name, None);
            }
            return Ok(Source::Nothing);
        }
        let mut source = self.plan_from_item(&from[0], outer)?;
        for item in &from[1..] {
            let right = self.plan_from_item(item, outer)?;
            source = Source::Join {
                left: Box::new(source),
                right: Box::new(right),
                join_type: JoinType::Cross,
                predicate: None,
                equi: None,
            };
        }
        Ok(source)
    }

    fn plan_from_item(&mut self, item: &FromClause, outer: Option<&Scope>) -> Result<Source> {
        match item {
            FromClause::Table { name, alias } => self.scan_relation(name, alias.as_deref()),

            FromClause::Subquery { query, alias } => {
                let alias = alias.clone().ok_or_else(|| {
                    Error::CompileError("subquery in FROM requires an alias".into())
                })?;
                let plan = self.plan_select(query, None)?;
                let columns = visible_columns(&plan, &alias);
                Ok(Source::Subquery {
                    alias,
                    plan: Box::new(plan),
                    columns,
                })
            }

            FromClause::Join {
                left,
                right,
                join_type,
                on,
                using,
            } => {
                let left_source = self.plan_from_item(left, outer)?;
                let right_source = self.plan_from_item(right, outer)?;
                let mut join_type = *join_type;

                let left_scope = Scope {
                    columns: left_source.columns(),
                    parent: None,
                };
                let right_scope = Scope {
                    columns: right_source.columns(),
                    parent: None,
                };

                let mut equi = None;
                let mut predicate = None;

                if !using.is_empty() {
                    // USING (cols) is a conjunction of equalities on the
                    // named columns between the two sides.
                    let mut left_keys = Vec::new();
                    let mut right_keys = Vec::new();
                    for column in using {
                        let (li, _) = left_scope
                            .lookup_local(None, column)?
                            .ok_or_else(|| Error::ColumnNotFound(column.clone()))?;
                        let (ri, _) = right_scope
                            .lookup_local(None, column)?
                            .ok_or_else(|| Error::ColumnNotFound(column.clone()))?;
                        left_keys.push(Expression::Column(li));
                        right_keys.push(Expression::Column(ri));
                    }
                    equi = Some(EquiJoin {
                        left_keys,
                        right_keys,
                    });
                    if join_type == JoinType::Cross {
                        join_type = JoinType::Inner;
                    }
                } else if let Some(on) = on {
                    // CROSS JOIN with an ON condition is a filtered
                    // Cartesian product, i.e. an INNER JOIN.
                    if join_type == JoinType::Cross {
                        join_type = JoinType::Inner;
                    }
                    equi = self.try_equi_split(on, &left_scope, &right_scope)?;
                    if equi.is_none() {
                        let combined = Scope {
                            columns: {
                                let mut columns = left_scope.columns.clone();
                                columns.extend(right_scope.columns.clone());
                                columns
                            },
                            parent: outer,
                        };
                        let mut state = ExprState::new(Vec::new());
                        let (compiled, _) =
                            self.resolve_plain(on, &combined, &mut state, "JOIN")?;
                        predicate = Some(compiled);
                    }
                }

                Ok(Source::Join {
                    left: Box::new(left_source),
                    right: Box::new(right_source),
                    join_type,
                    predicate,
                    equi,
                })
            }
        }
    }

    /// Resolves a relation name: CTEs shadow catalog tables.
    fn scan_relation(&mut self, name: &str, alias: Option<&str>) -> Result<Source> {
        let qualifier = alias.unwrap_or(name).to_string();

        if let Some(cte) = self.cte(name) {
            let plan = cte.plan.clone();
            let columns = cte
                .columns
                .iter()
                .map(|c| SourceColumn {
                    qualifier: Some(qualifier.clone()),
                    ..c.clone()
                })
                .collect();
            return Ok(Source::Subquery {
                alias: qualifier,
                plan: Box::new(plan),
                columns,
            });
        }

        let table = self
            .catalog
            .table(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))?;
        let wildcard = table.wildcard_columns();
        let columns = table
            .columns
            .iter()
            .map(|c| SourceColumn {
                qualifier: Some(qualifier.clone()),
                name: c.name.clone(),
                data_type: c.data_type.clone(),
                in_wildcard: wildcard.iter().any(|w| w == &c.name),
            })
            .collect();
        Ok(Source::Scan {
            table: name.to_string(),
            alias: alias.map(String::from),
            columns,
        })
    }

    /// Splits an ON condition into hash-join keys when it is a conjunction
    /// of equalities between plain column references, one side each.
    /// Anything else falls back to the nested-loop path.
    fn try_equi_split(
        &mut self,
        on: &ast::Expression,
        left: &Scope,
        right: &Scope,
    ) -> Result<Option<EquiJoin>> {
        let mut pending = vec![on];
        let mut pairs = Vec::new();
        while let Some(expr) = pending.pop() {
            match expr {
                ast::Expression::Operator(ast::Operator::And(lhs, rhs)) => {
                    pending.push(lhs);
                    pending.push(rhs);
                }
                ast::Expression::Operator(ast::Operator::Equal(lhs, rhs)) => {
                    pairs.push((lhs.as_ref(), rhs.as_ref()));
                }
                _ => return Ok(None),
            }
        }

        let mut left_keys = Vec::new();
        let mut right_keys = Vec::new();
        for (a, b) in pairs {
            let Some((a_side, a_index)) = side_of(a, left, right)? else {
                return Ok(None);
            };
            let Some((b_side, b_index)) = side_of(b, left, right)? else {
                return Ok(None);
            };
            match (a_side, b_side) {
                (Side::Left, Side::Right) => {
                    left_keys.push(Expression::Column(a_index));
                    right_keys.push(Expression::Column(b_index));
                }
                (Side::Right, Side::Left) => {
                    left_keys.push(Expression::Column(b_index));
                    right_keys.push(Expression::Column(a_index));
                }
                _ => return Ok(None),
            }
        }
        Ok(Some(EquiJoin {
            left_keys,
            right_keys,
        }))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Side {
    Left,
    Right,
}

/// Resolves a plain column reference to exactly one join side.
fn side_of(
    expr: &ast::Expression,
    left: &Scope,
    right: &Scope,
) -> Result<Option<(Side, usize)>> {
    let ast::Expression::Column(qualifier, name) = expr else {
        return Ok(None);
    };
    let qualifier = qualifier.as_deref();
    // Ambiguity inside one side disqualifies the fast path; the nested-loop
    // resolver reports it properly.
    let in_left = left.lookup_local(qualifier, name).unwrap_or(None);
    let in_right = right.lookup_local(qualifier, name).unwrap_or(None);
    match (in_left, in_right) {
        (Some((index, _)), None) => Ok(Some((Side::Left, index))),
        (None, Some((index, _))) => Ok(Some((Side::Right, index))),
        _ => Ok(None),
    }
}
