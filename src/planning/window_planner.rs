//! Window attachment
//!
//! Window calls are resolved in two steps. While a target is being
//! resolved, the call's arguments, partition keys, order keys and frame are
//! compiled against the source scope and parked as a pending window; the
//! call site becomes a `WindowSlot`. Once all targets and key clauses are
//! lowered, each pending window's pieces are lowered onto target indices
//! (appending hidden targets as needed) so the window driver can run over
//! materialized intermediate rows.

use super::aggregate_planner::find_or_append;
use super::expression_resolver::{ExprState, PendingWindow};
use super::plan::{Bound, Expression, Frame, Target, WindowCall};
use super::planner::{Planner, Scope};
use crate::error::{Error, Result};
use crate::functions::Function;
use crate::parsing::ast::{self, FrameUnits};
use crate::types::{DataType, Value};

impl Planner<'_> {
    /// Resolves an aggregate call carrying an OVER clause into a pending
    /// window, returning its slot expression and result type.
    pub(super) fn resolve_window_call(
        &mut self,
        call: &ast::FunctionCall,
        function: &dyn Function,
        scope: &Scope,
        state: &mut ExprState,
    ) -> Result<(Expression, DataType)> {
        let over = call.over.as_ref().unwrap();

        // A reference to a named window overrides only the subfields
        // explicitly provided at the reference site.
        let spec = match &over.name {
            Some(name) => {
                let base = state
                    .named_windows
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, spec)| spec.clone())
                    .ok_or_else(|| {
                        Error::CompileError(format!("unknown window {}", name))
                    })?;
                over.spec.clone().merge_over(&base)
            }
            None => over.spec.clone(),
        };

        let star = matches!(call.args.as_slice(), [ast::Expression::All]);
        let mut args = Vec::new();
        let mut arg_types = Vec::new();
        if star {
            arg_types.push(DataType::Asterisk);
        } else {
            for arg in &call.args {
                let (expr, data_type) = self.resolve_expr(arg, scope, state)?;
                arg_types.push(data_type.clone());
                args.push((expr, data_type));
            }
        }
        let data_type = function.validate(&arg_types)?;

        let filter = match &call.filter {
            Some(predicate) => Some(self.resolve_expr(predicate, scope, state)?),
            None => None,
        };

        let partition_by = spec
            .partition_by
            .iter()
            .flatten()
            .map(|expr| self.resolve_expr(expr, scope, state))
            .collect::<Result<Vec<_>>>()?;

        let order_by = spec
            .order_by
            .iter()
            .flatten()
            .map(|(expr, direction, nulls)| {
                let (compiled, data_type) = self.resolve_expr(expr, scope, state)?;
                Ok((compiled, data_type, *direction, *nulls))
            })
            .collect::<Result<Vec<_>>>()?;

        let frame = match &spec.frame {
            Some(frame) => self.lower_frame(frame, scope)?,
            None => Frame::default_frame(),
        };

        // RANGE with an offset bound needs exactly one ORDER BY key of an
        // orderable-by-distance kind.
        if frame.units == FrameUnits::Range && frame.has_offset_bound() {
            if order_by.len() != 1 {
                return Err(Error::CompileError(
                    "RANGE with offset PRECEDING/FOLLOWING requires exactly one ORDER BY column"
                        .into(),
                ));
            }
            let key_type = &order_by[0].1;
            if !key_type.is_range_comparable() {
                return Err(Error::CompileError(format!(
                    "RANGE with offset PRECEDING/FOLLOWING is not supported for column type {}",
                    key_type
                )));
            }
        }

        state.pending_windows.push(PendingWindow {
            function: function.meta().name.to_string(),
            args,
            star,
            distinct: call.distinct,
            filter,
            partition_by,
            order_by,
            frame,
            data_type: data_type.clone(),
        });
        Ok((
            Expression::WindowSlot(state.pending_windows.len() - 1),
            data_type,
        ))
    }

    fn lower_frame(&mut self, frame: &ast::FrameSpec, scope: &Scope) -> Result<Frame> {
        Ok(Frame {
            units: frame.units,
            start: self.lower_bound(&frame.start, scope)?,
            end: self.lower_bound(&frame.end, scope)?,
            exclude: frame.exclude,
        })
    }

    /// Frame offsets must fold to constants at compile time.
    fn lower_bound(&mut self, bound: &ast::FrameBound, scope: &Scope) -> Result<Bound> {
        let fold_offset = |planner: &mut Self, expr: &ast::Expression| -> Result<Value> {
            let mut state = ExprState::new(Vec::new());
            let (compiled, _) = planner.resolve_plain(expr, scope, &mut state, "frame offset")?;
            match compiled {
                Expression::Constant(value) => Ok(value),
                other => Err(Error::CompileError(format!(
                    "frame offset must be a constant, got {}",
                    other
                ))),
            }
        };
        Ok(match bound {
            ast::FrameBound::UnboundedPreceding => Bound::UnboundedPreceding,
            ast::FrameBound::UnboundedFollowing => Bound::UnboundedFollowing,
            ast::FrameBound::CurrentRow => Bound::CurrentRow,
            ast::FrameBound::Preceding(expr) => Bound::Preceding(fold_offset(self, expr)?),
            ast::FrameBound::Following(expr) => Bound::Following(fold_offset(self, expr)?),
        })
    }

    /// Lowers every pending window's pieces onto target indices.
    pub(super) fn attach_windows(
        &mut self,
        targets: &mut Vec<Target>,
        state: &mut ExprState,
    ) -> Result<Vec<WindowCall>> {
        let pending = std::mem::take(&mut state.pending_windows);
        let mut windows = Vec::new();
        for window in pending {
            for (expr, _) in window.args.iter().chain(window.partition_by.iter()) {
                if contains_window_slot(expr) {
                    return Err(Error::CompileError(
                        "window functions cannot be nested".into(),
                    ));
                }
            }

            let index_of = |(expr, data_type): (Expression, DataType),
                            targets: &mut Vec<Target>| {
                let name = format!("w{}", targets.len());
                find_or_append(targets, expr, data_type, name)
            };

            let args = window
                .args
                .into_iter()
                .map(|arg| index_of(arg, targets))
                .collect();
            let filter = window.filter.map(|f| index_of(f, targets));
            let partition_by = window
                .partition_by
                .into_iter()
                .map(|key| index_of(key, targets))
                .collect();
            let order_by = window
                .order_by
                .into_iter()
                .map(|(expr, data_type, direction, nulls)| {
                    (index_of((expr, data_type), targets), direction, nulls)
                })
                .collect();

            windows.push(WindowCall {
                function: window.function,
                args,
                star: window.star,
                distinct: window.distinct,
                filter,
                partition_by,
                order_by,
                frame: window.frame,
                data_type: window.data_type,
            });
        }
        Ok(windows)
    }
}

fn contains_window_slot(expr: &Expression) -> bool {
    use Expression::*;
    match expr {
        WindowSlot(_) => true,
        Constant(_) | Column(_) | OuterColumn(..) | AggregateSlot(_) | ScalarSubquery(_) => false,
        Binary(_, lhs, rhs) => contains_window_slot(lhs) || contains_window_slot(rhs),
        Unary(_, e) | IsNull(e, _) => contains_window_slot(e),
        In { expr, list, .. } => {
            contains_window_slot(expr) || list.iter().any(contains_window_slot)
        }
        InSubquery { expr, .. } => contains_window_slot(expr),
        Between {
            expr, low, high, ..
        } => {
            contains_window_slot(expr)
                || contains_window_slot(low)
                || contains_window_slot(high)
        }
        Function(_, args) => args.iter().any(contains_window_slot),
        Case {
            operand,
            when_clauses,
            else_clause,
        } => {
            operand.as_deref().is_some_and(contains_window_slot)
                || when_clauses
                    .iter()
                    .any(|(w, t)| contains_window_slot(w) || contains_window_slot(t))
                || else_clause.as_deref().is_some_and(contains_window_slot)
        }
        MakeList(items) => items.iter().any(contains_window_slot),
        Subscript(base, index) => contains_window_slot(base) || contains_window_slot(index),
    }
}
