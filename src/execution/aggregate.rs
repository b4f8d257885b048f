//! Grouping and aggregation
//!
//! Groups input rows by the key tuple of the GROUP BY targets and runs one
//! accumulator per (group, aggregate handle). Accumulator state lives in a
//! slot vector per group, indexed by the handles the compiler allocated;
//! DISTINCT and FILTER are thin layers around the core accumulators.

use super::expression::{EvalContext, evaluate};
use crate::error::{Error, Result};
use crate::operators::{self, BinaryOp};
use crate::planning::{AggregateCall, QueryPlan};
use crate::types::{DataType, Row, Value};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;

/// A grouped (or pass-through) row: the representative input row plus the
/// finalized aggregate slot values.
pub struct Intermediate {
    pub row: Row,
    pub slots: Vec<Value>,
}

/// Runs the grouping stage. A grouped query over empty input with no group
/// keys emits exactly one row: the initialized-then-finalized empty
/// aggregates.
pub fn run(plan: &QueryPlan, input: Vec<Row>, ctx: &EvalContext) -> Result<Vec<Intermediate>> {
    let mut order: Vec<Vec<Value>> = Vec::new();
    let mut groups: HashMap<Vec<Value>, GroupState> = HashMap::new();

    for row in input {
        let mut key = Vec::with_capacity(plan.group_by.len());
        for &target in &plan.group_by {
            key.push(evaluate(&plan.targets[target].expr, Some(&row), ctx)?);
        }

        if !groups.contains_key(&key) {
            order.push(key.clone());
            groups.insert(
                key.clone(),
                GroupState {
                    accumulators: plan.aggregates.iter().map(new_accumulator).collect(),
                    representative: row.clone(),
                },
            );
        }
        let group = groups.get_mut(&key).unwrap();

        for (call, accumulator) in plan.aggregates.iter().zip(group.accumulators.iter_mut()) {
            if let Some(filter) = &call.filter {
                let keep = evaluate(filter, Some(&row), ctx)?
                    .to_bool_opt()
                    .unwrap_or(false);
                if !keep {
                    continue;
                }
            }
            if call.star {
                accumulator.update(&[])?;
            } else {
                let mut args = Vec::with_capacity(call.args.len());
                for arg in &call.args {
                    args.push(evaluate(arg, Some(&row), ctx)?);
                }
                accumulator.update(&args)?;
            }
        }
    }

    // No input but aggregates to report: one empty group.
    if groups.is_empty() && plan.group_by.is_empty() {
        let width = plan.source.columns().len();
        let accumulators: Vec<_> = plan.aggregates.iter().map(new_accumulator).collect();
        let slots = accumulators
            .into_iter()
            .map(|a| a.finalize())
            .collect::<Result<Vec<_>>>()?;
        return Ok(vec![Intermediate {
            row: vec![Value::Null; width],
            slots,
        }]);
    }

    let mut intermediates = Vec::with_capacity(order.len());
    for key in order {
        let group = groups.remove(&key).unwrap();
        let slots = group
            .accumulators
            .into_iter()
            .map(|a| a.finalize())
            .collect::<Result<Vec<_>>>()?;
        intermediates.push(Intermediate {
            row: group.representative,
            slots,
        });
    }
    Ok(intermediates)
}

struct GroupState {
    accumulators: Vec<Box<dyn Accumulator>>,
    representative: Row,
}

/// Running aggregate state. `update` receives the evaluated argument
/// values of one accepted input row; `finalize` produces the aggregate's
/// value.
pub trait Accumulator {
    fn update(&mut self, args: &[Value]) -> Result<()>;
    fn finalize(self: Box<Self>) -> Result<Value>;
}

/// Builds the accumulator for an aggregate call, wrapping it for DISTINCT.
pub fn new_accumulator(call: &AggregateCall) -> Box<dyn Accumulator> {
    let inner = base_accumulator(&call.function, &call.data_type);
    if call.distinct {
        Box::new(DistinctAccumulator {
            rows: Vec::new(),
            inner,
        })
    } else {
        inner
    }
}

/// Builds the per-frame accumulator for a window invocation.
pub fn window_accumulator(
    function: &str,
    distinct: bool,
    data_type: &DataType,
) -> Box<dyn Accumulator> {
    let inner = base_accumulator(function, data_type);
    if distinct {
        Box::new(DistinctAccumulator {
            rows: Vec::new(),
            inner,
        })
    } else {
        inner
    }
}

fn base_accumulator(function: &str, data_type: &DataType) -> Box<dyn Accumulator> {
    match function {
        "count" => Box::new(CountAccumulator { count: 0 }),
        "sum" => Box::new(SumAccumulator { sum: Value::Null }),
        "avg" => Box::new(AvgAccumulator {
            sum: Decimal::ZERO,
            count: 0,
            decimal: matches!(data_type, DataType::Decimal),
        }),
        "min" => Box::new(ExtremumAccumulator {
            value: Value::Null,
            keep_greater: false,
        }),
        "max" => Box::new(ExtremumAccumulator {
            value: Value::Null,
            keep_greater: true,
        }),
        "first" => Box::new(EdgeAccumulator {
            value: Value::Null,
            keep_first: true,
            seen: false,
        }),
        "last" => Box::new(EdgeAccumulator {
            value: Value::Null,
            keep_first: false,
            seen: false,
        }),
        "group_concat" => Box::new(GroupConcatAccumulator {
            parts: Vec::new(),
            separator: None,
        }),
        "array_agg" => Box::new(ArrayAggAccumulator { values: Vec::new() }),
        other => Box::new(UnsupportedAccumulator {
            function: other.to_string(),
        }),
    }
}

/// Materializes input tuples and dedupes on the first argument at finalize
/// time, then replays the survivors into the wrapped accumulator. NULLs
/// are excluded from the distinct set.
struct DistinctAccumulator {
    rows: Vec<Vec<Value>>,
    inner: Box<dyn Accumulator>,
}

impl Accumulator for DistinctAccumulator {
    fn update(&mut self, args: &[Value]) -> Result<()> {
        self.rows.push(args.to_vec());
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> Result<Value> {
        let mut seen: Vec<Value> = Vec::new();
        for row in std::mem::take(&mut self.rows) {
            let Some(first) = row.first() else { continue };
            if first.is_null() || seen.contains(first) {
                continue;
            }
            seen.push(first.clone());
            self.inner.update(&row)?;
        }
        self.inner.finalize()
    }
}

struct CountAccumulator {
    count: i64,
}

impl Accumulator for CountAccumulator {
    fn update(&mut self, args: &[Value]) -> Result<()> {
        // count(*) updates with no arguments and counts every row.
        if args.is_empty() || !args[0].is_null() {
            self.count += 1;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Ok(Value::Integer(self.count))
    }
}

struct SumAccumulator {
    sum: Value,
}

impl Accumulator for SumAccumulator {
    fn update(&mut self, args: &[Value]) -> Result<()> {
        let value = &args[0];
        if value.is_null() {
            return Ok(());
        }
        self.sum = if self.sum.is_null() {
            value.clone()
        } else {
            operators::execute_binary(BinaryOp::Add, &self.sum, value)?
        };
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Ok(self.sum)
    }
}

/// avg accumulates in Decimal regardless of the input kind and converts
/// back at finalize; empty input is NULL.
struct AvgAccumulator {
    sum: Decimal,
    count: i64,
    decimal: bool,
}

impl Accumulator for AvgAccumulator {
    fn update(&mut self, args: &[Value]) -> Result<()> {
        let value = &args[0];
        if value.is_null() {
            return Ok(());
        }
        let Some(decimal) = value.to_decimal() else {
            return Err(Error::TypeMismatch {
                expected: "numeric value".into(),
                found: value.data_type().to_string(),
            });
        };
        self.sum += decimal;
        self.count += 1;
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        if self.count == 0 {
            return Ok(Value::Null);
        }
        let average = self.sum / Decimal::from(self.count);
        if self.decimal {
            Ok(Value::Decimal(average))
        } else {
            Ok(average.to_f64().map(Value::real).unwrap_or(Value::Null))
        }
    }
}

struct ExtremumAccumulator {
    value: Value,
    keep_greater: bool,
}

impl Accumulator for ExtremumAccumulator {
    fn update(&mut self, args: &[Value]) -> Result<()> {
        let value = &args[0];
        if value.is_null() {
            return Ok(());
        }
        if self.value.is_null() || (value > &self.value) == self.keep_greater {
            self.value = value.clone();
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Ok(self.value)
    }
}

struct EdgeAccumulator {
    value: Value,
    keep_first: bool,
    seen: bool,
}

impl Accumulator for EdgeAccumulator {
    fn update(&mut self, args: &[Value]) -> Result<()> {
        let value = &args[0];
        if value.is_null() {
            return Ok(());
        }
        if !self.keep_first || !self.seen {
            self.value = value.clone();
            self.seen = true;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Ok(self.value)
    }
}

struct GroupConcatAccumulator {
    parts: Vec<String>,
    separator: Option<String>,
}

impl Accumulator for GroupConcatAccumulator {
    fn update(&mut self, args: &[Value]) -> Result<()> {
        if let Some(Value::Str(separator)) = args.get(1)
            && self.separator.is_none()
        {
            self.separator = Some(separator.clone());
        }
        let value = &args[0];
        if !value.is_null() {
            self.parts.push(value.to_string());
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        if self.parts.is_empty() {
            return Ok(Value::Null);
        }
        let separator = self.separator.unwrap_or_else(|| ",".to_string());
        Ok(Value::Str(self.parts.join(&separator)))
    }
}

struct ArrayAggAccumulator {
    values: Vec<Value>,
}

impl Accumulator for ArrayAggAccumulator {
    fn update(&mut self, args: &[Value]) -> Result<()> {
        self.values.push(args[0].clone());
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Ok(Value::List(self.values))
    }
}

struct UnsupportedAccumulator {
    function: String,
}

impl Accumulator for UnsupportedAccumulator {
    fn update(&mut self, _args: &[Value]) -> Result<()> {
        Err(Error::Internal(format!(
            "no accumulator for aggregate {}",
            self.function
        )))
    }

    fn finalize(self: Box<Self>) -> Result<Value> {
        Err(Error::Internal(format!(
            "no accumulator for aggregate {}",
            self.function
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_distinct_excludes_null() {
        let call = AggregateCall {
            function: "count".into(),
            args: vec![crate::planning::Expression::Column(0)],
            star: false,
            distinct: true,
            filter: None,
            data_type: DataType::Integer,
        };
        let mut accumulator = new_accumulator(&call);
        for value in [
            Value::Integer(1),
            Value::Integer(1),
            Value::Null,
            Value::Integer(2),
        ] {
            accumulator.update(&[value]).unwrap();
        }
        assert_eq!(accumulator.finalize().unwrap(), Value::Integer(2));
    }

    #[test]
    fn test_sum_empty_is_null() {
        let accumulator = base_accumulator("sum", &DataType::Integer);
        assert_eq!(accumulator.finalize().unwrap(), Value::Null);
    }

    #[test]
    fn test_avg_decimal_accumulation() {
        let mut accumulator = base_accumulator("avg", &DataType::Real);
        for value in [Value::Real(0.1), Value::Real(0.2)] {
            accumulator.update(&[value]).unwrap();
        }
        // Decimal accumulation avoids the float drift of (0.1 + 0.2) / 2.
        assert_eq!(accumulator.finalize().unwrap(), Value::Real(0.15));
    }

    #[test]
    fn test_group_concat_separator() {
        let mut accumulator = base_accumulator("group_concat", &DataType::Str);
        for value in ["a", "b", "c"] {
            accumulator
                .update(&[Value::string(value), Value::string(".")])
                .unwrap();
        }
        assert_eq!(accumulator.finalize().unwrap(), Value::string("a.b.c"));
    }
}
