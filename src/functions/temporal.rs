//! Date and time functions

use super::{Function, FunctionMeta, FunctionRegistry};
use crate::coercion::temporal;
use crate::error::{Error, Result};
use crate::types::{DataType, Interval, Signature, Value};
use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};
use std::sync::Arc;

/// A single datetime field accessor (year, month, ...). These double as the
/// attribute resolvers for `dt.year` and `dt.*` expansion.
struct Extract {
    meta: &'static FunctionMeta,
    returns: DataType,
    extract: fn(&DateTime<FixedOffset>) -> Value,
}

impl Function for Extract {
    fn meta(&self) -> &FunctionMeta {
        self.meta
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::DateTime], self.returns.clone())]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        match &args[0] {
            Value::DateTime(dt) => Ok((self.extract)(dt)),
            v => Err(Error::TypeMismatch {
                expected: "datetime".into(),
                found: v.data_type().to_string(),
            }),
        }
    }
}

/// An interval field accessor (days, hours, ...), fractional.
struct IntervalPart {
    meta: &'static FunctionMeta,
    divisor: f64,
}

impl Function for IntervalPart {
    fn meta(&self) -> &FunctionMeta {
        self.meta
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Interval], DataType::Real)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        match &args[0] {
            Value::Interval(i) => Ok(Value::real(i.as_millis() as f64 / self.divisor)),
            v => Err(Error::TypeMismatch {
                expected: "interval".into(),
                found: v.data_type().to_string(),
            }),
        }
    }
}

struct Now;

impl Function for Now {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("now");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![], DataType::DateTime)]
    }

    fn execute(&self, _args: &[Value]) -> Result<Value> {
        Ok(Value::DateTime(Utc::now().fixed_offset()))
    }
}

struct Today;

impl Function for Today {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("today");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![], DataType::DateTime)]
    }

    fn execute(&self, _args: &[Value]) -> Result<Value> {
        temporal::truncate_datetime(Utc::now().fixed_offset(), "day")
    }
}

/// date_diff(unit, start, end): whole units between two datetimes.
struct DateDiff;

impl Function for DateDiff {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("date_diff");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Str, DataType::DateTime, DataType::DateTime],
            DataType::Integer,
        )]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let (Value::Str(unit), Value::DateTime(start), Value::DateTime(end)) =
            (&args[0], &args[1], &args[2])
        else {
            return Ok(Value::Null);
        };
        let millis = end.timestamp_millis() - start.timestamp_millis();
        let diff = match unit.to_lowercase().as_str() {
            "year" => (end.year() - start.year()) as i64,
            "quarter" => {
                (end.year() - start.year()) as i64 * 4
                    + (end.month0() / 3) as i64
                    - (start.month0() / 3) as i64
            }
            "month" => {
                (end.year() - start.year()) as i64 * 12 + end.month() as i64
                    - start.month() as i64
            }
            "week" => millis.div_euclid(7 * 86_400_000),
            "day" => millis.div_euclid(86_400_000),
            "hour" => millis.div_euclid(3_600_000),
            "minute" => millis.div_euclid(60_000),
            "second" => millis.div_euclid(1_000),
            unit => {
                return Err(Error::InvalidValue(format!(
                    "unknown datetime unit '{}'",
                    unit
                )));
            }
        };
        Ok(Value::Integer(diff))
    }
}

/// date_add(dt, interval) or date_add(dt, n, unit).
struct DateAdd;

impl Function for DateAdd {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("date_add");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(
                vec![DataType::DateTime, DataType::Interval],
                DataType::DateTime,
            ),
            Signature::new(
                vec![DataType::DateTime, DataType::Real, DataType::Str],
                DataType::DateTime,
            ),
        ]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let Value::DateTime(dt) = &args[0] else {
            return Ok(Value::Null);
        };
        let interval = match (args.get(1), args.get(2)) {
            (Some(Value::Interval(i)), None) => *i,
            (Some(n), Some(Value::Str(unit))) if n.is_numeric() => {
                unit_interval(n.as_f64().unwrap_or(0.0), unit)?
            }
            _ => return Ok(Value::Null),
        };
        temporal::datetime_add_interval(*dt, &interval)
    }
}

fn unit_interval(n: f64, unit: &str) -> Result<Interval> {
    Ok(match unit.to_lowercase().trim_end_matches('s') {
        "year" => Interval::new((n * 12.0) as i32, 0, 0),
        "quarter" => Interval::new((n * 3.0) as i32, 0, 0),
        "month" => Interval::new(n as i32, 0, 0),
        "week" => Interval::new(0, (n * 7.0) as i32, 0),
        "day" => Interval::new(0, n as i32, 0),
        "hour" => Interval::new(0, 0, (n * 3_600_000_000.0) as i64),
        "minute" => Interval::new(0, 0, (n * 60_000_000.0) as i64),
        "second" => Interval::new(0, 0, (n * 1_000_000.0) as i64),
        unit => {
            return Err(Error::InvalidValue(format!(
                "unknown datetime unit '{}'",
                unit
            )));
        }
    })
}

/// date_trunc(unit, dt): start of the containing unit.
struct DateTrunc;

impl Function for DateTrunc {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aliased("date_trunc", &["date_start"]);
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Str, DataType::DateTime],
            DataType::DateTime,
        )]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let (Value::Str(unit), Value::DateTime(dt)) = (&args[0], &args[1]) else {
            return Ok(Value::Null);
        };
        temporal::truncate_datetime(*dt, unit)
    }
}

/// date_end(unit, dt): last instant (millisecond) of the containing unit.
struct DateEnd;

impl Function for DateEnd {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aliased("date_end", &["date_trunc_end"]);
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Str, DataType::DateTime],
            DataType::DateTime,
        )]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let (Value::Str(unit), Value::DateTime(dt)) = (&args[0], &args[1]) else {
            return Ok(Value::Null);
        };
        let Value::DateTime(start) = temporal::truncate_datetime(*dt, unit)? else {
            return Ok(Value::Null);
        };
        let step = match unit.to_lowercase().as_str() {
            "year" => Interval::new(12, 0, 0),
            "quarter" => Interval::new(3, 0, 0),
            "month" => Interval::new(1, 0, 0),
            "week" => Interval::new(0, 7, 0),
            "day" => Interval::new(0, 1, 0),
            "hour" => Interval::new(0, 0, 3_600_000_000),
            "minute" => Interval::new(0, 0, 60_000_000),
            unit => {
                return Err(Error::InvalidValue(format!(
                    "unknown datetime unit '{}'",
                    unit
                )));
            }
        };
        let Value::DateTime(next) = temporal::datetime_add_interval(start, &step)? else {
            return Ok(Value::Null);
        };
        temporal::datetime_add_interval(next, &Interval::new(0, 0, -1_000))
    }
}

/// date_part(unit, dt): numeric field extraction.
struct DatePartFn;

impl Function for DatePartFn {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("date_part");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Str, DataType::DateTime],
            DataType::Integer,
        )]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let (Value::Str(unit), Value::DateTime(dt)) = (&args[0], &args[1]) else {
            return Ok(Value::Null);
        };
        Ok(match unit.to_lowercase().as_str() {
            "year" => Value::Integer(dt.year() as i64),
            "quarter" => Value::Integer((dt.month0() / 3 + 1) as i64),
            "month" => Value::Integer(dt.month() as i64),
            "week" => Value::Integer(dt.iso_week().week() as i64),
            "day" => Value::Integer(dt.day() as i64),
            "weekday" | "dow" => Value::Integer(dt.weekday().num_days_from_sunday() as i64),
            "hour" => Value::Integer(dt.hour() as i64),
            "minute" => Value::Integer(dt.minute() as i64),
            "second" => Value::Integer(dt.second() as i64),
            "epoch" => Value::Integer(dt.timestamp()),
            unit => {
                return Err(Error::InvalidValue(format!(
                    "unknown datetime unit '{}'",
                    unit
                )));
            }
        })
    }
}

/// date_bin(stride, dt, origin?): floors dt onto a stride grid anchored at
/// origin (the epoch when omitted).
struct DateBin;

impl Function for DateBin {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("date_bin");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(
                vec![DataType::Interval, DataType::DateTime],
                DataType::DateTime,
            ),
            Signature::new(
                vec![DataType::Interval, DataType::DateTime, DataType::DateTime],
                DataType::DateTime,
            ),
        ]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let (Value::Interval(stride), Value::DateTime(dt)) = (&args[0], &args[1]) else {
            return Ok(Value::Null);
        };
        let stride_millis = stride.as_millis();
        if stride_millis <= 0 {
            return Err(Error::InvalidValue("date_bin stride must be positive".into()));
        }
        let origin = match args.get(2) {
            Some(Value::DateTime(origin)) => origin.timestamp_millis(),
            _ => 0,
        };
        let offset = dt.timestamp_millis() - origin;
        let binned = origin + offset.div_euclid(stride_millis) * stride_millis;
        temporal::datetime_from_days(binned as f64 / 86_400_000.0)
    }
}

/// parse_date(str, fmt?): datetime parsing, with an explicit chrono format
/// when given.
struct ParseDate;

impl Function for ParseDate {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("parse_date");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Str], DataType::DateTime),
            Signature::new(vec![DataType::Str, DataType::Str], DataType::DateTime),
        ]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let Value::Str(s) = &args[0] else {
            return Ok(Value::Null);
        };
        let parsed = match args.get(1) {
            Some(Value::Str(fmt)) => temporal::parse_datetime_with_format(s, fmt),
            _ => temporal::parse_datetime(s),
        };
        Ok(parsed.unwrap_or(Value::Null))
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    static YEAR: FunctionMeta = FunctionMeta::scalar("year");
    static MONTH: FunctionMeta = FunctionMeta::scalar("month");
    static DAY: FunctionMeta = FunctionMeta::scalar("day");
    static QUARTER: FunctionMeta = FunctionMeta::scalar("quarter");
    static WEEKDAY: FunctionMeta = FunctionMeta::scalar("weekday");
    static YEARMONTH: FunctionMeta = FunctionMeta::scalar("yearmonth");
    static HOUR: FunctionMeta = FunctionMeta::scalar("hour");
    static MINUTE: FunctionMeta = FunctionMeta::scalar("minute");
    static SECOND: FunctionMeta = FunctionMeta::scalar("second");

    let extracts: Vec<Extract> = vec![
        Extract {
            meta: &YEAR,
            returns: DataType::Integer,
            extract: |dt| Value::Integer(dt.year() as i64),
        },
        Extract {
            meta: &MONTH,
            returns: DataType::Integer,
            extract: |dt| Value::Integer(dt.month() as i64),
        },
        Extract {
            meta: &DAY,
            returns: DataType::Integer,
            extract: |dt| Value::Integer(dt.day() as i64),
        },
        Extract {
            meta: &QUARTER,
            returns: DataType::Integer,
            extract: |dt| Value::Integer((dt.month0() / 3 + 1) as i64),
        },
        Extract {
            meta: &WEEKDAY,
            returns: DataType::Integer,
            extract: |dt| Value::Integer(dt.weekday().num_days_from_sunday() as i64),
        },
        Extract {
            meta: &YEARMONTH,
            returns: DataType::Str,
            extract: |dt| Value::Str(dt.format("%Y-%m").to_string()),
        },
        Extract {
            meta: &HOUR,
            returns: DataType::Integer,
            extract: |dt| Value::Integer(dt.hour() as i64),
        },
        Extract {
            meta: &MINUTE,
            returns: DataType::Integer,
            extract: |dt| Value::Integer(dt.minute() as i64),
        },
        Extract {
            meta: &SECOND,
            returns: DataType::Integer,
            extract: |dt| Value::Integer(dt.second() as i64),
        },
    ];
    for extract in extracts {
        registry.register(Arc::new(extract));
    }

    static DAYS: FunctionMeta = FunctionMeta::scalar("days");
    static HOURS: FunctionMeta = FunctionMeta::scalar("hours");
    static MINUTES: FunctionMeta = FunctionMeta::scalar("minutes");
    static SECONDS: FunctionMeta = FunctionMeta::scalar("seconds");
    let parts: Vec<IntervalPart> = vec![
        IntervalPart {
            meta: &DAYS,
            divisor: 86_400_000.0,
        },
        IntervalPart {
            meta: &HOURS,
            divisor: 3_600_000.0,
        },
        IntervalPart {
            meta: &MINUTES,
            divisor: 60_000.0,
        },
        IntervalPart {
            meta: &SECONDS,
            divisor: 1_000.0,
        },
    ];
    for part in parts {
        registry.register(Arc::new(part));
    }

    registry.register(Arc::new(Now));
    registry.register(Arc::new(Today));
    registry.register(Arc::new(DateDiff));
    registry.register(Arc::new(DateAdd));
    registry.register(Arc::new(DateTrunc));
    registry.register(Arc::new(DateEnd));
    registry.register(Arc::new(DatePartFn));
    registry.register(Arc::new(DateBin));
    registry.register(Arc::new(ParseDate));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::execute_function;

    fn dt(s: &str) -> Value {
        temporal::parse_datetime(s).unwrap()
    }

    #[test]
    fn test_extracts() {
        assert_eq!(
            execute_function("year", &[dt("2024-03-05")]).unwrap(),
            Value::Integer(2024)
        );
        assert_eq!(
            execute_function("quarter", &[dt("2024-07-01")]).unwrap(),
            Value::Integer(3)
        );
        assert_eq!(
            execute_function("yearmonth", &[dt("2024-03-05")]).unwrap(),
            Value::string("2024-03")
        );
    }

    #[test]
    fn test_date_diff_days() {
        assert_eq!(
            execute_function(
                "date_diff",
                &[Value::string("day"), dt("2024-01-01"), dt("2024-02-01")]
            )
            .unwrap(),
            Value::Integer(31)
        );
    }

    #[test]
    fn test_date_trunc_and_end() {
        assert_eq!(
            execute_function("date_trunc", &[Value::string("month"), dt("2024-03-15 12:00:00")])
                .unwrap()
                .to_string(),
            "2024-03-01 00:00:00"
        );
        assert_eq!(
            execute_function("date_end", &[Value::string("month"), dt("2024-03-15")])
                .unwrap()
                .to_string(),
            "2024-03-31 23:59:59.999"
        );
    }

    #[test]
    fn test_date_bin() {
        let stride = Value::Interval(Interval::new(0, 0, 15 * 60_000_000));
        assert_eq!(
            execute_function("date_bin", &[stride, dt("2024-01-01 10:22:00")])
                .unwrap()
                .to_string(),
            "2024-01-01 10:15:00"
        );
    }
}
