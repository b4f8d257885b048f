//! Runtime values

use super::data_type::DataType;
use chrono::{DateTime, FixedOffset, Timelike};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A row of values.
pub type Row = Vec<Value>;

/// A dynamically tagged value. Equality is semantic: datetimes compare by
/// epoch milliseconds regardless of zone, decimals by numerical value
/// across the numeric types, collections elementwise.
#[derive(Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Decimal(Decimal),
    Boolean(bool),
    Str(String),
    DateTime(DateTime<FixedOffset>),
    Interval(Interval),
    List(Vec<Value>),
    Set(Vec<Value>),
}

/// A calendar+clock interval. Months and days are kept apart from the
/// sub-day part so that calendar arithmetic (adding a month lands on the
/// same day-of-month) stays exact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub micros: i64,
}

impl Interval {
    pub fn new(months: i32, days: i32, micros: i64) -> Self {
        Interval {
            months,
            days,
            micros,
        }
    }

    /// Approximate length in milliseconds, with 30-day months. Used for
    /// comparison and numeric coercion only, never for calendar arithmetic.
    pub fn as_millis(&self) -> i64 {
        (self.months as i64 * 30 + self.days as i64) * 86_400_000 + self.micros / 1_000
    }

    /// Fractional days (comparison/attribute use, 30-day months).
    pub fn as_days(&self) -> f64 {
        self.as_millis() as f64 / 86_400_000.0
    }
}

impl std::ops::Add for Interval {
    type Output = Interval;

    fn add(self, rhs: Interval) -> Interval {
        Interval {
            months: self.months + rhs.months,
            days: self.days + rhs.days,
            micros: self.micros + rhs.micros,
        }
    }
}

impl std::ops::Neg for Interval {
    type Output = Interval;

    fn neg(self) -> Interval {
        Interval {
            months: -self.months,
            days: -self.days,
            micros: -self.micros,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        let (years, months) = (self.months / 12, self.months % 12);
        if years != 0 {
            parts.push(format!("{} year{}", years, plural(years as i64)));
        }
        if months != 0 {
            parts.push(format!("{} month{}", months, plural(months as i64)));
        }
        if self.days != 0 {
            parts.push(format!("{} day{}", self.days, plural(self.days as i64)));
        }
        if self.micros != 0 || parts.is_empty() {
            let secs = self.micros / 1_000_000;
            let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
            let sub = self.micros % 1_000_000;
            if sub == 0 {
                parts.push(format!("{:02}:{:02}:{:02}", h, m, s));
            } else {
                parts.push(format!("{:02}:{:02}:{:02}.{:06}", h, m, s, sub));
            }
        }
        write!(f, "{}", parts.join(" "))
    }
}

fn plural(n: i64) -> &'static str {
    if n.abs() == 1 { "" } else { "s" }
}

impl Value {
    /// Builds a Real, normalizing NaN and infinities to Null.
    pub fn real(v: f64) -> Self {
        if v.is_finite() {
            Value::Real(v)
        } else {
            Value::Null
        }
    }

    pub fn integer(v: i64) -> Self {
        Value::Integer(v)
    }

    pub fn string(v: impl Into<String>) -> Self {
        Value::Str(v.into())
    }

    pub fn boolean(v: bool) -> Self {
        Value::Boolean(v)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Real(_) | Value::Decimal(_))
    }

    /// The type tag of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Integer(_) => DataType::Integer,
            Value::Real(_) => DataType::Real,
            Value::Decimal(_) => DataType::Decimal,
            Value::Boolean(_) => DataType::Boolean,
            Value::Str(_) => DataType::Str,
            Value::DateTime(_) => DataType::DateTime,
            Value::Interval(_) => DataType::Interval,
            Value::List(items) => DataType::List(Box::new(
                items
                    .first()
                    .map(|v| v.data_type())
                    .unwrap_or(DataType::Object),
            )),
            Value::Set(items) => DataType::List(Box::new(
                items
                    .first()
                    .map(|v| v.data_type())
                    .unwrap_or(DataType::Object),
            )),
        }
    }

    /// Truthiness for filter predicates: Some(true)/Some(false) for
    /// booleans, None for Null (three-valued logic), and a numeric
    /// zero-test for numbers.
    pub fn to_bool_opt(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Null => None,
            Value::Integer(n) => Some(*n != 0),
            Value::Real(n) => Some(*n != 0.0),
            Value::Decimal(d) => Some(!d.is_zero()),
            _ => None,
        }
    }

    /// Numeric view as Decimal, for cross-type comparison and accumulation.
    /// Reals convert via their shortest decimal representation, so 0.1
    /// becomes exactly 0.1.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Integer(n) => Some(Decimal::from(*n)),
            Value::Real(n) => Decimal::from_f64(*n),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Numeric view as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Real(n) => Some(*n),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => {
                a.timestamp_millis() == b.timestamp_millis()
            }
            (Value::Interval(a), Value::Interval(b)) => a.as_millis() == b.as_millis(),
            (Value::List(a) | Value::Set(a), Value::List(b) | Value::Set(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => {
                compare_numeric(a, b) == Ordering::Equal
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

/// Cross-type numeric comparison via Decimal, falling back to f64 for
/// values outside Decimal's range.
fn compare_numeric(a: &Value, b: &Value) -> Ordering {
    match (a.to_decimal(), b.to_decimal()) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => {
            let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;

        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,

            (Boolean(a), Boolean(b)) => a.cmp(b),

            (a, b) if a.is_numeric() && b.is_numeric() => compare_numeric(a, b),

            (Str(a), Str(b)) => a.cmp(b),

            (DateTime(a), DateTime(b)) => a.timestamp_millis().cmp(&b.timestamp_millis()),
            (Interval(a), Interval(b)) => a.as_millis().cmp(&b.as_millis()),

            (List(a), List(b)) | (Set(a), Set(b)) | (List(a), Set(b)) | (Set(a), List(b)) => {
                a.cmp(b)
            }

            // Different kinds get a stable arbitrary order by tag so sorts
            // over heterogeneous columns stay total.
            (a, b) => tag_rank(a).cmp(&tag_rank(b)),
        }
    }
}

fn tag_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Boolean(_) => 1,
        Value::Integer(_) | Value::Real(_) | Value::Decimal(_) => 2,
        Value::Str(_) => 3,
        Value::DateTime(_) => 4,
        Value::Interval(_) => 5,
        Value::List(_) => 6,
        Value::Set(_) => 7,
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Boolean(b) => b.hash(state),
            // Numerics hash through their Decimal normalization so that
            // Integer(2), Real(2.0) and Decimal(2.00) land in one bucket,
            // consistent with semantic equality.
            Value::Integer(_) | Value::Real(_) | Value::Decimal(_) => {
                match self.to_decimal() {
                    Some(d) => d.normalize().hash(state),
                    None => self.as_f64().unwrap_or(0.0).to_bits().hash(state),
                }
            }
            Value::Str(s) => s.hash(state),
            Value::DateTime(dt) => dt.timestamp_millis().hash(state),
            Value::Interval(i) => i.as_millis().hash(state),
            Value::List(items) | Value::Set(items) => {
                for item in items {
                    item.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Real(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::DateTime(dt) => {
                if dt.time().nanosecond() == 0 && dt.timestamp_subsec_millis() == 0 {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.3f"))
                }
            }
            Value::Interval(i) => write!(f, "{}", i),
            Value::List(items) | Value::Set(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Integer(n) => write!(f, "Integer({})", n),
            Value::Real(n) => write!(f, "Real({})", n),
            Value::Decimal(d) => write!(f, "Decimal({})", d),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::Str(s) => write!(f, "Str({})", s),
            Value::DateTime(dt) => write!(f, "DateTime({})", dt.to_rfc3339()),
            Value::Interval(i) => write!(f, "Interval({})", i),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Set(items) => {
                write!(f, "Set")?;
                f.debug_list().entries(items).finish()
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_normalizes_non_finite() {
        assert_eq!(Value::real(f64::NAN), Value::Null);
        assert_eq!(Value::real(f64::INFINITY), Value::Null);
        assert_eq!(Value::real(1.5), Value::Real(1.5));
    }

    #[test]
    fn test_semantic_numeric_equality() {
        assert_eq!(Value::Integer(2), Value::Real(2.0));
        assert_eq!(Value::Integer(2), Value::Decimal(Decimal::new(200, 2)));
        assert_ne!(Value::Integer(2), Value::Integer(3));
    }

    #[test]
    fn test_datetime_equality_ignores_zone() {
        let utc: DateTime<FixedOffset> = "2024-06-01T12:00:00+00:00".parse().unwrap();
        let cet: DateTime<FixedOffset> = "2024-06-01T14:00:00+02:00".parse().unwrap();
        assert_eq!(Value::DateTime(utc), Value::DateTime(cet));
    }

    #[test]
    fn test_null_sorts_first() {
        let mut values = vec![Value::Integer(1), Value::Null, Value::Integer(0)];
        values.sort();
        assert_eq!(values[0], Value::Null);
    }
}
