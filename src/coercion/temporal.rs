//! Temporal coercions: datetime parsing, interval parsing, calendar arithmetic

use crate::error::{Error, Result};
use crate::types::{Interval, Value};
use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parse a string into a DateTime value. Accepts ISO-8601 with an offset,
/// ISO date-times with `T` or space separators, bare dates, `MM/DD/YYYY`,
/// and `Mon DD, YYYY`. Zoneless inputs are taken as UTC.
pub fn parse_datetime(s: &str) -> Result<Value> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Value::DateTime(dt));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Ok(Value::DateTime(dt));
    }

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%m/%d/%Y %H:%M:%S"))
        .or_else(|_| parse_date_only(s));

    match naive {
        Ok(naive) => Ok(Value::DateTime(Utc.from_utc_datetime(&naive).fixed_offset())),
        Err(_) => Err(Error::InvalidValue(format!(
            "cannot parse '{}' as datetime",
            s
        ))),
    }
}

fn parse_date_only(s: &str) -> chrono::ParseResult<NaiveDateTime> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%b %d, %Y"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%B %d, %Y"))
        .map(|d| d.and_hms_opt(0, 0, 0).unwrap())
}

/// Parse with an explicit chrono-style format string, date-only formats
/// falling back to midnight.
pub fn parse_datetime_with_format(s: &str, fmt: &str) -> Result<Value> {
    let naive = NaiveDateTime::parse_from_str(s, fmt)
        .or_else(|_| NaiveDate::parse_from_str(s, fmt).map(|d| d.and_hms_opt(0, 0, 0).unwrap()))
        .map_err(|_| {
            Error::InvalidValue(format!("cannot parse '{}' with format '{}'", s, fmt))
        })?;
    Ok(Value::DateTime(Utc.from_utc_datetime(&naive).fixed_offset()))
}

/// Interpret a number as days since the epoch (used by DateTime<->Number
/// comparison coercion and `datetime + n`).
pub fn datetime_from_days(days: f64) -> Result<Value> {
    let millis = (days * 86_400_000.0) as i64;
    match Utc.timestamp_millis_opt(millis).single() {
        Some(dt) => Ok(Value::DateTime(dt.fixed_offset())),
        None => Err(Error::InvalidValue(format!(
            "{} days is out of datetime range",
            days
        ))),
    }
}

/// Re-zone an instant to a fixed offset given as `+HH:MM`, `-HH:MM`, `UTC`,
/// or a signed hour count. The instant is unchanged, only the displayed
/// offset moves.
pub fn with_zone(dt: DateTime<FixedOffset>, zone: &str) -> Result<Value> {
    let zone = zone.trim();
    let offset = if zone.eq_ignore_ascii_case("utc") || zone.eq_ignore_ascii_case("z") {
        FixedOffset::east_opt(0)
    } else if let Ok(hours) = zone.parse::<i32>() {
        FixedOffset::east_opt(hours * 3600)
    } else {
        parse_offset(zone)
    };
    match offset {
        Some(offset) => Ok(Value::DateTime(dt.with_timezone(&offset))),
        None => Err(Error::InvalidValue(format!("invalid time zone '{}'", zone))),
    }
}

fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let (sign, rest) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
        None => (rest.parse::<i32>().ok()?, 0),
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parse a string into an Interval. Accepts ISO-8601 durations
/// (`P1Y2M3DT4H5M6S`) and the verbose form (`1 year 2 months 3 days
/// 04:05:06`), including bare `HH:MM:SS` clock parts.
pub fn parse_interval(s: &str) -> Result<Value> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::InvalidValue("empty interval string".into()));
    }
    if s.starts_with('P') || s.starts_with('p') {
        return parse_iso_interval(s);
    }
    parse_verbose_interval(s)
}

fn parse_iso_interval(s: &str) -> Result<Value> {
    let bad = || Error::InvalidValue(format!("cannot parse '{}' as interval", s));
    let body = &s[1..];
    let (date_part, time_part) = match body.split_once(['T', 't']) {
        Some((d, t)) => (d, Some(t)),
        None => (body, None),
    };

    let mut interval = Interval::default();
    for (number, unit) in iso_components(date_part).ok_or_else(bad)? {
        match unit {
            'Y' => interval.months += (number * 12.0) as i32,
            'M' => interval.months += number as i32,
            'W' => interval.days += (number * 7.0) as i32,
            'D' => interval.days += number as i32,
            _ => return Err(bad()),
        }
    }
    if let Some(time_part) = time_part {
        for (number, unit) in iso_components(time_part).ok_or_else(bad)? {
            match unit {
                'H' => interval.micros += (number * 3_600_000_000.0) as i64,
                'M' => interval.micros += (number * 60_000_000.0) as i64,
                'S' => interval.micros += (number * 1_000_000.0) as i64,
                _ => return Err(bad()),
            }
        }
    }
    Ok(Value::Interval(interval))
}

fn iso_components(part: &str) -> Option<Vec<(f64, char)>> {
    let mut components = Vec::new();
    let mut number = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' || c == '-' {
            number.push(c);
        } else {
            components.push((number.parse().ok()?, c.to_ascii_uppercase()));
            number.clear();
        }
    }
    number.is_empty().then_some(components)
}

fn parse_verbose_interval(s: &str) -> Result<Value> {
    let bad = || Error::InvalidValue(format!("cannot parse '{}' as interval", s));
    let mut interval = Interval::default();
    let mut tokens = s.split_whitespace().peekable();

    while let Some(token) = tokens.next() {
        if token.contains(':') {
            interval.micros += parse_clock(token).ok_or_else(bad)?;
            continue;
        }
        let number: f64 = token.parse().map_err(|_| bad())?;
        let unit = tokens.next().ok_or_else(bad)?.to_lowercase();
        match unit.trim_end_matches('s') {
            "year" | "yr" | "y" => interval.months += (number * 12.0) as i32,
            "month" | "mon" => interval.months += number as i32,
            "week" | "w" => interval.days += (number * 7.0) as i32,
            "day" | "d" => interval.days += number as i32,
            "hour" | "hr" | "h" => interval.micros += (number * 3_600_000_000.0) as i64,
            "minute" | "min" => interval.micros += (number * 60_000_000.0) as i64,
            "second" | "sec" => interval.micros += (number * 1_000_000.0) as i64,
            "millisecond" | "m" => interval.micros += (number * 1_000.0) as i64,
            "microsecond" | "u" => interval.micros += number as i64,
            _ => return Err(bad()),
        }
    }
    Ok(Value::Interval(interval))
}

fn parse_clock(token: &str) -> Option<i64> {
    let negative = token.starts_with('-');
    let token = token.trim_start_matches('-');
    let parts: Vec<&str> = token.split(':').collect();
    let (h, m, s) = match parts.as_slice() {
        [h, m] => (h.parse::<i64>().ok()?, m.parse::<i64>().ok()?, 0.0),
        [h, m, s] => (
            h.parse::<i64>().ok()?,
            m.parse::<i64>().ok()?,
            s.parse::<f64>().ok()?,
        ),
        _ => return None,
    };
    let micros = h * 3_600_000_000 + m * 60_000_000 + (s * 1_000_000.0) as i64;
    Some(if negative { -micros } else { micros })
}

/// Calendar-aware `datetime + interval`. Months move the day-of-month
/// (clamping at month ends), then days and the sub-day part are added as
/// exact durations.
pub fn datetime_add_interval(dt: DateTime<FixedOffset>, interval: &Interval) -> Result<Value> {
    let with_months = if interval.months >= 0 {
        dt.checked_add_months(Months::new(interval.months as u32))
    } else {
        dt.checked_sub_months(Months::new(-interval.months as u32))
    };
    with_months
        .and_then(|d| d.checked_add_signed(Duration::days(interval.days as i64)))
        .and_then(|d| d.checked_add_signed(Duration::microseconds(interval.micros)))
        .map(Value::DateTime)
        .ok_or_else(|| Error::InvalidValue("datetime arithmetic out of range".into()))
}

/// `datetime - datetime`, as an interval of whole days plus a clock part.
pub fn datetime_difference(a: DateTime<FixedOffset>, b: DateTime<FixedOffset>) -> Value {
    let micros = (a.timestamp_micros() - b.timestamp_micros()) as i64;
    let days = micros.div_euclid(86_400_000_000);
    let rest = micros.rem_euclid(86_400_000_000);
    Value::Interval(Interval::new(0, days as i32, rest))
}

/// Truncate a datetime to the start of the given unit.
pub fn truncate_datetime(dt: DateTime<FixedOffset>, unit: &str) -> Result<Value> {
    let naive = dt.naive_utc();
    let date = naive.date();
    let truncated = match unit.to_lowercase().as_str() {
        "year" => date.with_month(1).and_then(|d| d.with_day(1)),
        "quarter" => {
            let month = (date.month0() / 3) * 3 + 1;
            date.with_month(month).and_then(|d| d.with_day(1))
        }
        "month" => date.with_day(1),
        "week" => {
            let weekday = date.weekday().num_days_from_monday() as i64;
            date.checked_sub_signed(Duration::days(weekday))
        }
        "day" => Some(date),
        "hour" => {
            let hour = chrono::Timelike::hour(&naive.time());
            return Ok(Value::DateTime(
                Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
                    .fixed_offset(),
            ));
        }
        "minute" => {
            let time = naive.time();
            let (hour, minute) = (
                chrono::Timelike::hour(&time),
                chrono::Timelike::minute(&time),
            );
            return Ok(Value::DateTime(
                Utc.from_utc_datetime(&date.and_hms_opt(hour, minute, 0).unwrap())
                    .fixed_offset(),
            ));
        }
        unit => {
            return Err(Error::InvalidValue(format!(
                "unknown datetime unit '{}'",
                unit
            )));
        }
    };
    match truncated {
        Some(date) => Ok(Value::DateTime(
            Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
                .fixed_offset(),
        )),
        None => Err(Error::InvalidValue("datetime truncation out of range".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_formats() {
        for input in [
            "2024-03-05",
            "2024-03-05 10:30:00",
            "2024-03-05T10:30:00",
            "2024-03-05T10:30:00+02:00",
            "03/05/2024",
            "Mar 5, 2024",
        ] {
            assert!(
                matches!(parse_datetime(input), Ok(Value::DateTime(_))),
                "failed to parse {}",
                input
            );
        }
        assert!(parse_datetime("yesterday-ish").is_err());
    }

    #[test]
    fn test_parse_iso_interval() {
        let v = parse_interval("P1Y2M3DT4H5M6S").unwrap();
        let Value::Interval(i) = v else { panic!() };
        assert_eq!(i.months, 14);
        assert_eq!(i.days, 3);
        assert_eq!(i.micros, (4 * 3600 + 5 * 60 + 6) * 1_000_000);
    }

    #[test]
    fn test_parse_verbose_interval() {
        let v = parse_interval("1 year 2 months 3 days 04:05:06").unwrap();
        let Value::Interval(i) = v else { panic!() };
        assert_eq!(i.months, 14);
        assert_eq!(i.days, 3);
        assert_eq!(i.micros, (4 * 3600 + 5 * 60 + 6) * 1_000_000);
    }

    #[test]
    fn test_calendar_month_add_clamps() {
        let Value::DateTime(jan31) = parse_datetime("2024-01-31").unwrap() else {
            panic!()
        };
        let Value::DateTime(feb) =
            datetime_add_interval(jan31, &Interval::new(1, 0, 0)).unwrap()
        else {
            panic!()
        };
        assert_eq!(feb.format("%Y-%m-%d").to_string(), "2024-02-29");
    }
}
