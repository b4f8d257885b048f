//! String functions

use super::{Function, FunctionMeta, FunctionRegistry};
use crate::error::{Error, Result};
use crate::operators::compile_regex;
use crate::types::{DataType, Signature, Value};
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;

struct Length;

impl Function for Length {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("length");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Str], DataType::Integer),
            Signature::new(
                vec![DataType::List(Box::new(DataType::Object))],
                DataType::Integer,
            ),
        ]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        Ok(match &args[0] {
            Value::Str(s) => Value::Integer(s.chars().count() as i64),
            Value::List(items) | Value::Set(items) => Value::Integer(items.len() as i64),
            _ => Value::Null,
        })
    }
}

struct Upper;

impl Function for Upper {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("upper");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Str], DataType::Str)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        string_arg(&args[0]).map(|s| Value::Str(s.to_uppercase()))
    }
}

struct Lower;

impl Function for Lower {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("lower");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Str], DataType::Str)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        string_arg(&args[0]).map(|s| Value::Str(s.to_lowercase()))
    }
}

struct Trim;

impl Function for Trim {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("trim");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Str], DataType::Str)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        string_arg(&args[0]).map(|s| Value::Str(s.trim().to_string()))
    }
}

struct Reverse;

impl Function for Reverse {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("reverse");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Str], DataType::Str)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        string_arg(&args[0]).map(|s| Value::Str(s.chars().rev().collect()))
    }
}

/// substr(s, start, len?) with 1-based start like SQL.
struct Substr;

impl Function for Substr {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::aliased("substr", &["substring"]);
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Str, DataType::Integer], DataType::Str),
            Signature::new(
                vec![DataType::Str, DataType::Integer, DataType::Integer],
                DataType::Str,
            ),
        ]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let s = string_arg(&args[0])?;
        let chars: Vec<char> = s.chars().collect();
        let start = integer_arg(&args[1])?.max(1) as usize - 1;
        let len = match args.get(2) {
            Some(v) => integer_arg(v)?.max(0) as usize,
            None => chars.len().saturating_sub(start),
        };
        let taken: String = chars.iter().skip(start).take(len).collect();
        Ok(Value::Str(taken))
    }
}

/// concat(...) stringifies and joins every argument.
struct Concat;

impl Function for Concat {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("concat");
        &META
    }

    fn null_safe(&self) -> bool {
        // concat skips NULL arguments rather than nulling the whole call
        true
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![], DataType::Str).vararg(DataType::Object)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let mut out = String::new();
        for arg in args {
            if !arg.is_null() {
                out.push_str(&arg.to_string());
            }
        }
        Ok(Value::Str(out))
    }
}

/// replace(s, from, to): plain substring replacement.
struct Replace;

impl Function for Replace {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("replace");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Str, DataType::Str, DataType::Str],
            DataType::Str,
        )]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let (s, from, to) = (
            string_arg(&args[0])?,
            string_arg(&args[1])?,
            string_arg(&args[2])?,
        );
        Ok(Value::Str(s.replace(&from, &to)))
    }
}

/// maxwidth(s, n): truncates to at most n characters.
struct MaxWidth;

impl Function for MaxWidth {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("maxwidth");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Str, DataType::Integer],
            DataType::Str,
        )]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let s = string_arg(&args[0])?;
        let n = integer_arg(&args[1])?.max(0) as usize;
        Ok(Value::Str(s.chars().take(n).collect()))
    }
}

/// splitcomp(s, sep, i): the i-th component (0-based) after splitting on
/// sep, NULL when out of range.
struct SplitComp;

impl Function for SplitComp {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("splitcomp");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Str, DataType::Str, DataType::Integer],
            DataType::Str,
        )]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let s = string_arg(&args[0])?;
        let sep = string_arg(&args[1])?;
        let index = integer_arg(&args[2])?;
        if index < 0 {
            return Ok(Value::Null);
        }
        Ok(s.split(sep.as_str())
            .nth(index as usize)
            .map(|c| Value::Str(c.to_string()))
            .unwrap_or(Value::Null))
    }
}

/// grep(s, pattern): the lines of s matching the regex, joined by newlines.
struct Grep;

impl Function for Grep {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("grep");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Str, DataType::Str],
            DataType::Str,
        )]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let s = string_arg(&args[0])?;
        let regex = compile_regex(&string_arg(&args[1])?, false)?;
        let matching: Vec<&str> = s.lines().filter(|line| regex.is_match(line)).collect();
        Ok(Value::Str(matching.join("\n")))
    }
}

/// grepn(s, pattern): the number of lines matching the regex.
struct GrepN;

impl Function for GrepN {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("grepn");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Str, DataType::Str],
            DataType::Integer,
        )]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let s = string_arg(&args[0])?;
        let regex = compile_regex(&string_arg(&args[1])?, false)?;
        Ok(Value::Integer(
            s.lines().filter(|line| regex.is_match(line)).count() as i64,
        ))
    }
}

/// subst(s, pattern, replacement): regex substitution of all occurrences.
struct Subst;

impl Function for Subst {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("subst");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Str, DataType::Str, DataType::Str],
            DataType::Str,
        )]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let s = string_arg(&args[0])?;
        let regex = compile_regex(&string_arg(&args[1])?, false)?;
        let replacement = string_arg(&args[2])?;
        Ok(Value::Str(regex.replace_all(&s, replacement.as_str()).into_owned()))
    }
}

/// findFirst(s, pattern): the first regex match in s, NULL when none.
struct FindFirst;

impl Function for FindFirst {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("findFirst");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::Str, DataType::Str],
            DataType::Str,
        )]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let s = string_arg(&args[0])?;
        let regex = compile_regex(&string_arg(&args[1])?, false)?;
        Ok(regex
            .find(&s)
            .map(|m| Value::Str(m.as_str().to_string()))
            .unwrap_or(Value::Null))
    }
}

/// joinstr(list, sep): joins list elements into a string.
struct JoinStr;

impl Function for JoinStr {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("joinstr");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(
            vec![DataType::List(Box::new(DataType::Object)), DataType::Str],
            DataType::Str,
        )]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let (Value::List(items) | Value::Set(items)) = &args[0] else {
            return Ok(Value::Null);
        };
        let sep = string_arg(&args[1])?;
        let parts: Vec<String> = items
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
            .collect();
        Ok(Value::Str(parts.join(&sep)))
    }
}

/// format(fmt, args...): printf-like with `%[flag][width][.prec][dfsx]`.
struct Format;

impl Function for Format {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("format");
        &META
    }

    fn null_safe(&self) -> bool {
        true
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![Signature::new(vec![DataType::Str], DataType::Str).vararg(DataType::Object)]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let Value::Str(fmt) = &args[0] else {
            return Ok(Value::Null);
        };
        sprintf(fmt, &args[1..]).map(Value::Str)
    }
}

/// to_char(value, fmt): template formatting for numbers, datetimes and
/// intervals.
struct ToChar;

impl Function for ToChar {
    fn meta(&self) -> &FunctionMeta {
        static META: FunctionMeta = FunctionMeta::scalar("to_char");
        &META
    }

    fn overloads(&self) -> Vec<Signature> {
        vec![
            Signature::new(vec![DataType::Real, DataType::Str], DataType::Str),
            Signature::new(vec![DataType::Decimal, DataType::Str], DataType::Str),
            Signature::new(vec![DataType::DateTime, DataType::Str], DataType::Str),
            Signature::new(vec![DataType::Interval, DataType::Str], DataType::Str),
        ]
    }

    fn execute(&self, args: &[Value]) -> Result<Value> {
        let fmt = string_arg(&args[1])?;
        match &args[0] {
            Value::DateTime(dt) => {
                let translated = translate_datetime_template(&fmt);
                Ok(Value::Str(dt.format(&translated).to_string()))
            }
            Value::Interval(i) => Ok(Value::Str(i.to_string())),
            n if n.is_numeric() => Ok(Value::Str(format_number_template(
                n.as_f64().unwrap_or(0.0),
                &fmt,
            ))),
            _ => Ok(Value::Null),
        }
    }
}

fn string_arg(value: &Value) -> Result<String> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        v => Ok(v.to_string()),
    }
}

fn integer_arg(value: &Value) -> Result<i64> {
    match value {
        Value::Integer(n) => Ok(*n),
        Value::Real(n) => Ok(*n as i64),
        Value::Decimal(d) => Ok(d.to_i64().unwrap_or(0)),
        v => Err(Error::TypeMismatch {
            expected: "integer".into(),
            found: v.data_type().to_string(),
        }),
    }
}

/// Minimal printf: `%[-+0][width][.prec](d|f|s|x)` plus `%%`.
fn sprintf(fmt: &str, args: &[Value]) -> Result<String> {
    let mut out = String::new();
    let mut chars = fmt.chars().peekable();
    let mut next_arg = 0usize;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut left_align = false;
        let mut zero_pad = false;
        let mut plus = false;
        while let Some(&flag @ ('-' | '0' | '+')) = chars.peek() {
            match flag {
                '-' => left_align = true,
                '0' => zero_pad = true,
                '+' => plus = true,
                _ => unreachable!(),
            }
            chars.next();
        }

        let mut width = String::new();
        while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
            width.push(chars.next().unwrap());
        }
        let width: usize = width.parse().unwrap_or(0);

        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut prec = String::new();
            while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                prec.push(chars.next().unwrap());
            }
            precision = Some(prec.parse::<usize>().unwrap_or(0));
        }

        let conv = chars
            .next()
            .ok_or_else(|| Error::ExecutionError("dangling % in format string".into()))?;
        let arg = args.get(next_arg).cloned().unwrap_or(Value::Null);
        next_arg += 1;

        let rendered = match conv {
            'd' => {
                let n = arg.as_f64().unwrap_or(f64::NAN);
                if n.is_nan() {
                    "NULL".to_string()
                } else if plus && n >= 0.0 {
                    format!("+{}", n.trunc() as i64)
                } else {
                    format!("{}", n.trunc() as i64)
                }
            }
            'f' => {
                let n = arg.as_f64().unwrap_or(f64::NAN);
                let prec = precision.unwrap_or(6);
                if n.is_nan() {
                    "NULL".to_string()
                } else if plus && n >= 0.0 {
                    format!("+{:.*}", prec, n)
                } else {
                    format!("{:.*}", prec, n)
                }
            }
            's' => {
                let s = if arg.is_null() {
                    String::new()
                } else {
                    arg.to_string()
                };
                match precision {
                    Some(p) => s.chars().take(p).collect(),
                    None => s,
                }
            }
            'x' => format!("{:x}", arg.as_f64().unwrap_or(0.0).trunc() as i64),
            other => {
                return Err(Error::ExecutionError(format!(
                    "unknown format conversion %{}",
                    other
                )));
            }
        };

        if rendered.len() >= width {
            out.push_str(&rendered);
        } else if left_align {
            out.push_str(&rendered);
            out.extend(std::iter::repeat_n(' ', width - rendered.len()));
        } else {
            let pad = if zero_pad && matches!(conv, 'd' | 'f' | 'x') {
                '0'
            } else {
                ' '
            };
            out.extend(std::iter::repeat_n(pad, width - rendered.len()));
            out.push_str(&rendered);
        }
    }
    Ok(out)
}

/// Translates to_char datetime templates (YYYY, MM, DD, HH24, MI, SS, Mon,
/// Day) into chrono format directives.
fn translate_datetime_template(fmt: &str) -> String {
    let mut out = String::new();
    let mut rest = fmt;
    let table: &[(&str, &str)] = &[
        ("YYYY", "%Y"),
        ("HH24", "%H"),
        ("Mon", "%b"),
        ("Day", "%A"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("MI", "%M"),
        ("SS", "%S"),
    ];
    'outer: while !rest.is_empty() {
        for (token, directive) in table {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(directive);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        let c = chars.next().unwrap();
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

/// Applies a 9/0 digit-mask template with optional `,`, `.` and `$`.
fn format_number_template(value: f64, fmt: &str) -> String {
    let decimals = fmt
        .split_once('.')
        .map(|(_, frac)| frac.chars().filter(|c| *c == '9' || *c == '0').count())
        .unwrap_or(0);
    let grouped = fmt.contains(',');
    let currency = fmt.contains('$');

    let mut body = format!("{:.*}", decimals, value.abs());
    if grouped {
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i.to_string(), Some(f.to_string())),
            None => (body.clone(), None),
        };
        let mut with_sep = String::new();
        for (i, c) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                with_sep.push(',');
            }
            with_sep.push(c);
        }
        body = match frac_part {
            Some(f) => format!("{}.{}", with_sep, f),
            None => with_sep,
        };
    }
    let sign = if value < 0.0 { "-" } else { "" };
    if currency {
        format!("{}${}", sign, body)
    } else {
        format!("{}{}", sign, body)
    }
}

pub fn register(registry: &mut FunctionRegistry) {
    registry.register(Arc::new(Length));
    registry.register(Arc::new(Upper));
    registry.register(Arc::new(Lower));
    registry.register(Arc::new(Trim));
    registry.register(Arc::new(Reverse));
    registry.register(Arc::new(Substr));
    registry.register(Arc::new(Concat));
    registry.register(Arc::new(Replace));
    registry.register(Arc::new(MaxWidth));
    registry.register(Arc::new(SplitComp));
    registry.register(Arc::new(Grep));
    registry.register(Arc::new(GrepN));
    registry.register(Arc::new(Subst));
    registry.register(Arc::new(FindFirst));
    registry.register(Arc::new(JoinStr));
    registry.register(Arc::new(Format));
    registry.register(Arc::new(ToChar));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::execute_function;

    #[test]
    fn test_substr_one_based() {
        assert_eq!(
            execute_function(
                "substr",
                &[Value::string("peaql"), Value::Integer(2), Value::Integer(3)]
            )
            .unwrap(),
            Value::string("eaq")
        );
    }

    #[test]
    fn test_sprintf() {
        assert_eq!(
            sprintf("%05d|%.2f|%s", &[Value::Integer(42), Value::Real(3.14159), Value::string("x")])
                .unwrap(),
            "00042|3.14|x"
        );
        assert_eq!(sprintf("%-4d|", &[Value::Integer(7)]).unwrap(), "7   |");
    }

    #[test]
    fn test_splitcomp() {
        assert_eq!(
            execute_function(
                "splitcomp",
                &[Value::string("a/b/c"), Value::string("/"), Value::Integer(1)]
            )
            .unwrap(),
            Value::string("b")
        );
        assert_eq!(
            execute_function(
                "splitcomp",
                &[Value::string("a/b"), Value::string("/"), Value::Integer(9)]
            )
            .unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_subst_regex() {
        assert_eq!(
            execute_function(
                "subst",
                &[
                    Value::string("a1b2"),
                    Value::string("[0-9]"),
                    Value::string("_")
                ]
            )
            .unwrap(),
            Value::string("a_b_")
        );
    }

    #[test]
    fn test_to_char_number_mask() {
        assert_eq!(format_number_template(1234.5, "9,999.99"), "1,234.50");
        assert_eq!(format_number_template(-3.0, "$9.99"), "-$3.00");
    }

    #[test]
    fn test_to_char_datetime() {
        let Value::DateTime(dt) =
            crate::coercion::temporal::parse_datetime("2024-03-05 07:08:09").unwrap()
        else {
            panic!()
        };
        assert_eq!(
            execute_function("to_char", &[Value::DateTime(dt), Value::string("YYYY-MM-DD HH24:MI:SS")])
                .unwrap(),
            Value::string("2024-03-05 07:08:09")
        );
    }
}
