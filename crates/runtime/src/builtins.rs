//! Built-in handler implementations (§4.4, §6): the runtime half of the
//! registry whose `{id, name, arity}` metadata lives in `nova_core`. Each
//! function here takes the already-popped argument slice, in call order,
//! and returns the single value the caller pushes back — `Vm::call_builtin`
//! owns popping, the one-push contract, and anything that touches VM state
//! (`print`/`printf`'s writer, `input`/`readLine`'s reader, `exit`'s halt
//! flag, `assert`'s diagnostic).
//!
//! `substr` is `(s, start, len?)`; `strReplace` replaces all occurrences;
//! `strSplit` returns the token count, pending array support (§6).

use nova_core::Value;
use std::io::BufRead;

pub(crate) fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn arg(args: &[Value], i: usize) -> &Value {
    args.get(i).unwrap_or(&Value::Null)
}

pub fn abs(args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::Int(n) => Value::Int(n.wrapping_abs()),
        Value::Float(f) => Value::Float(f.abs()),
        _ => Value::Null,
    }
}

pub fn sqrt(args: &[Value]) -> Value {
    as_f64(arg(args, 0)).map(|f| Value::Float(f.sqrt())).unwrap_or(Value::Null)
}

pub fn pow(args: &[Value]) -> Value {
    match (as_f64(arg(args, 0)), as_f64(arg(args, 1))) {
        (Some(base), Some(exp)) => Value::Float(base.powf(exp)),
        _ => Value::Null,
    }
}

pub fn sin(args: &[Value]) -> Value {
    as_f64(arg(args, 0)).map(|f| Value::Float(f.sin())).unwrap_or(Value::Null)
}

pub fn cos(args: &[Value]) -> Value {
    as_f64(arg(args, 0)).map(|f| Value::Float(f.cos())).unwrap_or(Value::Null)
}

pub fn tan(args: &[Value]) -> Value {
    as_f64(arg(args, 0)).map(|f| Value::Float(f.tan())).unwrap_or(Value::Null)
}

pub fn floor(args: &[Value]) -> Value {
    as_f64(arg(args, 0)).map(|f| Value::Float(f.floor())).unwrap_or(Value::Null)
}

pub fn ceil(args: &[Value]) -> Value {
    as_f64(arg(args, 0)).map(|f| Value::Float(f.ceil())).unwrap_or(Value::Null)
}

pub fn round(args: &[Value]) -> Value {
    as_f64(arg(args, 0)).map(|f| Value::Float(f.round())).unwrap_or(Value::Null)
}

pub fn max(args: &[Value]) -> Value {
    match (arg(args, 0), arg(args, 1)) {
        (Value::Int(a), Value::Int(b)) => Value::Int((*a).max(*b)),
        _ => match (as_f64(arg(args, 0)), as_f64(arg(args, 1))) {
            (Some(a), Some(b)) => Value::Float(a.max(b)),
            _ => Value::Null,
        },
    }
}

pub fn min(args: &[Value]) -> Value {
    match (arg(args, 0), arg(args, 1)) {
        (Value::Int(a), Value::Int(b)) => Value::Int((*a).min(*b)),
        _ => match (as_f64(arg(args, 0)), as_f64(arg(args, 1))) {
            (Some(a), Some(b)) => Value::Float(a.min(b)),
            _ => Value::Null,
        },
    }
}

pub fn str_len(args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::String(s) => Value::Int(s.len() as i64),
        _ => Value::Null,
    }
}

pub fn substr(args: &[Value]) -> Value {
    let Value::String(s) = arg(args, 0) else { return Value::Null };
    let Value::Int(start) = arg(args, 1) else { return Value::Null };
    let start = (*start).max(0) as usize;
    let bytes = s.as_bytes();
    if start >= bytes.len() {
        return Value::string_copy("");
    }
    let end = match args.get(2) {
        Some(Value::Int(len)) => (start + (*len).max(0) as usize).min(bytes.len()),
        _ => bytes.len(),
    };
    Value::string_owned(String::from_utf8_lossy(&bytes[start..end]).into_owned())
}

pub fn to_upper_case(args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::String(s) => Value::string_owned(s.to_uppercase()),
        _ => Value::Null,
    }
}

pub fn to_lower_case(args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::String(s) => Value::string_owned(s.to_lowercase()),
        _ => Value::Null,
    }
}

pub fn str_contains(args: &[Value]) -> Value {
    match (arg(args, 0), arg(args, 1)) {
        (Value::String(s), Value::String(needle)) => Value::Bool(s.contains(needle.as_ref())),
        _ => Value::Bool(false),
    }
}

pub fn str_index_of(args: &[Value]) -> Value {
    match (arg(args, 0), arg(args, 1)) {
        (Value::String(s), Value::String(needle)) => match s.find(needle.as_ref()) {
            Some(idx) => Value::Int(idx as i64),
            None => Value::Int(-1),
        },
        _ => Value::Int(-1),
    }
}

pub fn str_replace(args: &[Value]) -> Value {
    match (arg(args, 0), arg(args, 1), arg(args, 2)) {
        (Value::String(s), Value::String(from), Value::String(to)) => Value::string_owned(s.replace(from.as_ref(), to)),
        _ => Value::Null,
    }
}

pub fn str_trim(args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::String(s) => Value::string_owned(s.trim().to_string()),
        _ => Value::Null,
    }
}

pub fn str_split(args: &[Value]) -> Value {
    match (arg(args, 0), arg(args, 1)) {
        (Value::String(s), Value::String(sep)) => {
            let count = if sep.is_empty() { s.chars().count() } else { s.split(sep.as_ref()).count() };
            Value::Int(count as i64)
        }
        _ => Value::Null,
    }
}

pub fn to_int(args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::Int(n) => Value::Int(*n),
        Value::Float(f) => Value::Int(*f as i64),
        Value::Bool(b) => Value::Int(i64::from(*b)),
        Value::Char(c) => Value::Int(*c as i64),
        Value::String(s) => Value::Int(s.trim().parse().unwrap_or(0)),
        Value::Null => Value::Int(0),
    }
}

pub fn to_float(args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::Int(n) => Value::Float(*n as f64),
        Value::Float(f) => Value::Float(*f),
        Value::Bool(b) => Value::Float(if *b { 1.0 } else { 0.0 }),
        Value::Char(c) => Value::Float(*c as f64),
        Value::String(s) => Value::Float(s.trim().parse().unwrap_or(0.0)),
        Value::Null => Value::Float(0.0),
    }
}

pub fn to_string(args: &[Value]) -> Value {
    Value::string_owned(arg(args, 0).to_display())
}

pub fn to_bool(args: &[Value]) -> Value {
    Value::Bool(arg(args, 0).is_truthy())
}

pub fn type_of(args: &[Value]) -> Value {
    Value::string_copy(arg(args, 0).type_name())
}

pub fn is_null(args: &[Value]) -> Value {
    Value::Bool(matches!(arg(args, 0), Value::Null))
}

pub fn is_int(args: &[Value]) -> Value {
    Value::Bool(matches!(arg(args, 0), Value::Int(_)))
}

pub fn is_float(args: &[Value]) -> Value {
    Value::Bool(matches!(arg(args, 0), Value::Float(_)))
}

pub fn is_string(args: &[Value]) -> Value {
    Value::Bool(matches!(arg(args, 0), Value::String(_)))
}

pub fn is_bool(args: &[Value]) -> Value {
    Value::Bool(matches!(arg(args, 0), Value::Bool(_)))
}

/// `Ok(())` if the first argument is truthy; otherwise `Err` carrying the
/// optional second argument's displayed form (or a default message).
pub fn assert_check(args: &[Value]) -> Result<(), String> {
    if args.first().is_some_and(Value::is_truthy) {
        Ok(())
    } else {
        Err(args.get(1).map(Value::to_display).unwrap_or_else(|| "assertion failed".to_string()))
    }
}

pub fn exit_code(args: &[Value]) -> i32 {
    match args.first() {
        Some(Value::Int(n)) => *n as i32,
        Some(Value::Bool(b)) => i32::from(*b),
        Some(Value::Float(f)) => *f as i32,
        _ => 0,
    }
}

/// Reads one line, stripping a single trailing CR or LF (§6). `None` at
/// end of input.
pub fn read_line<R: BufRead>(input: &mut R) -> Option<String> {
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) => None,
        Ok(_) => {
            if buf.ends_with('\n') {
                buf.pop();
                if buf.ends_with('\r') {
                    buf.pop();
                }
            }
            Some(buf)
        }
        Err(_) => None,
    }
}

/// Expands `%s %d %i %f %c %b %%` against `args[1..]` and interprets
/// `\n \t \r \\` in the format string at runtime (§6).
pub fn format_printf(args: &[Value]) -> String {
    let Some(Value::String(fmt)) = args.first() else { return String::new() };
    let mut out = String::new();
    let mut chars = fmt.chars().peekable();
    let mut next = 1usize;
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            '%' => match chars.next() {
                Some('%') => out.push('%'),
                Some('s') => out.push_str(&take(args, &mut next).map(Value::to_display).unwrap_or_default()),
                Some('d') | Some('i') => {
                    let n = take(args, &mut next).and_then(as_int).unwrap_or(0);
                    out.push_str(&n.to_string());
                }
                Some('f') => {
                    let f = take(args, &mut next).and_then(as_f64).unwrap_or(0.0);
                    out.push_str(&f.to_string());
                }
                Some('c') => {
                    if let Some(Value::Char(ch)) = take(args, &mut next) {
                        out.push(*ch as char);
                    }
                }
                Some('b') => out.push_str(if matches!(take(args, &mut next), Some(Value::Bool(true))) { "true" } else { "false" }),
                Some(other) => {
                    out.push('%');
                    out.push(other);
                }
                None => out.push('%'),
            },
            other => out.push(other),
        }
    }
    out
}

fn take<'a>(args: &'a [Value], next: &mut usize) -> Option<&'a Value> {
    let v = args.get(*next);
    *next += 1;
    v
}

fn as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Int(n) => Some(*n),
        Value::Float(f) => Some(*f as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substr_with_and_without_length() {
        let s = Value::string_copy("hello world");
        assert_eq!(substr(&[s.clone(), Value::Int(6)]), Value::string_copy("world"));
        assert_eq!(substr(&[s, Value::Int(0), Value::Int(5)]), Value::string_copy("hello"));
    }

    #[test]
    fn str_trim_is_idempotent() {
        let once = str_trim(&[Value::string_copy("  x  ")]);
        let twice = str_trim(std::slice::from_ref(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn to_upper_of_to_lower_equals_to_upper() {
        let s = Value::string_copy("MiXeD");
        let lowered = to_lower_case(&[s.clone()]);
        let a = to_upper_case(std::slice::from_ref(&lowered));
        let b = to_upper_case(&[s]);
        assert_eq!(a, b);
    }

    #[test]
    fn printf_expands_every_specifier() {
        let out = format_printf(&[
            Value::string_copy("%s/%d/%f/%c/%b/%%"),
            Value::string_copy("x"),
            Value::Int(7),
            Value::Float(1.5),
            Value::Char(b'!'),
            Value::Bool(true),
        ]);
        assert_eq!(out, "x/7/1.5/!/true/%");
    }

    #[test]
    fn printf_interprets_backslash_escapes() {
        assert_eq!(format_printf(&[Value::string_copy("a\\nb")]), "a\nb");
    }

    #[test]
    fn assert_check_reports_custom_message() {
        let err = assert_check(&[Value::Bool(false), Value::string_copy("nope")]).unwrap_err();
        assert_eq!(err, "nope");
    }

    #[test]
    fn to_int_of_to_string_round_trips() {
        for n in [0_i64, 1, -1, 42, i64::MAX, i64::MIN] {
            let s = to_string(&[Value::Int(n)]);
            let back = to_int(&[s]);
            assert_eq!(back, Value::Int(n));
        }
    }
}
