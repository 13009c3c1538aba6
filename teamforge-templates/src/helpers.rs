//! ABOUTME: A small Sprig-flavored helper library registered on top of Tera's builtins
//! ABOUTME: Covers the string/math/default filters the flow templates lean on

use std::collections::HashMap;

use tera::{to_value, Error as TeraError, Result as TeraResult, Value};

fn as_f64(value: &Value, name: &str) -> TeraResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| TeraError::msg(format!("`{name}` filter requires a numeric value")))
}

/// `{{ value | add(n=1) }}`
pub fn add(value: &Value, args: &HashMap<String, Value>) -> TeraResult<Value> {
    let lhs = as_f64(value, "add")?;
    let rhs = args.get("n").map(|v| as_f64(v, "add")).transpose()?.unwrap_or(0.0);
    to_value(lhs + rhs).map_err(Into::into)
}

/// `{{ value | sub(n=1) }}`
pub fn sub(value: &Value, args: &HashMap<String, Value>) -> TeraResult<Value> {
    let lhs = as_f64(value, "sub")?;
    let rhs = args.get("n").map(|v| as_f64(v, "sub")).transpose()?.unwrap_or(0.0);
    to_value(lhs - rhs).map_err(Into::into)
}

/// `{{ value | mul(n=2) }}`
pub fn mul(value: &Value, args: &HashMap<String, Value>) -> TeraResult<Value> {
    let lhs = as_f64(value, "mul")?;
    let rhs = args.get("n").map(|v| as_f64(v, "mul")).transpose()?.unwrap_or(1.0);
    to_value(lhs * rhs).map_err(Into::into)
}

/// `{{ value | div(n=2) }}`
pub fn div(value: &Value, args: &HashMap<String, Value>) -> TeraResult<Value> {
    let lhs = as_f64(value, "div")?;
    let rhs = args.get("n").map(|v| as_f64(v, "div")).transpose()?.unwrap_or(1.0);
    if rhs == 0.0 {
        return Err(TeraError::msg("`div` filter cannot divide by zero"));
    }
    to_value(lhs / rhs).map_err(Into::into)
}

/// `{{ value | quote }}` — wraps the rendered value in double quotes.
pub fn quote(value: &Value, _args: &HashMap<String, Value>) -> TeraResult<Value> {
    let s = value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string());
    to_value(format!("\"{s}\"")).map_err(Into::into)
}

/// `{{ value | trunc(n=10) }}` — Sprig-style truncate to at most `n` characters.
pub fn trunc(value: &Value, args: &HashMap<String, Value>) -> TeraResult<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| TeraError::msg("`trunc` filter requires a string value"))?;
    let n = args
        .get("n")
        .and_then(Value::as_u64)
        .ok_or_else(|| TeraError::msg("`trunc` filter requires an `n` argument"))? as usize;
    let truncated: String = s.chars().take(n).collect();
    to_value(truncated).map_err(Into::into)
}

pub fn register(tera: &mut tera::Tera) {
    tera.register_filter("add", add);
    tera.register_filter("sub", sub);
    tera.register_filter("mul", mul);
    tera.register_filter("div", div);
    tera.register_filter("quote", quote);
    tera.register_filter("trunc", trunc);
}
