//! Structural JSON equality.
//!
//! One recursive algorithm covers both modes; `CompareMode` only changes how
//! arrays are matched.
//!
//! Weak array matching is greedy: each control element takes the first
//! unconsumed experiment element equal to it, with no backtracking. Arrays of
//! near-duplicate objects can therefore compare unequal even when a perfect
//! pairing exists.

use serde_json::{Map, Number, Value};

use crate::compare::CompareMode;

/// Parse a body whose top level must be a JSON object.
pub fn parse_object(body: &[u8]) -> Option<Map<String, Value>> {
    serde_json::from_slice(body).ok()
}

/// Compare two bodies as JSON objects. Unparsable bodies are never equal.
pub fn bodies_equal(control: &[u8], experiment: &[u8], mode: CompareMode) -> bool {
    match (parse_object(control), parse_object(experiment)) {
        (Some(c), Some(e)) => objects_equal(&c, &e, mode),
        _ => false,
    }
}

/// Recursive structural equality.
pub fn values_equal(a: &Value, b: &Value, mode: CompareMode) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => arrays_equal(x, y, mode),
        (Value::Object(x), Value::Object(y)) => objects_equal(x, y, mode),
        _ => false,
    }
}

fn objects_equal(a: &Map<String, Value>, b: &Map<String, Value>, mode: CompareMode) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(key, av)| b.get(key).is_some_and(|bv| values_equal(av, bv, mode)))
}

fn arrays_equal(a: &[Value], b: &[Value], mode: CompareMode) -> bool {
    if a.len() != b.len() {
        return false;
    }

    match mode {
        CompareMode::Strict => a.iter().zip(b).all(|(x, y)| values_equal(x, y, mode)),
        CompareMode::Weak => {
            let mut consumed = vec![false; b.len()];
            for av in a {
                let found = (0..b.len()).find(|&i| !consumed[i] && values_equal(av, &b[i], mode));
                match found {
                    Some(i) => consumed[i] = true,
                    None => return false,
                }
            }
            true
        }
    }
}

/// Numbers compare by value: `1` and `1.0` are equal.
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
