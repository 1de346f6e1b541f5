//! Defensive field extraction for scheduler JSON.
//!
//! Scheduler CLI output changes shape across versions: numbers appear bare
//! or wrapped in `{"set": bool, "number": n}`, states appear as a string or
//! an array of flags. These helpers accept every shape we have seen and
//! return `None` rather than guessing.

use serde_json::Value;

/// A number that may be bare, wrapped, or explicitly unset.
pub(crate) fn opt_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::Object(map) => {
            if map.get("set").and_then(Value::as_bool) == Some(false) {
                return None;
            }
            map.get("number").and_then(Value::as_u64)
        }
        _ => None,
    }
}

pub(crate) fn field_u64(record: &Value, key: &str) -> Option<u64> {
    record.get(key).and_then(opt_u64)
}

pub(crate) fn field_str(record: &Value, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

/// A state field: either a plain string (`"IDLE+DRAIN"`) or an array of
/// flags (`["IDLE", "DRAIN"]`) joined the way the scheduler displays them.
pub(crate) fn state_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(flags)) => flags
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("+"),
        _ => String::new(),
    }
}
