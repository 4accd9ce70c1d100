use serde_json::Value;

/// Walk a dot-separated path through nested JSON objects.
///
/// Numeric segments index into arrays, so `"executions.0.date-started.date"`
/// reaches into the first execution. Returns `None` as soon as a segment is
/// missing instead of failing.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Like [`get_path`] but falls back to `default` when the path is missing.
pub fn get_path_or<'a>(value: &'a Value, path: &str, default: &'a Value) -> &'a Value {
    get_path(value, path).unwrap_or(default)
}

/// String at `path`, if present and a string.
pub fn get_str<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    get_path(value, path).and_then(Value::as_str)
}
