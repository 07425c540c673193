use serde_json::{Map, Number, Value};

/// A single pending change to a configuration document.
///
/// A modification without a value deletes the key at `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct Modification {
    pub path: Vec<String>,
    pub value: Option<Value>,
}

impl Modification {
    pub fn set(path: Vec<String>, value: Value) -> Self {
        Self {
            path,
            value: Some(value),
        }
    }

    pub fn unset(path: Vec<String>) -> Self {
        Self { path, value: None }
    }

    /// Build a modification from a dot-separated path such as `server.port`.
    pub fn from_dot_path(path: &str, value: Option<Value>) -> Self {
        Self {
            path: split_path(path),
            value,
        }
    }

    pub fn is_delete(&self) -> bool {
        self.value.is_none()
    }

    pub fn dot_path(&self) -> String {
        self.path.join(".")
    }
}

/// Split a dot path into segments. The empty string is the root.
pub fn split_path(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('.').map(str::to_string).collect()
}

/// Look up the value at `path`, descending through objects and array indices.
pub fn value_at<'a>(data: &'a Map<String, Value>, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = data.get(first)?;
    for segment in rest {
        current = child(current, segment)?;
    }
    Some(current)
}

/// Replay `modifications` on a copy of `data`.
pub fn apply_modifications(
    data: &Map<String, Value>,
    modifications: &[Modification],
) -> Map<String, Value> {
    let mut result = data.clone();
    for modification in modifications {
        apply_to_map(&mut result, modification);
    }
    result
}

/// Apply one modification in place.
///
/// Setting creates intermediate objects, replacing any scalar found on the
/// way. Deleting a missing path does nothing. Key order is preserved.
pub fn apply_to_map(data: &mut Map<String, Value>, modification: &Modification) {
    if modification.path.is_empty() {
        match &modification.value {
            Some(Value::Object(map)) => *data = map.clone(),
            Some(_) => log::debug!("ignoring non-object value for the document root"),
            None => data.clear(),
        }
        return;
    }

    let mut root = Value::Object(std::mem::take(data));
    match &modification.value {
        Some(value) => set_value(&mut root, &modification.path, value.clone()),
        None => delete_value(&mut root, &modification.path),
    }
    if let Value::Object(map) = root {
        *data = map;
    }
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

fn insert_child(container: &mut Value, segment: &str, value: Value) {
    match container {
        Value::Object(map) => {
            map.insert(segment.to_string(), value);
        }
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(i) if i < items.len() => items[i] = value,
            Ok(_) => items.push(value),
            Err(_) => log::debug!("cannot set key `{segment}` on an array"),
        },
        _ => {}
    }
}

fn set_value(root: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        let is_container = child(current, segment).is_some_and(|c| c.is_object() || c.is_array());
        if !is_container {
            insert_child(current, segment, Value::Object(Map::new()));
        }
        current = match child_mut(current, segment) {
            Some(next) => next,
            None => return,
        };
    }
    insert_child(current, last, value);
}

fn delete_value(root: &mut Value, path: &[String]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        current = match child_mut(current, segment) {
            Some(next) => next,
            None => return,
        };
    }
    match current {
        Value::Object(map) => {
            map.shift_remove(last.as_str());
        }
        Value::Array(items) => {
            if let Ok(i) = last.parse::<usize>() {
                if i < items.len() {
                    items.remove(i);
                }
            }
        }
        _ => {}
    }
}

/// Interpret a command-line argument as a JSON value.
///
/// `true`/`false` become booleans, numeric literals become numbers (integers
/// when they fit `i64`), anything else stays a string.
pub fn coerce_value(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::from(i);
        }
        if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_set_creates_parents() {
        let data = map(json!({"model": "a/b", "server": 3}));
        let result = apply_modifications(
            &data,
            &[
                Modification::from_dot_path("tui.scroll_speed", Some(json!(2))),
                Modification::from_dot_path("server.port", Some(json!(80))),
            ],
        );
        assert_eq!(
            Value::Object(result),
            json!({"model": "a/b", "server": {"port": 80}, "tui": {"scroll_speed": 2}})
        );
        // source map untouched
        assert_eq!(data.get("server"), Some(&json!(3)));
    }

    #[test]
    fn test_later_modifications_win() {
        let data = map(json!({"theme": "nord"}));
        let result = apply_modifications(
            &data,
            &[
                Modification::from_dot_path("theme", Some(json!("dark"))),
                Modification::from_dot_path("theme", None),
                Modification::from_dot_path("theme", Some(json!("light"))),
            ],
        );
        assert_eq!(result.get("theme"), Some(&json!("light")));
    }

    #[test]
    fn test_delete_keeps_order() {
        let data = map(json!({"a": 1, "b": {"c": 2, "d": 3}, "e": 4}));
        let result = apply_modifications(
            &data,
            &[
                Modification::from_dot_path("b.c", None),
                Modification::from_dot_path("missing.key", None),
            ],
        );
        let keys: Vec<&String> = result.keys().collect();
        assert_eq!(keys, ["a", "b", "e"]);
        assert_eq!(result.get("b"), Some(&json!({"d": 3})));
    }

    #[test]
    fn test_array_segments() {
        let mut data = map(json!({"skills": ["a", "b"]}));
        apply_to_map(&mut data, &Modification::from_dot_path("skills.1", Some(json!("c"))));
        apply_to_map(&mut data, &Modification::from_dot_path("skills.5", Some(json!("d"))));
        apply_to_map(&mut data, &Modification::from_dot_path("skills.0", None));
        assert_eq!(data.get("skills"), Some(&json!(["c", "d"])));
    }

    #[test]
    fn test_value_at() {
        let data = map(json!({"agent": {"build": {"model": "x/y"}}, "skills": ["s"]}));
        assert_eq!(
            value_at(&data, &split_path("agent.build.model")),
            Some(&json!("x/y"))
        );
        assert_eq!(value_at(&data, &split_path("skills.0")), Some(&json!("s")));
        assert_eq!(value_at(&data, &split_path("agent.plan")), None);
        assert_eq!(value_at(&data, &[]), None);
    }

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value("true"), json!(true));
        assert_eq!(coerce_value("false"), json!(false));
        assert_eq!(coerce_value("8080"), json!(8080));
        assert_eq!(coerce_value(" 42 "), json!(42));
        assert_eq!(coerce_value("0.5"), json!(0.5));
        assert_eq!(coerce_value("-3"), json!(-3));
        assert_eq!(coerce_value("True"), json!("True"));
        assert_eq!(coerce_value("  "), json!("  "));
        assert_eq!(coerce_value("NaN"), json!("NaN"));
        assert_eq!(coerce_value("anthropic/claude"), json!("anthropic/claude"));
    }
}
