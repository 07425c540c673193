use serde_json::{Map, Value};

/// Fields that select a model as `provider/model`.
pub const MODEL_FIELD_PATTERNS: &[&str] = &["model", "small_model", "agent.*.model"];

/// Match a dot path against a pattern where `*` stands for exactly one segment.
pub fn matches_pattern(pattern: &str, path: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let path: Vec<&str> = path.split('.').collect();
    pattern.len() == path.len()
        && pattern
            .iter()
            .zip(&path)
            .all(|(p, s)| *p == "*" || p == s)
}

/// Every `(path, value)` in `data` whose path matches `pattern`, in document order.
pub fn values_matching<'a>(data: &'a Map<String, Value>, pattern: &str) -> Vec<(String, &'a Value)> {
    let segments: Vec<&str> = pattern.split('.').collect();
    let mut out = Vec::new();
    collect(data, &segments, String::new(), &mut out);
    out
}

fn collect<'a>(
    map: &'a Map<String, Value>,
    segments: &[&str],
    prefix: String,
    out: &mut Vec<(String, &'a Value)>,
) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    let entries: Vec<(&'a String, &'a Value)> = if *head == "*" {
        map.iter().collect()
    } else {
        map.get_key_value(*head).into_iter().collect()
    };

    for (key, value) in entries {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if rest.is_empty() {
            out.push((path, value));
        } else if let Some(child) = value.as_object() {
            collect(child, rest, path, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("agent.*.model", "agent.build.model"));
        assert!(matches_pattern("model", "model"));
        assert!(!matches_pattern("agent.*.model", "agent.model"));
        assert!(!matches_pattern("agent.*.model", "agent.build.plan.model"));
        assert!(!matches_pattern("model", "small_model"));
    }

    #[test]
    fn test_values_matching() {
        let data = json!({
            "model": "a/b",
            "agent": {
                "build": {"model": "c/d"},
                "plan": {"temperature": 0.1},
                "review": "not an object"
            }
        });
        let data = data.as_object().expect("object");

        let found = values_matching(data, "agent.*.model");
        assert_eq!(found, vec![("agent.build.model".to_string(), &json!("c/d"))]);
        assert_eq!(values_matching(data, "model").len(), 1);
        assert!(values_matching(data, "small_model").is_empty());
    }
}
