//! Validation of configuration data.
//!
//! Two independent sources feed one list: JSON Schema conformance errors
//! first, then a fixed set of cross-field rules that only produce warnings.
//! Paths are dot-joined so they can be matched against tree node paths.
//! Validation never blocks saving.

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
};

use log::debug;
use serde_json::{Map, Value};

use crate::{
    catalog::ModelsData,
    data::{
        fields::{MODEL_FIELD_PATTERNS, values_matching},
        schema::{ParsedSchema, SchemaNode, sort_keys},
    },
};

/// Ports below this need elevated privileges to bind.
pub const PRIVILEGED_PORT_LIMIT: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warn"),
        }
    }
}

/// A problem found at a dot path. The empty path is the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationError {
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.severity)?;
        if !self.path.is_empty() {
            write!(f, "{}: ", self.path)?;
        }
        write!(f, "{}", self.message)
    }
}

/// Full validation: schema errors followed by rule warnings.
pub fn validate(
    raw_schema: &Value,
    data: &Map<String, Value>,
    schema: &ParsedSchema,
    catalog: Option<&ModelsData>,
) -> Vec<ValidationError> {
    let mut errors = validate_schema(raw_schema, data);
    errors.extend(custom_rules(data, schema, catalog));
    errors
}

/// JSON Schema conformance errors for `data`.
///
/// A schema that fails to compile yields no errors.
pub fn validate_schema(raw_schema: &Value, data: &Map<String, Value>) -> Vec<ValidationError> {
    let validator = match jsonschema::validator_for(raw_schema) {
        Ok(validator) => validator,
        Err(e) => {
            debug!("schema does not compile, skipping conformance checks: {e}");
            return Vec::new();
        }
    };

    let instance = Value::Object(data.clone());
    validator
        .iter_errors(&instance)
        .map(|error| ValidationError::error(pointer_to_path(&error.instance_path.to_string()), error.to_string()))
        .collect()
}

/// Convert a JSON pointer such as `/agent/build~1x` to `agent.build/x`.
pub fn pointer_to_path(pointer: &str) -> String {
    let trimmed = pointer.strip_prefix('/').unwrap_or(pointer);
    if trimmed.is_empty() {
        return String::new();
    }
    trimmed
        .split('/')
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

/// Cross-field rules, in order: deprecated fields, providers both disabled
/// and enabled, privileged server port, unknown model providers.
pub fn custom_rules(
    data: &Map<String, Value>,
    schema: &ParsedSchema,
    catalog: Option<&ModelsData>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    deprecated_fields(schema.properties(), schema.keys(), data, "", &mut errors);
    provider_overlap(data, &mut errors);
    privileged_port(data, &mut errors);
    if let Some(catalog) = catalog {
        unknown_providers(data, catalog, &mut errors);
    }

    errors
}

fn deprecated_fields(
    properties: &BTreeMap<String, SchemaNode>,
    keys: &[String],
    data: &Map<String, Value>,
    prefix: &str,
    errors: &mut Vec<ValidationError>,
) {
    for key in keys {
        let (Some(node), Some(value)) = (properties.get(key), data.get(key)) else {
            continue;
        };
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        if node.deprecated {
            let hint = node
                .deprecated_message
                .as_ref()
                .map(|m| format!(" Migration: {m}"))
                .unwrap_or_default();
            errors.push(ValidationError::warning(
                path.clone(),
                format!("Field \"{path}\" is deprecated.{hint}"),
            ));
        }

        if let (Some(children), Some(child_data)) = (&node.properties, value.as_object()) {
            let child_keys = sort_keys(children.keys().cloned());
            deprecated_fields(children, &child_keys, child_data, &path, errors);
        }
    }
}

fn provider_overlap(data: &Map<String, Value>, errors: &mut Vec<ValidationError>) {
    let (Some(disabled), Some(enabled)) = (
        data.get("disabled_providers").and_then(Value::as_array),
        data.get("enabled_providers").and_then(Value::as_array),
    ) else {
        return;
    };

    let enabled: HashSet<&str> = enabled.iter().filter_map(Value::as_str).collect();
    let overlap: Vec<&str> = disabled
        .iter()
        .filter_map(Value::as_str)
        .filter(|p| enabled.contains(p))
        .collect();

    if !overlap.is_empty() {
        errors.push(ValidationError::warning(
            "disabled_providers",
            format!(
                "Providers appear in both disabled_providers and enabled_providers: {}",
                overlap.join(", ")
            ),
        ));
    }
}

fn privileged_port(data: &Map<String, Value>, errors: &mut Vec<ValidationError>) {
    let Some(port) = data
        .get("server")
        .and_then(Value::as_object)
        .and_then(|server| server.get("port"))
    else {
        return;
    };
    let Some(number) = port.as_f64() else {
        return;
    };

    if number < PRIVILEGED_PORT_LIMIT as f64 {
        errors.push(ValidationError::warning(
            "server.port",
            format!("Port {port} is < {PRIVILEGED_PORT_LIMIT} and requires root privileges"),
        ));
    }
}

fn unknown_providers(data: &Map<String, Value>, catalog: &ModelsData, errors: &mut Vec<ValidationError>) {
    if catalog.providers.is_empty() {
        return;
    }
    let known: HashSet<&str> = catalog.providers.iter().map(|p| p.id.as_str()).collect();

    for pattern in MODEL_FIELD_PATTERNS {
        for (path, value) in values_matching(data, pattern) {
            let Some(model) = value.as_str() else {
                continue;
            };
            let provider = model.split('/').next().unwrap_or_default();
            if !provider.is_empty() && !known.contains(provider) {
                errors.push(ValidationError::warning(
                    path,
                    format!("Unknown model provider \"{provider}\" in \"{model}\""),
                ));
            }
        }
    }
}

/// Errors at `path` or anywhere below it.
pub fn errors_for_path<'a>(errors: &'a [ValidationError], path: &str) -> Vec<&'a ValidationError> {
    let dotted = format!("{path}.");
    let bracketed = format!("{path}[");
    errors
        .iter()
        .filter(|e| e.path == path || e.path.starts_with(&dotted) || e.path.starts_with(&bracketed))
        .collect()
}

/// Error and warning counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationSummary {
    pub errors: usize,
    pub warnings: usize,
}

impl ValidationSummary {
    pub fn of<'a>(errors: impl IntoIterator<Item = &'a ValidationError>) -> Self {
        errors.into_iter().fold(Self::default(), |mut summary, e| {
            match e.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
            }
            summary
        })
    }

    /// Counts for the subtree rooted at `path`.
    pub fn for_path(errors: &[ValidationError], path: &str) -> Self {
        Self::of(errors_for_path(errors, path))
    }

    pub fn total(&self) -> usize {
        self.errors + self.warnings
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Provider;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn raw_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "model": {"type": "string"},
                "mode": {"type": "object", "deprecated": true, "x-deprecated-message": "use agent"},
                "server": {
                    "type": "object",
                    "properties": {"port": {"type": "number"}}
                },
                "tui": {
                    "type": "object",
                    "properties": {
                        "layout": {"type": "string", "x-deprecated": true}
                    }
                },
                "agent": {
                    "type": "object",
                    "additionalProperties": {
                        "type": "object",
                        "properties": {"model": {"type": "string"}}
                    }
                }
            }
        })
    }

    fn catalog() -> ModelsData {
        ModelsData {
            providers: vec![Provider {
                id: "anthropic".into(),
                name: "Anthropic".into(),
                env: None,
            }],
            models: Vec::new(),
        }
    }

    #[test]
    fn test_port_scenario() {
        let raw = raw_schema();
        let schema = ParsedSchema::parse(&raw);
        let errors = validate(&raw, &map(json!({"server": {"port": 80}})), &schema, None);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "server.port");
        assert_eq!(errors[0].severity, Severity::Warning);
        assert!(errors[0].message.contains("1024"));
        assert_eq!(errors[0].message, "Port 80 is < 1024 and requires root privileges");
    }

    #[test]
    fn test_rule_order() {
        let raw = raw_schema();
        let schema = ParsedSchema::parse(&raw);
        let data = map(json!({"server": {"port": 80}, "mode": {}}));
        let errors = validate(&raw, &data, &schema, None);

        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["mode", "server.port"]);
        assert!(errors.iter().all(ValidationError::is_warning));
        assert_eq!(errors[0].message, "Field \"mode\" is deprecated. Migration: use agent");
    }

    #[test]
    fn test_nested_deprecated_field() {
        let schema = ParsedSchema::parse(&raw_schema());
        let errors = custom_rules(&map(json!({"tui": {"layout": "wide"}})), &schema, None);
        assert_eq!(errors, vec![ValidationError::warning("tui.layout", "Field \"tui.layout\" is deprecated.")]);
    }

    #[test]
    fn test_schema_errors_come_first() {
        let raw = raw_schema();
        let schema = ParsedSchema::parse(&raw);
        let data = map(json!({"mode": {}, "server": {"port": "eighty"}}));
        let errors = validate(&raw, &data, &schema, None);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].severity, Severity::Error);
        assert_eq!(errors[0].path, "server.port");
        assert_eq!(errors[1].path, "mode");
    }

    #[test]
    fn test_uncompilable_schema_is_ignored() {
        let raw = json!({"type": 12});
        assert!(validate_schema(&raw, &map(json!({"a": 1}))).is_empty());
    }

    #[test]
    fn test_provider_overlap() {
        let data = map(json!({
            "disabled_providers": ["openai", "groq", "xai"],
            "enabled_providers": ["xai", "openai"]
        }));
        let errors = custom_rules(&data, &ParsedSchema::default(), None);
        assert_eq!(
            errors,
            vec![ValidationError::warning(
                "disabled_providers",
                "Providers appear in both disabled_providers and enabled_providers: openai, xai"
            )]
        );
    }

    #[test]
    fn test_unknown_providers() {
        let data = map(json!({
            "model": "anthropic/claude-sonnet",
            "small_model": "nope/tiny",
            "agent": {"build": {"model": "ghost/x"}, "plan": {"model": "anthropic/claude"}}
        }));
        let schema = ParsedSchema::default();

        let errors = custom_rules(&data, &schema, Some(&catalog()));
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["small_model", "agent.build.model"]);
        assert_eq!(errors[0].message, "Unknown model provider \"nope\" in \"nope/tiny\"");

        assert!(custom_rules(&data, &schema, None).is_empty());
        assert!(custom_rules(&data, &schema, Some(&ModelsData::default())).is_empty());
    }

    #[test]
    fn test_pointer_to_path() {
        assert_eq!(pointer_to_path(""), "");
        assert_eq!(pointer_to_path("/server/port"), "server.port");
        assert_eq!(pointer_to_path("/provider/a~1b/x~0y"), "provider.a/b.x~y");
        assert_eq!(pointer_to_path("/skills/0"), "skills.0");
    }

    #[test]
    fn test_errors_for_path() {
        let errors = vec![
            ValidationError::error("server", "bad"),
            ValidationError::warning("server.port", "low"),
            ValidationError::warning("server[0]", "odd"),
            ValidationError::error("serverless", "other"),
        ];
        assert_eq!(errors_for_path(&errors, "server").len(), 3);
        assert_eq!(errors_for_path(&errors, "server.port").len(), 1);

        let summary = ValidationSummary::for_path(&errors, "server");
        assert_eq!(summary, ValidationSummary { errors: 1, warnings: 2 });
        assert_eq!(ValidationSummary::of(&errors).total(), 4);
        assert!(ValidationSummary::for_path(&errors, "model").is_clean());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ValidationError::warning("server.port", "low").to_string(),
            "[warn] server.port: low"
        );
        assert_eq!(ValidationError::error("", "not an object").to_string(), "[error] not an object");
    }
}
