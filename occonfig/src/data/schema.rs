use std::collections::BTreeMap;

use serde_json::{Value, json};

/// Canonical order of top-level and nested keys.
///
/// Keys listed here come first, in this order; every other key follows
/// alphabetically.
pub const KEY_ORDER: &[&str] = &[
    "model",
    "small_model",
    "theme",
    "logLevel",
    "username",
    "agent",
    "provider",
    "permission",
    "tools",
    "keybinds",
    "tui",
    "server",
    "command",
    "formatter",
    "compaction",
    "watcher",
    "instructions",
    "skills",
    "share",
    "autoupdate",
    "snapshot",
    "disabled_providers",
    "enabled_providers",
    "experimental",
    "plugin",
];

// Local `$ref` chains deeper than this resolve to a plain string node.
const MAX_DEPTH: usize = 64;

/// Shape of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    #[default]
    String,
    Number,
    Boolean,
    Object,
    Array,
    Enum,
    /// A union (`anyOf`/`oneOf`) of several shapes.
    Mixed,
}

/// Value accepted for keys not declared in `properties`.
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaNode>),
}

/// Typed schema description of a single configuration key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub enum_values: Option<Vec<String>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub format: Option<String>,
    pub deprecated: bool,
    pub deprecated_message: Option<String>,
    pub properties: Option<BTreeMap<String, SchemaNode>>,
    pub additional_properties: Option<AdditionalProperties>,
    pub items: Option<Box<SchemaNode>>,
}

impl SchemaNode {
    /// Create an empty node of the given kind.
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Object node with the given properties.
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, SchemaNode)>,
        K: Into<String>,
    {
        Self {
            kind: SchemaKind::Object,
            properties: Some(properties.into_iter().map(|(k, v)| (k.into(), v)).collect()),
            ..Default::default()
        }
    }

    /// Declared property `key`.
    pub fn property(&self, key: &str) -> Option<&SchemaNode> {
        self.properties.as_ref().and_then(|p| p.get(key))
    }

    /// Schema used for undeclared keys, if one is given.
    pub fn additional_schema(&self) -> Option<&SchemaNode> {
        match &self.additional_properties {
            Some(AdditionalProperties::Schema(node)) => Some(node),
            _ => None,
        }
    }

    /// Schema for a child key: the declared property, else the
    /// `additionalProperties` schema, else a plain string.
    pub fn child_schema(&self, key: &str) -> SchemaNode {
        self.property(key)
            .or_else(|| self.additional_schema())
            .cloned()
            .unwrap_or_default()
    }
}

/// A parsed top-level schema with its canonical key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSchema {
    properties: BTreeMap<String, SchemaNode>,
    keys: Vec<String>,
}

impl ParsedSchema {
    /// Parse a raw JSON-Schema-like document.
    ///
    /// Unknown or malformed nodes never fail: a node without a usable `type`
    /// becomes a string node, and references outside the document resolve to
    /// an empty node.
    pub fn parse(raw: &Value) -> Self {
        let Some(properties) = raw.get("properties").and_then(Value::as_object) else {
            return Self::default();
        };

        let declared: Vec<String> = properties.keys().cloned().collect();
        let mut keys: Vec<String> = KEY_ORDER
            .iter()
            .filter(|k| declared.iter().any(|d| d == *k))
            .map(|k| k.to_string())
            .collect();
        keys.extend(
            declared
                .iter()
                .filter(|k| !KEY_ORDER.contains(&k.as_str()))
                .cloned(),
        );

        let properties = keys
            .iter()
            .map(|k| (k.clone(), parse_node(&properties[k.as_str()], raw, 0)))
            .collect();

        Self { properties, keys }
    }

    /// Build a schema directly from typed nodes.
    pub fn from_properties<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, SchemaNode)>,
        K: Into<String>,
    {
        let properties: BTreeMap<String, SchemaNode> =
            properties.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let keys = sort_keys(properties.keys().cloned());
        Self { properties, keys }
    }

    /// The bundled minimal schema used when no schema can be loaded.
    pub fn fallback() -> Self {
        Self::parse(&fallback_schema_document())
    }

    /// Top-level keys in canonical order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn properties(&self) -> &BTreeMap<String, SchemaNode> {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&SchemaNode> {
        self.properties.get(key)
    }

    /// Iterate `(key, node)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.keys
            .iter()
            .filter_map(|k| self.properties.get(k).map(|node| (k.as_str(), node)))
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Deduplicate `keys` and put them in canonical order.
pub fn sort_keys<I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut rest: Vec<String> = keys.into_iter().collect();
    rest.sort();
    rest.dedup();

    let mut ordered: Vec<String> = KEY_ORDER
        .iter()
        .filter(|k| rest.iter().any(|r| r == *k))
        .map(|k| k.to_string())
        .collect();
    rest.retain(|k| !KEY_ORDER.contains(&k.as_str()));
    ordered.extend(rest);
    ordered
}

fn resolve_ref<'a>(reference: &str, root: &'a Value) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    root.pointer(pointer)
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(_) => true,
    }
}

fn str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

fn type_name(raw: &Value) -> Option<&str> {
    match raw.get("type")? {
        Value::String(s) => Some(s),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

fn parse_properties(raw: &Value, root: &Value, depth: usize) -> Option<BTreeMap<String, SchemaNode>> {
    let properties = raw.get("properties")?.as_object()?;
    Some(
        properties
            .iter()
            .map(|(k, v)| (k.clone(), parse_node(v, root, depth + 1)))
            .collect(),
    )
}

fn parse_additional(raw: &Value, root: &Value, depth: usize) -> Option<AdditionalProperties> {
    match raw.get("additionalProperties")? {
        Value::Bool(b) => Some(AdditionalProperties::Allowed(*b)),
        other => Some(AdditionalProperties::Schema(Box::new(parse_node(
            other,
            root,
            depth + 1,
        )))),
    }
}

fn parse_node(raw: &Value, root: &Value, depth: usize) -> SchemaNode {
    if depth > MAX_DEPTH || !raw.is_object() {
        return SchemaNode::default();
    }

    if let Some(reference) = raw.get("$ref").and_then(Value::as_str) {
        return match resolve_ref(reference, root) {
            Some(resolved) => parse_node(resolved, root, depth + 1),
            None => SchemaNode::default(),
        };
    }

    let union = raw
        .get("anyOf")
        .or_else(|| raw.get("oneOf"))
        .and_then(Value::as_array);
    if let Some(variants) = union {
        return parse_union(raw, variants, root, depth);
    }

    let kind = match type_name(raw) {
        Some("object") => SchemaKind::Object,
        Some("array") => SchemaKind::Array,
        Some("boolean") => SchemaKind::Boolean,
        Some("number" | "integer") => SchemaKind::Number,
        _ => SchemaKind::String,
    };

    let mut node = SchemaNode {
        kind,
        description: str_field(raw, "description"),
        default: raw.get("default").cloned(),
        format: str_field(raw, "format"),
        minimum: raw.get("minimum").and_then(Value::as_f64),
        maximum: raw.get("maximum").and_then(Value::as_f64),
        ..Default::default()
    };

    if let Some(values) = raw.get("enum").and_then(Value::as_array) {
        node.kind = SchemaKind::Enum;
        node.enum_values = Some(
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        );
    }

    if truthy(raw.get("x-deprecated")) || truthy(raw.get("deprecated")) {
        node.deprecated = true;
        node.deprecated_message =
            str_field(raw, "x-deprecated-message").or_else(|| str_field(raw, "deprecatedMessage"));
    }

    match kind {
        SchemaKind::Object => {
            node.properties = parse_properties(raw, root, depth);
            node.additional_properties = parse_additional(raw, root, depth);
        }
        SchemaKind::Array => {
            node.items = raw
                .get("items")
                .map(|items| Box::new(parse_node(items, root, depth + 1)));
        }
        _ => {}
    }

    node
}

fn parse_union(raw: &Value, variants: &[Value], root: &Value, depth: usize) -> SchemaNode {
    let mut enum_values = Vec::new();
    let mut has_boolean = false;
    let mut object_variant = None;

    for variant in variants {
        let resolved = variant
            .get("$ref")
            .and_then(Value::as_str)
            .and_then(|r| resolve_ref(r, root))
            .unwrap_or(variant);

        match type_name(resolved) {
            Some("boolean") => has_boolean = true,
            Some("string") => {
                if let Some(values) = resolved.get("enum").and_then(Value::as_array) {
                    enum_values.extend(values.iter().filter_map(Value::as_str).map(str::to_string));
                }
            }
            Some("object") if object_variant.is_none() => object_variant = Some(resolved),
            _ => {}
        }
    }

    if has_boolean {
        enum_values.splice(0..0, ["true".to_string(), "false".to_string()]);
    }

    let mut node = SchemaNode {
        kind: SchemaKind::Mixed,
        description: str_field(raw, "description"),
        default: raw.get("default").cloned(),
        enum_values: (!enum_values.is_empty()).then_some(enum_values),
        ..Default::default()
    };

    // an object-shaped variant lets the node be drilled into when its value is an object
    if let Some(object) = object_variant {
        node.properties = parse_properties(object, root, depth);
        node.additional_properties = parse_additional(object, root, depth);
    }

    if truthy(raw.get("x-deprecated")) || truthy(raw.get("deprecated")) {
        node.deprecated = true;
        node.deprecated_message =
            str_field(raw, "x-deprecated-message").or_else(|| str_field(raw, "deprecatedMessage"));
    }

    node
}

/// Minimal schema document bundled for offline use.
pub fn fallback_schema_document() -> Value {
    json!({
        "type": "object",
        "properties": {
            "model": {"type": "string", "description": "Default model to use"},
            "small_model": {"type": "string", "description": "Small model for lightweight tasks"},
            "theme": {"type": "string", "description": "UI theme"},
            "logLevel": {"type": "string", "description": "Log level", "enum": ["DEBUG", "INFO", "WARN", "ERROR"]},
            "username": {"type": "string", "description": "Username displayed in TUI"},
            "agent": {"type": "object", "description": "Agent configurations"},
            "provider": {"type": "object", "description": "Provider configurations"},
            "permission": {"type": "object", "description": "Permission settings"},
            "tools": {"type": "object", "description": "Tool configurations"},
            "keybinds": {"type": "object", "description": "Keybind overrides"},
            "tui": {"type": "object", "description": "TUI display settings"},
            "server": {"type": "object", "description": "Server settings"},
            "command": {"type": "object", "description": "Custom commands"},
            "formatter": {"type": "object", "description": "Code formatter settings"},
            "compaction": {"type": "object", "description": "Compaction settings"},
            "watcher": {"type": "object", "description": "File watcher settings"},
            "instructions": {"type": "string", "description": "System instructions"},
            "skills": {"type": "array", "description": "Skills to load"},
            "share": {"type": "string", "description": "Share mode", "enum": ["manual", "auto", "disabled"]},
            "autoupdate": {
                "description": "Auto-update setting",
                "anyOf": [{"type": "boolean"}, {"type": "string", "enum": ["notify"]}]
            },
            "snapshot": {"type": "object", "description": "Snapshot settings"},
            "disabled_providers": {"type": "array", "description": "Disabled providers"},
            "enabled_providers": {"type": "array", "description": "Enabled providers"},
            "experimental": {"type": "object", "description": "Experimental features"},
            "plugin": {"type": "object", "description": "Plugin configurations"}
        }
    })
}
