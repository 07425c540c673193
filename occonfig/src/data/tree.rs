use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::data::{
    scope::ConfigScope,
    schema::{SchemaKind, SchemaNode, sort_keys},
};

/// How a node differs from the persisted baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Change {
    #[default]
    Unchanged,
    /// Set now, absent from the baseline.
    Added,
    /// Present in both with different values.
    Edited,
    /// Present in the baseline, absent now.
    Deleted,
}

/// One key of the reconciled configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Dot-joined path from the root, e.g. `server.port`.
    pub path: String,
    pub key: String,
    pub schema: SchemaNode,
    /// Local value; `None` when the key is absent.
    pub value: Option<Value>,
    /// Value in the baseline snapshot.
    pub base_value: Option<Value>,
    pub default_value: Option<Value>,
    pub children: Vec<TreeNode>,
    pub is_leaf: bool,
    /// Key present in the local data, regardless of its value.
    pub is_set: bool,
    pub depth: usize,
    pub change: Change,
    /// Own change or a change anywhere below.
    pub has_changes: bool,
    /// Value from the parallel scope, only when not set locally.
    pub inherited_value: Option<Value>,
    pub inherited_from: Option<ConfigScope>,
    /// Local value, else inherited value, else schema default.
    pub effective_value: Option<Value>,
    /// No schema property declares this key.
    pub unknown: bool,
    pub deprecated: bool,
    pub deprecated_message: Option<String>,
}

impl TreeNode {
    pub fn is_branch(&self) -> bool {
        !self.is_leaf
    }
}

/// Reconcile `schema` with the configuration snapshots.
///
/// * `data` - effective data of the edited scope
/// * `inherited` - effective data of the scope `data` inherits from
/// * `baseline` - persisted data of the edited scope; change tracking is
///   disabled without it
///
/// Root keys are the union of schema, data and baseline keys in canonical
/// order.
pub fn build_tree(
    schema: &BTreeMap<String, SchemaNode>,
    data: &Map<String, Value>,
    inherited: Option<&Map<String, Value>>,
    baseline: Option<&Map<String, Value>>,
) -> Vec<TreeNode> {
    let keys = schema
        .keys()
        .chain(data.keys())
        .chain(baseline.into_iter().flat_map(|b| b.keys()))
        .cloned();

    sort_keys(keys)
        .into_iter()
        .map(|key| {
            let declared = schema.get(&key);
            let node_schema = declared.cloned().unwrap_or_default();
            let mut node = build_node(&key, key.clone(), node_schema, data, 0, inherited, baseline);
            node.unknown = declared.is_none();
            node
        })
        .collect()
}

fn as_object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object)
}

fn build_node(
    key: &str,
    path: String,
    schema: SchemaNode,
    data: &Map<String, Value>,
    depth: usize,
    inherited: Option<&Map<String, Value>>,
    baseline: Option<&Map<String, Value>>,
) -> TreeNode {
    let value = data.get(key).cloned();
    let is_set = value.is_some();
    let base_value = baseline.and_then(|b| b.get(key)).cloned();

    // mixed unions become branches only while their value is an object
    let mixed_object = schema.kind == SchemaKind::Mixed
        && schema.properties.is_some()
        && value.as_ref().is_some_and(Value::is_object);
    let is_leaf = !matches!(schema.kind, SchemaKind::Object | SchemaKind::Array) && !mixed_object;

    let raw_inherited = inherited.and_then(|i| i.get(key));
    let inherited_value = if is_set { None } else { raw_inherited.cloned() };
    let inherited_from = inherited_value.as_ref().map(|_| ConfigScope::Global);

    let effective_value = if is_set {
        value.clone()
    } else {
        raw_inherited.cloned().or_else(|| schema.default.clone())
    };

    let change = match (baseline, &value, &base_value) {
        (None, _, _) => Change::Unchanged,
        (Some(_), Some(_), None) => Change::Added,
        (Some(_), None, Some(_)) => Change::Deleted,
        (Some(_), Some(current), Some(base)) if current != base => Change::Edited,
        _ => Change::Unchanged,
    };

    let mut node = TreeNode {
        path,
        key: key.to_string(),
        value,
        base_value,
        default_value: schema.default.clone(),
        children: Vec::new(),
        is_leaf,
        is_set,
        depth,
        change,
        has_changes: change != Change::Unchanged,
        inherited_value,
        inherited_from,
        effective_value,
        unknown: false,
        deprecated: schema.deprecated,
        deprecated_message: schema.deprecated_message.clone(),
        schema,
    };

    if node.schema.kind == SchemaKind::Object || mixed_object {
        let empty = Map::new();
        let child_data = as_object(node.value.as_ref()).unwrap_or(&empty);
        let child_baseline = baseline.map(|_| as_object(node.base_value.as_ref()).unwrap_or(&empty));
        let child_inherited = inherited.map(|_| as_object(raw_inherited).unwrap_or(&empty));

        let declared = node.schema.properties.iter().flat_map(|p| p.keys());
        let keys = declared
            .chain(child_data.keys())
            .chain(child_baseline.into_iter().flat_map(|b| b.keys()))
            .cloned();

        let children: Vec<TreeNode> = sort_keys(keys)
            .into_iter()
            .map(|child_key| {
                let declared = node.schema.property(&child_key).is_some();
                let child_schema = node.schema.child_schema(&child_key);
                let child_path = format!("{}.{child_key}", node.path);
                let mut child = build_node(
                    &child_key,
                    child_path,
                    child_schema,
                    child_data,
                    depth + 1,
                    child_inherited,
                    child_baseline,
                );
                child.unknown = !declared;
                child
            })
            .collect();

        node.has_changes = node.has_changes || children.iter().any(|c| c.has_changes);
        node.children = children;
    } else if node.schema.kind == SchemaKind::Array {
        let item_schema = node.schema.items.as_deref().cloned().unwrap_or_default();
        let items = node.value.as_ref().and_then(Value::as_array);
        node.children = items
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(i, item)| TreeNode {
                path: format!("{}.{i}", node.path),
                key: i.to_string(),
                schema: item_schema.clone(),
                value: Some(item.clone()),
                base_value: None,
                default_value: None,
                children: Vec::new(),
                is_leaf: true,
                is_set: true,
                depth: depth + 1,
                change: Change::Unchanged,
                has_changes: false,
                inherited_value: None,
                inherited_from: None,
                effective_value: Some(item.clone()),
                unknown: false,
                deprecated: false,
                deprecated_message: None,
            })
            .collect();
    }

    node
}

/// Find a node by its dot path.
pub fn node_by_path<'a>(tree: &'a [TreeNode], dot_path: &str) -> Option<&'a TreeNode> {
    let mut level = tree;
    let mut found = None;
    for part in dot_path.split('.') {
        let node = level.iter().find(|n| n.key == part)?;
        found = Some(node);
        level = &node.children;
    }
    found
}

/// Value an editor starts from when creating `schema` from scratch.
pub fn default_value_for_schema(schema: &SchemaNode) -> Value {
    if let Some(default) = &schema.default {
        return default.clone();
    }
    match schema.kind {
        SchemaKind::Object | SchemaKind::Mixed => Value::Object(Map::new()),
        SchemaKind::Array => Value::Array(Vec::new()),
        SchemaKind::Boolean => Value::Bool(false),
        SchemaKind::Number => Value::from(0),
        SchemaKind::String => Value::String(String::new()),
        SchemaKind::Enum => Value::String(
            schema
                .enum_values
                .as_ref()
                .and_then(|v| v.first())
                .cloned()
                .unwrap_or_default(),
        ),
    }
}
