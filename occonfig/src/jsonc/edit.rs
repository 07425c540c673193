use serde::Serialize;
use serde_json::{Map, Value, ser::PrettyFormatter};

use super::{JsoncError, Node, NodeKind, parse_tree};

/// Replace `length` bytes at `offset` with `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub offset: usize,
    pub length: usize,
    pub content: String,
}

/// Layout used for newly inserted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattingOptions {
    /// One indentation level, e.g. `"\t"` or `"  "`.
    pub indent: String,
    /// Line terminator.
    pub eol: String,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            indent: "\t".to_string(),
            eol: "\n".to_string(),
        }
    }
}

impl FormattingOptions {
    /// Options for editing `text` with the given indentation unit, keeping
    /// the document's line terminator.
    pub fn for_text(text: &str, indent: impl Into<String>) -> Self {
        let eol = if text.contains("\r\n") { "\r\n" } else { "\n" };
        Self {
            indent: indent.into(),
            eol: eol.to_string(),
        }
    }
}

/// Compute the edits that set (`Some`) or remove (`None`) the value at `path`.
///
/// Missing intermediate objects are created by inserting a nested value into
/// the deepest existing parent. Removing a path that does not exist yields no
/// edits, as does setting a value equal to the one already present.
///
/// # Errors
///
/// Fails when `text` is not valid JSONC, when a segment addresses the inside
/// of a scalar, or when an array is addressed by a non-numeric segment.
pub fn compute_edits(
    text: &str,
    path: &[String],
    value: Option<&Value>,
    options: &FormattingOptions,
) -> Result<Vec<Edit>, JsoncError> {
    let Some(root) = parse_tree(text)? else {
        return match value {
            None => Ok(Vec::new()),
            Some(value) => {
                let wrapped = path
                    .iter()
                    .rev()
                    .fold(value.clone(), |inner, segment| wrap(segment, inner));
                Ok(vec![Edit {
                    offset: 0,
                    length: text.len(),
                    content: serialize(&wrapped, options, "")?,
                }])
            }
        };
    };

    let Some((last, parent_path)) = path.split_last() else {
        return match value {
            Some(value) => Ok(vec![replace(text, &root, value, options)?]),
            None => Err(JsoncError::Unsupported(
                "cannot remove the document root".to_string(),
            )),
        };
    };

    let mut value = value.cloned();
    let mut last = last.clone();
    let mut parent_len = parent_path.len();
    let parent = loop {
        if let Some(node) = root.find(&path[..parent_len]) {
            break node;
        }
        // the empty path always resolves to the root, so parent_len > 0 here
        let Some(inner) = value.take() else {
            return Ok(Vec::new());
        };
        value = Some(wrap(&last, inner));
        parent_len -= 1;
        last = path[parent_len].clone();
    };

    match parent.kind {
        NodeKind::Object => object_edit(text, parent, &last, value.as_ref(), options),
        NodeKind::Array => array_edit(text, parent, &last, value.as_ref(), options),
        kind => match value {
            None => Ok(Vec::new()),
            Some(_) => Err(JsoncError::Unsupported(format!(
                "cannot set `{last}` inside a {} value",
                kind.name()
            ))),
        },
    }
}

/// Apply `edits` to `text`.
///
/// Edits are applied from the highest offset down so earlier offsets stay
/// valid.
///
/// # Errors
///
/// Fails if an edit lies outside the text or splits a character.
pub fn apply_edits(text: &str, edits: &[Edit]) -> Result<String, JsoncError> {
    let mut ordered: Vec<&Edit> = edits.iter().collect();
    ordered.sort_by(|a, b| b.offset.cmp(&a.offset));

    let mut result = text.to_string();
    for edit in ordered {
        let end = edit.offset + edit.length;
        if end > result.len()
            || !result.is_char_boundary(edit.offset)
            || !result.is_char_boundary(end)
        {
            return Err(JsoncError::Unsupported(format!(
                "edit {}..{end} is outside the document",
                edit.offset
            )));
        }
        result.replace_range(edit.offset..end, &edit.content);
    }
    Ok(result)
}

fn wrap(segment: &str, inner: Value) -> Value {
    let mut map = Map::new();
    map.insert(segment.to_string(), inner);
    Value::Object(map)
}

fn object_edit(
    text: &str,
    parent: &Node,
    key: &str,
    value: Option<&Value>,
    options: &FormattingOptions,
) -> Result<Vec<Edit>, JsoncError> {
    let Some(index) = parent.property_index(key) else {
        return match value {
            None => Ok(Vec::new()),
            Some(value) => Ok(vec![insert_entry(text, parent, Some(key), value, options)?]),
        };
    };

    match value {
        None => Ok(vec![remove_entry(text, parent, index)]),
        Some(value) => {
            let existing = parent.children[index]
                .property_value()
                .ok_or_else(|| JsoncError::Unsupported(format!("property `{key}` has no value")))?;
            if existing.to_value() == *value {
                return Ok(Vec::new());
            }
            Ok(vec![replace(text, existing, value, options)?])
        }
    }
}

fn array_edit(
    text: &str,
    parent: &Node,
    segment: &str,
    value: Option<&Value>,
    options: &FormattingOptions,
) -> Result<Vec<Edit>, JsoncError> {
    let index = segment
        .parse::<usize>()
        .map_err(|_| JsoncError::Unsupported(format!("`{segment}` is not an array index")))?;

    match (parent.children.get(index), value) {
        (Some(_), None) => Ok(vec![remove_entry(text, parent, index)]),
        (Some(existing), Some(value)) => {
            if existing.to_value() == *value {
                return Ok(Vec::new());
            }
            Ok(vec![replace(text, existing, value, options)?])
        }
        (None, None) => Ok(Vec::new()),
        (None, Some(value)) => Ok(vec![insert_entry(text, parent, None, value, options)?]),
    }
}

fn replace(
    text: &str,
    node: &Node,
    value: &Value,
    options: &FormattingOptions,
) -> Result<Edit, JsoncError> {
    let indent = line_indent(text, node.offset);
    Ok(Edit {
        offset: node.offset,
        length: node.length,
        content: serialize(value, options, indent)?,
    })
}

fn remove_entry(text: &str, parent: &Node, index: usize) -> Edit {
    let entry = &parent.children[index];
    let close = parent.end() - 1;

    let (begin, end) = if index > 0 {
        // take the separating comma and whatever sits between the entries
        (parent.children[index - 1].end(), entry.end())
    } else if parent.children.len() > 1 {
        (entry.offset, parent.children[1].offset)
    } else {
        let tail = text[entry.end()..close].trim();
        let end = if tail.is_empty() || tail == "," {
            close
        } else {
            entry.end()
        };
        (parent.offset + 1, end)
    };

    Edit {
        offset: begin,
        length: end - begin,
        content: String::new(),
    }
}

fn insert_entry(
    text: &str,
    parent: &Node,
    key: Option<&str>,
    value: &Value,
    options: &FormattingOptions,
) -> Result<Edit, JsoncError> {
    let entry = |indent: &str| -> Result<String, JsoncError> {
        let rendered = serialize(value, options, indent)?;
        Ok(match key {
            Some(key) => format!("{}: {rendered}", Value::String(key.to_string())),
            None => rendered,
        })
    };

    match parent.children.last() {
        Some(last) => {
            let content = if text[parent.offset..parent.end()].contains('\n') {
                let indent = line_indent(text, last.offset);
                format!(",{}{indent}{}", options.eol, entry(indent)?)
            } else {
                let compact = serde_json::to_string(value)
                    .map_err(|e| JsoncError::Serialize(e.to_string()))?;
                match key {
                    Some(key) => format!(", {}: {compact}", Value::String(key.to_string())),
                    None => format!(", {compact}"),
                }
            };
            Ok(Edit {
                offset: last.end(),
                length: 0,
                content,
            })
        }
        None => {
            let parent_indent = line_indent(text, parent.offset);
            let child_indent = format!("{parent_indent}{}", options.indent);
            let interior = &text[parent.offset + 1..parent.end() - 1];
            let length = if interior.trim().is_empty() {
                interior.len()
            } else {
                0
            };
            Ok(Edit {
                offset: parent.offset + 1,
                length,
                content: format!(
                    "{eol}{child_indent}{}{eol}{parent_indent}",
                    entry(&child_indent)?,
                    eol = options.eol
                ),
            })
        }
    }
}

/// Leading whitespace of the line containing `offset`.
fn line_indent(text: &str, offset: usize) -> &str {
    let line_start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = &text[line_start..offset];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

/// Pretty-print `value`, continuing every line after the first at `base_indent`.
fn serialize(
    value: &Value,
    options: &FormattingOptions,
    base_indent: &str,
) -> Result<String, JsoncError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(options.indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| JsoncError::Serialize(e.to_string()))?;
    let pretty = String::from_utf8(buf).map_err(|e| JsoncError::Serialize(e.to_string()))?;

    let newline = format!("{}{base_indent}", options.eol);
    Ok(pretty.replace('\n', &newline))
}
