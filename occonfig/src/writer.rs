//! Reading and persisting configuration documents.
//!
//! Saving applies modifications as structural text edits so comments and
//! formatting of untouched keys survive. When the edited text no longer
//! parses, the document is rebuilt from its parsed values instead. Every
//! overwrite of an existing file leaves a timestamped backup next to it, and
//! the new content is written to a temporary sibling that is renamed into
//! place.

use std::{
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDateTime};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    data::modification::{Modification, apply_to_map},
    error::ConfigError,
    jsonc::{self, FormattingOptions, JsoncError, apply_edits, compute_edits},
};

/// Tag embedded in backup file names.
pub const PRODUCT_TAG: &str = "occonfig";

/// Content of a freshly created configuration file.
pub const NEW_CONFIG_TEMPLATE: &str = "{\n\t\"$schema\": \"https://opencode.ai/config.json\"\n}\n";

const BACKUP_TIMESTAMP: &str = "%Y-%m-%dT%H-%M-%S";

/// Errors raised while writing a configuration file.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to edit document: {0}")]
    Edit(#[from] JsoncError),

    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Nothing could be recovered from the existing text, so rewriting it
    /// would discard its content.
    #[error("refusing to rewrite unreadable document: {0}")]
    Unreadable(JsoncError),

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WriteError {
    fn io(path: &Path, source: io::Error) -> Self {
        WriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// On-disk flavour of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    Json,
    #[default]
    Jsonc,
}

impl ConfigFormat {
    /// `.jsonc` files are JSONC; everything else is treated as plain JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("jsonc") => ConfigFormat::Jsonc,
            _ => ConfigFormat::Json,
        }
    }
}

/// A configuration file as loaded from disk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadResult {
    pub data: Map<String, Value>,
    /// Exact file content; empty when the file does not exist.
    pub raw_text: String,
    pub format: ConfigFormat,
    /// Problems skipped while reading; `data` holds what was recoverable.
    pub parse_errors: Vec<JsoncError>,
}

/// Detect the indentation unit of a document.
///
/// The first line starting with a tab selects a tab; the first line starting
/// with spaces selects that run of spaces. Defaults to a tab.
pub fn detect_indent(text: &str) -> String {
    for line in text.lines() {
        if line.starts_with('\t') {
            return "\t".to_string();
        }
        let spaces = line.len() - line.trim_start_matches(' ').len();
        if spaces > 0 {
            return " ".repeat(spaces);
        }
    }
    "\t".to_string()
}

/// Produce the new document text for `modifications` applied to `original_text`.
///
/// # Errors
///
/// Returns [`WriteError::Edit`] when a modification cannot be expressed on the
/// document (for example setting a key inside a string value) and
/// [`WriteError::Serialize`] when the rebuilt document fails to serialize.
pub fn render_config(
    original_text: &str,
    modifications: &[Modification],
) -> Result<String, WriteError> {
    let indent = detect_indent(original_text);

    match apply_structural(original_text, modifications, &indent) {
        Ok(text) if parses_to_value(&text) => return Ok(text),
        Ok(_) => warn!("edited document no longer parses, rebuilding it"),
        Err(JsoncError::Parse { offset, message }) => {
            warn!("cannot edit document in place ({message} at offset {offset}), rebuilding it")
        }
        Err(e) => return Err(e.into()),
    }

    reconstruct(original_text, modifications, &indent)
}

fn apply_structural(
    original_text: &str,
    modifications: &[Modification],
    indent: &str,
) -> Result<String, JsoncError> {
    let options = FormattingOptions::for_text(original_text, indent);
    let mut text = original_text.to_string();
    for modification in modifications {
        let edits = compute_edits(&text, &modification.path, modification.value.as_ref(), &options)?;
        text = apply_edits(&text, &edits)?;
    }
    Ok(text)
}

fn parses_to_value(text: &str) -> bool {
    matches!(jsonc::parse(text), Ok(Some(value)) if !value.is_null())
}

fn reconstruct(
    original_text: &str,
    modifications: &[Modification],
    indent: &str,
) -> Result<String, WriteError> {
    let parsed = jsonc::parse_tree_tolerant(original_text);
    let mut base = match (parsed.value(), parsed.errors.first()) {
        (Some(Value::Object(map)), _) => map,
        (None, Some(error)) => return Err(WriteError::Unreadable(error.clone())),
        _ => Map::new(),
    };
    if !parsed.is_clean() {
        warn!(
            "rebuilding document from its readable part ({} parse error(s)), comments are lost",
            parsed.errors.len()
        );
    }
    for modification in modifications {
        apply_to_map(&mut base, modification);
    }

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    Value::Object(base).serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Apply `modifications` to `original_text` and persist the result to `path`.
///
/// An existing file is first copied to [`free_backup_path`]. The destination
/// directory is created when missing.
pub fn write_config(
    path: &Path,
    original_text: &str,
    modifications: &[Modification],
) -> Result<(), WriteError> {
    let content = render_config(original_text, modifications)?;

    if path.exists() {
        let backup = free_backup_path(path, Local::now().naive_local());
        fs::copy(path, &backup).map_err(|e| WriteError::io(&backup, e))?;
        info!("Backed up {} to {}", path.display(), backup.display());
    }

    ensure_parent(path)?;

    let tmp = sibling(path, ".tmp");
    fs::write(&tmp, content).map_err(|e| WriteError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| WriteError::io(path, e))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Backup location for `path` taken at `at`:
/// `<name>.occonfig.backup.<YYYY-MM-DDTHH-MM-SS>`.
pub fn backup_path(path: &Path, at: NaiveDateTime) -> PathBuf {
    let suffix = format!(".{PRODUCT_TAG}.backup.{}", at.format(BACKUP_TIMESTAMP));
    sibling(path, &suffix)
}

/// [`backup_path`], followed by `.1`, `.2`, ... when that name is taken by a
/// backup made earlier within the same second.
pub fn free_backup_path(path: &Path, at: NaiveDateTime) -> PathBuf {
    let base = backup_path(path, at);
    let mut candidate = base.clone();
    let mut n = 1;
    while candidate.exists() {
        candidate = sibling(&base, &format!(".{n}"));
        n += 1;
    }
    candidate
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<(), WriteError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            fs::create_dir_all(dir).map_err(|e| WriteError::io(dir, e))
        }
        _ => Ok(()),
    }
}

/// Load a configuration file.
///
/// A missing file yields empty data and empty text. A document whose root is
/// not an object is treated as empty. Malformed documents keep every value
/// that could be read, with the problems listed in
/// [`ReadResult::parse_errors`].
///
/// # Errors
///
/// [`ConfigError::Parse`] when nothing at all can be read from a non-empty
/// file, [`ConfigError::Io`] when it cannot be read.
pub fn read_config(path: &Path) -> Result<ReadResult, ConfigError> {
    let format = ConfigFormat::from_path(path);
    if !path.exists() {
        return Ok(ReadResult {
            format,
            ..Default::default()
        });
    }

    let raw_text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = jsonc::parse_tree_tolerant(&raw_text);
    if let Some(first) = parsed.errors.first() {
        if parsed.root.is_none() {
            return Err(ConfigError::Parse {
                path: path.to_path_buf(),
                source: first.clone(),
            });
        }
        warn!(
            "{}: {} parse error(s), first: {first}; using the readable part",
            path.display(),
            parsed.errors.len()
        );
    }

    let data = match parsed.value() {
        Some(Value::Object(map)) => map,
        None => Map::new(),
        Some(other) => {
            warn!(
                "{} does not contain an object (found {}), ignoring its content",
                path.display(),
                kind_name(&other)
            );
            Map::new()
        }
    };

    Ok(ReadResult {
        data,
        raw_text,
        format,
        parse_errors: parsed.errors,
    })
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Create `path` with [`NEW_CONFIG_TEMPLATE`], creating parent directories.
pub fn create_new_config(path: &Path) -> Result<(), WriteError> {
    ensure_parent(path)?;
    fs::write(path, NEW_CONFIG_TEMPLATE).map_err(|e| WriteError::io(path, e))?;
    info!("Created {}", path.display());
    Ok(())
}
