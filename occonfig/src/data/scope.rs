use std::{
    fmt,
    path::{Path, PathBuf},
};

use log::debug;
use serde_json::{Map, Value};

use crate::{
    data::modification::{Modification, apply_modifications},
    error::ConfigError,
    jsonc::JsoncError,
    writer::{ConfigFormat, NEW_CONFIG_TEMPLATE, read_config, write_config},
};

/// Which configuration layer is being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConfigScope {
    /// Per-user configuration.
    #[default]
    Global,
    /// Configuration of the current project; inherits from [`ConfigScope::Global`].
    Project,
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigScope::Global => write!(f, "global"),
            ConfigScope::Project => write!(f, "project"),
        }
    }
}

/// Persisted state of one scope plus its unsaved modifications.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeSnapshot {
    /// Data as last read from disk.
    pub data: Map<String, Value>,
    /// Text as last read from disk.
    pub raw_text: String,
    pub file_path: PathBuf,
    pub exists: bool,
    pub format: ConfigFormat,
    /// Problems skipped while reading a malformed file.
    pub parse_errors: Vec<JsoncError>,
    /// Unsaved modifications, oldest first.
    pub modifications: Vec<Modification>,
}

impl ScopeSnapshot {
    /// Snapshot for a file that has not been read.
    pub fn empty(file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        Self {
            data: Map::new(),
            raw_text: String::new(),
            format: ConfigFormat::from_path(&file_path),
            exists: false,
            file_path,
            parse_errors: Vec::new(),
            modifications: Vec::new(),
        }
    }

    /// Read `file_path`. A missing file gives an empty snapshot.
    pub fn load(file_path: &Path) -> Result<Self, ConfigError> {
        let read = read_config(file_path)?;
        Ok(Self {
            data: read.data,
            raw_text: read.raw_text,
            file_path: file_path.to_path_buf(),
            exists: file_path.exists(),
            format: read.format,
            parse_errors: read.parse_errors,
            modifications: Vec::new(),
        })
    }

    /// Persisted data with the pending modifications replayed on top.
    pub fn effective_data(&self) -> Map<String, Value> {
        apply_modifications(&self.data, &self.modifications)
    }

    pub fn is_dirty(&self) -> bool {
        !self.modifications.is_empty()
    }

    pub fn push(&mut self, modification: Modification) {
        self.modifications.push(modification);
    }

    /// Write pending modifications and reload the file.
    ///
    /// A file that does not exist yet starts from [`NEW_CONFIG_TEMPLATE`].
    /// Without pending modifications nothing is written.
    pub fn save(&mut self) -> Result<(), ConfigError> {
        if !self.is_dirty() {
            return Ok(());
        }

        let original = if self.exists {
            self.raw_text.as_str()
        } else {
            NEW_CONFIG_TEMPLATE
        };
        write_config(&self.file_path, original, &self.modifications)?;
        debug!(
            "Saved {} modification(s) to {}",
            self.modifications.len(),
            self.file_path.display()
        );

        *self = Self::load(&self.file_path)?;
        Ok(())
    }
}
