use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{jsonc::JsoncError, writer::WriteError};

/// Errors raised while loading or querying configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The dot path has no value in the document.
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// The file exists but nothing in it can be read as JSONC.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: JsoncError,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Write(#[from] WriteError),
}
