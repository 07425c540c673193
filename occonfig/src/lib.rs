//! # occonfig
//!
//! Schema-aware editing of layered JSONC configuration files.
//!
//! A configuration lives in two scopes: a global file in the user's config
//! directory and a project file found by walking up from the working
//! directory. [`AppData`] loads both, reconciles them with a JSON Schema into
//! a [`data::tree::TreeNode`] tree, queues edits with undo support and writes
//! them back while keeping comments and formatting of untouched keys.
//!
//! ```rust,no_run
//! use occonfig::{AppData, paths::{ConfigLocations, ScopeRequest}};
//! use serde_json::json;
//!
//! let locations = ConfigLocations::from_env()?;
//! let mut app = AppData::load(&locations, ScopeRequest::Auto, None)?;
//! app.edit_value(vec!["theme".into()], json!("nord"));
//! app.save()?;
//! # anyhow::Ok(())
//! ```
//!
//! ## Modules
//!
//! - [`data`] - schema, tree, modifications and application state
//! - [`jsonc`] - JSONC parsing and structural edits
//! - [`writer`] - reading and writing config files with backups
//! - [`validate`] - schema and rule based diagnostics
//! - [`catalog`] - model catalog and cached remote documents
//! - [`scroll`] - viewport planning for grouped lists
//! - [`paths`] - config file discovery

pub mod catalog;
pub mod data;
pub mod error;
pub mod jsonc;
pub mod paths;
pub mod scroll;
pub mod validate;
pub mod writer;

pub use data::AppData;
pub use error::ConfigError;
pub use serde_json::Value;
