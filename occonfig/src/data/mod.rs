//! Configuration data model.
//!
//! - [`schema`] - schema document to [`schema::SchemaNode`] tree
//! - [`modification`] - pending edits and how they apply to a document
//! - [`scope`] - one configuration file plus its pending edits
//! - [`tree`] - schema reconciled with the data of a scope
//! - [`flatten`] - display projection and search over the tree
//! - [`app_data`] - editing state over both scopes

pub mod app_data;
pub mod fields;
pub mod flatten;
pub mod history;
pub mod modification;
pub mod schema;
pub mod scope;
pub mod tree;

pub use app_data::AppData;
