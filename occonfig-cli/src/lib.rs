//! # occonfig-cli
//!
//! The `occonfig` command line: scripted access to the global and project
//! opencode configuration files.
//!
//! - [`cli`] - argument definitions
//! - [`commands`] - `get`, `set`, `delete`, `list`, `validate`, `path`, `tree`, `init`
//! - [`remote`] - schema and model catalog downloads

pub mod cli;
pub mod commands;
pub mod remote;
