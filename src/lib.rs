//! `issue_tracker` - command-line front end for `issue-core`
//!
//! The `itr` binary keeps issues in a `.issues/` workspace: a YAML config
//! and a JSONL data file. Every command maps onto one repository operation
//! of the core crate.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Workspace discovery and layered configuration
//! - [`error`] - Error types and exit codes
//! - [`format`] - Output formatting (text, JSON)
//! - [`logging`] - tracing subscriber setup
//! - [`validation`] - Data file checks used by `itr check`

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod validation;

pub use cli::run;
pub use error::{AppError, Result};
