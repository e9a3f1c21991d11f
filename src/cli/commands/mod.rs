//! Command implementations.
//!
//! Each command discovers the workspace, opens the store, does its work and
//! commits before printing, so a failed command never leaves partial output.

pub mod check;
pub mod comment;
pub mod create;
pub mod delete;
pub mod init;
pub mod link;
pub mod list;
pub mod patch;
pub mod relations;
pub mod show;
pub mod transition;
