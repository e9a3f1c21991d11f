//! Output formatting for `itr`.
//!
//! Supports both human-readable text output and machine-parseable JSON.
//! With `--json`, stdout carries only JSON and diagnostics go to stderr.
//!
//! # JSON Output Types
//!
//! - [`IssueDetails`] - Issue with allowed commands (show, create, transition, patch)
//! - [`PageEnvelope`] - One page of summaries plus paging metadata (list)
//! - [`LinkOutcome`] - Link edge and whether it changed (link, unlink)
//! - [`CheckReport`] - Validation findings (check)

mod output;
mod text;

pub use output::{CheckFinding, CheckReport, IssueDetails, LinkOutcome, PageEnvelope};
pub use text::{
    TITLE_WIDTH, format_issue_line, format_priority, format_state_icon, format_type_badge,
    truncate_to_width,
};

use serde::Serialize;

use crate::error::Result;

/// Print `value` as pretty JSON on stdout.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
