use issue_core::{CommandKind, IssueRepository};

use crate::cli::{TransitionArgs, parse_at, parse_id};
use crate::config::{CliOverrides, Workspace};
use crate::error::Result;
use crate::format::{IssueDetails, print_json};

/// Execute the transition command.
///
/// # Errors
///
/// Returns an error if the issue does not exist, the command is unknown, or
/// the workflow does not allow the command in the issue's current state.
pub fn execute(args: &TransitionArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    let id = parse_id(&args.id)?;
    let kind: CommandKind = args.command.parse()?;
    let at = parse_at(args.at.as_deref())?;

    let workspace = Workspace::discover(overrides)?;
    let mut store = workspace.open_store()?;

    let before = store.get_by_id(&id)?.state();
    let issue = store.transition(&id, kind, at)?;
    store.commit()?;
    tracing::info!(%id, command = %kind, from = %before, to = %issue.state(), "transition");

    if json {
        print_json(&IssueDetails::new(issue))?;
    } else {
        println!("{id}: {before} -> {}", issue.state());
    }
    Ok(())
}
