use issue_core::{IssueIdentifier, IssueRepository};

use crate::cli::{DeleteArgs, parse_id};
use crate::config::{CliOverrides, Workspace};
use crate::error::Result;
use crate::format::print_json;

/// Execute the delete command.
///
/// Every id is checked before anything is removed, so an unknown id leaves
/// the data file untouched.
///
/// # Errors
///
/// Returns an error if any id is malformed or not found.
pub fn execute(args: &DeleteArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    let ids = args
        .ids
        .iter()
        .map(|raw| parse_id(raw))
        .collect::<Result<Vec<IssueIdentifier>>>()?;

    let workspace = Workspace::discover(overrides)?;
    let mut store = workspace.open_store()?;

    for id in &ids {
        store.get_by_id(id)?;
    }
    let mut deleted = Vec::with_capacity(ids.len());
    for id in &ids {
        if store.exists(id) {
            deleted.push(store.delete_by_id(id)?.id().clone());
        }
    }
    store.commit()?;

    if json {
        print_json(&serde_json::json!({ "deleted": deleted }))?;
    } else {
        for id in &deleted {
            println!("Deleted {id}");
        }
    }
    Ok(())
}
