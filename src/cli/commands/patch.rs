use issue_core::{IssueRepository, PatchField, PatchValue};

use crate::cli::{PatchArgs, parse_id};
use crate::config::{CliOverrides, Workspace};
use crate::error::Result;
use crate::format::{IssueDetails, print_json};

/// Execute the patch command.
///
/// # Errors
///
/// Returns an error if the field is not patchable, the value does not fit
/// the field, or the issue does not exist.
pub fn execute(args: &PatchArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    let id = parse_id(&args.id)?;
    let field: PatchField = args.field.parse()?;
    let value = PatchValue::parse(field, &args.value)?;

    let workspace = Workspace::discover(overrides)?;
    let mut store = workspace.open_store()?;

    let issue = store.patch(&id, field, value)?;
    store.commit()?;

    if json {
        print_json(&IssueDetails::new(issue))?;
    } else {
        println!("Updated {id}: {field} = {}", args.value.trim());
    }
    Ok(())
}
