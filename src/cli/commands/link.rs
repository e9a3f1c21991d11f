use issue_core::{IssueLink, IssueRepository, LinkType};

use crate::cli::{LinkArgs, parse_id};
use crate::config::{CliOverrides, Workspace};
use crate::error::Result;
use crate::format::{LinkOutcome, print_json};

/// Execute the link command.
///
/// # Errors
///
/// Returns an error for a self-link, an unknown link type, or a missing issue.
pub fn execute_link(args: &LinkArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    run(args, json, overrides, true)
}

/// Execute the unlink command.
///
/// # Errors
///
/// Returns an error for an unknown link type or a missing issue.
pub fn execute_unlink(args: &LinkArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    run(args, json, overrides, false)
}

fn run(args: &LinkArgs, json: bool, overrides: &CliOverrides, add: bool) -> Result<()> {
    let source = parse_id(&args.source)?;
    let target = parse_id(&args.target)?;
    let link_type: LinkType = args.type_.parse()?;
    let link = IssueLink::new(link_type, source.clone(), target.clone())?;

    let workspace = Workspace::discover(overrides)?;
    let mut store = workspace.open_store()?;

    let changed = if add {
        store.link(&source, &target, link_type)?
    } else {
        store.unlink(&source, &target, link_type)?
    };
    store.commit()?;

    if json {
        print_json(&LinkOutcome { link, changed })?;
    } else {
        let edge = format!("{source} -[{link_type}]-> {target}");
        match (add, changed) {
            (true, true) => println!("Linked {edge}"),
            (true, false) => println!("Already linked {edge}"),
            (false, true) => println!("Unlinked {edge}"),
            (false, false) => println!("No link {edge}"),
        }
    }
    Ok(())
}
