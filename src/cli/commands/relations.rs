use issue_core::{CancellationToken, IssueRepository, PagingOptions, SortingOptions};

use super::list::print_page;
use crate::cli::{RelationArgs, parse_id};
use crate::config::{CliOverrides, Workspace};
use crate::error::Result;

/// Execute the children command.
///
/// # Errors
///
/// Returns an error if the issue does not exist or sorting/paging is invalid.
pub fn execute_children(args: &RelationArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    run(args, json, overrides, true)
}

/// Execute the parents command.
///
/// # Errors
///
/// Returns an error if the issue does not exist or sorting/paging is invalid.
pub fn execute_parents(args: &RelationArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    run(args, json, overrides, false)
}

fn run(args: &RelationArgs, json: bool, overrides: &CliOverrides, children: bool) -> Result<()> {
    let id = parse_id(&args.id)?;
    let workspace = Workspace::discover(overrides)?;
    let store = workspace.open_store()?;

    let sorting = SortingOptions::parse(args.sort.as_deref())?;
    let paging = PagingOptions::new(
        args.page.unwrap_or(1),
        args.page_size.unwrap_or(workspace.config().page_size),
    )?;
    let cancel = CancellationToken::new();

    let page = if children {
        store.children(&id, &sorting, paging, &cancel)?
    } else {
        store.parents(&id, &sorting, paging, &cancel)?
    };
    print_page(page, &sorting, json)
}
