//! Show command implementation.

use issue_core::{CommandKind, Issue, IssueRepository};

use crate::cli::{ShowArgs, parse_id};
use crate::config::{CliOverrides, Workspace};
use crate::error::Result;
use crate::format::{IssueDetails, format_priority, format_state_icon, print_json};

/// Execute the show command.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or any issue is not found.
pub fn execute(args: &ShowArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    let workspace = Workspace::discover(overrides)?;
    let store = workspace.open_store()?;

    let mut details = Vec::with_capacity(args.ids.len());
    for raw in &args.ids {
        let id = parse_id(raw)?;
        details.push(IssueDetails::new(store.get_by_id(&id)?));
    }

    if json {
        print_json(&details)?;
    } else {
        for detail in &details {
            print!("{}", render_details(detail));
            println!("----------------------------------------");
        }
    }
    Ok(())
}

/// Multi-line text rendering of one issue.
#[must_use]
pub fn render_details(details: &IssueDetails) -> String {
    let issue: &Issue = &details.issue;
    let mut out = format!("{} {}\n", issue.id(), issue.title());
    out.push_str(&format!(
        "State: {} {}   Priority: {} ({})   Type: {}\n",
        format_state_icon(issue.state()),
        issue.state(),
        issue.priority(),
        format_priority(issue.priority()),
        issue.issue_type()
    ));
    if let Some(epic) = issue.epic_id() {
        out.push_str(&format!("Epic: {epic}\n"));
    }
    if let Some(assignee) = issue.assignee() {
        out.push_str(&format!("Assignee: {assignee}\n"));
    }
    if let Some(reporter) = issue.reporter() {
        out.push_str(&format!("Reporter: {reporter}\n"));
    }
    if let Some(start) = issue.start_time() {
        out.push_str(&format!("Started: {}\n", start.to_rfc3339()));
    }
    if let Some(stop) = issue.stop_time() {
        out.push_str(&format!("Stopped: {}\n", stop.to_rfc3339()));
    }
    out.push_str(&format!(
        "Created: {}   Updated: {}   Revision: {}\n",
        issue.created_at().to_rfc3339(),
        issue.updated_at().to_rfc3339(),
        issue.revision()
    ));

    let outgoing: Vec<_> = issue.outgoing_links().collect();
    let incoming: Vec<_> = issue.incoming_links().collect();
    if !outgoing.is_empty() || !incoming.is_empty() {
        out.push_str("Links:\n");
        for link in outgoing {
            out.push_str(&format!("  -> {} {}\n", link.link_type, link.target_id));
        }
        for link in incoming {
            out.push_str(&format!("  <- {} {}\n", link.link_type, link.source_id));
        }
    }

    if details.is_terminal {
        out.push_str("Allowed commands: none (terminal state)\n");
    } else {
        let names: Vec<&str> = details
            .allowed_commands
            .iter()
            .copied()
            .map(CommandKind::as_str)
            .collect();
        out.push_str(&format!("Allowed commands: {}\n", names.join(", ")));
    }

    if !issue.description().is_empty() {
        out.push_str(&format!("\n{}\n", issue.description()));
    }

    if !issue.comments().is_empty() {
        out.push_str("\nComments:\n");
        for comment in issue.comments() {
            out.push_str(&format!(
                "  #{} {} ({}): {}\n",
                comment.id,
                comment.author,
                comment.created_at.to_rfc3339(),
                comment.content
            ));
        }
    }
    out
}
