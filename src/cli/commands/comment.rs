use chrono::Utc;
use issue_core::{IssueError, IssueRepository, User};

use crate::cli::{CommentArgs, parse_id};
use crate::config::{CliOverrides, Workspace};
use crate::error::Result;
use crate::format::{IssueDetails, print_json};

/// Execute the comment command.
///
/// The author comes from `--author`, falling back to the configured actor.
///
/// # Errors
///
/// Returns an error if no author is known, the text is blank or too long,
/// or the issue does not exist.
pub fn execute(args: &CommentArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    let id = parse_id(&args.id)?;
    let workspace = Workspace::discover(overrides)?;

    let author = match &args.author {
        Some(raw) => raw.parse::<User>()?,
        None => workspace.config().actor_user()?.ok_or_else(|| {
            IssueError::validation("author", "no author: pass --author or configure an actor")
        })?,
    };

    let mut store = workspace.open_store()?;
    let issue = store.comment(&id, author, &args.text, Utc::now())?;
    store.commit()?;

    if json {
        print_json(&IssueDetails::new(issue))?;
    } else {
        let number = issue.comments().last().map_or(0, |c| c.id);
        println!("Commented on {id} (#{number})");
    }
    Ok(())
}
