use issue_core::{IssueBuilder, IssueError, IssueRepository, IssueType, Priority, User};

use crate::cli::{CreateArgs, parse_id};
use crate::config::{CliOverrides, Workspace};
use crate::error::Result;
use crate::format::{IssueDetails, print_json};

/// Execute the create command.
///
/// # Errors
///
/// Returns an error if validation fails, the workspace cannot be opened, or
/// the referenced epic does not exist.
pub fn execute(args: &CreateArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    let title = args
        .title
        .clone()
        .or_else(|| args.title_flag.clone())
        .ok_or_else(|| IssueError::validation("title", "cannot be empty"))?;

    let workspace = Workspace::discover(&CliOverrides {
        project: args.project.clone(),
        ..overrides.clone()
    })?;
    let config = workspace.config();
    let mut store = workspace.open_store()?;

    let id = store.next_identifier(&config.project)?;
    let mut builder = IssueBuilder::new().id(id).title(title);

    if let Some(p) = &args.priority {
        builder = builder.priority(p.parse::<Priority>()?);
    }
    if let Some(t) = &args.type_ {
        builder = builder.issue_type(t.parse::<IssueType>()?);
    }
    if let Some(description) = &args.description {
        builder = builder.description(description.clone());
    }
    if let Some(raw) = &args.epic {
        let epic_id = parse_id(raw)?;
        let epic = store.get_by_id(&epic_id)?;
        if epic.issue_type() != IssueType::Epic {
            return Err(IssueError::validation(
                "epicId",
                format!("{epic_id} is a {}, not an epic", epic.issue_type()),
            )
            .into());
        }
        builder = builder.epic_id(epic_id);
    }
    if let Some(raw) = &args.assignee {
        builder = builder.assignee(raw.parse::<User>()?);
    }
    let reporter = match &args.reporter {
        Some(raw) => Some(raw.parse::<User>()?),
        None => config.actor_user()?,
    };
    if let Some(reporter) = reporter {
        builder = builder.reporter(reporter);
    }

    let issue = store.add(builder.build()?)?;
    store.commit()?;

    if json {
        print_json(&IssueDetails::new(issue))?;
    } else {
        println!("Created {}: {}", issue.id(), issue.title());
    }
    Ok(())
}
