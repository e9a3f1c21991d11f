//! Command-line interface for `itr`.
//!
//! This module provides the CLI parsing and command routing using clap.

pub mod commands;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use issue_core::{IssueError, IssueIdentifier};

use crate::config::CliOverrides;
use crate::error::AppError;
use crate::logging;

/// `itr` - Issue tracker with a guarded workflow.
#[derive(Parser, Debug)]
#[command(name = "itr")]
#[command(
    author,
    version,
    about = "Issue tracker with a guarded workflow and a queryable store",
    long_about = None,
    after_help = "Data lives in .issues/issues.jsonl next to .issues/config.yaml."
)]
pub struct Cli {
    /// Output format: text (default) or json
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit diagnostics as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Acting user, as 'Full Name <id>' or a bare id
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize an issue workspace
    Init(InitArgs),

    /// Create a new issue
    Create(CreateArgs),

    /// List issues with filters, sorting and paging
    List(ListArgs),

    /// Show issue details
    Show(ShowArgs),

    /// Apply a workflow command to an issue
    #[command(alias = "mv")]
    Transition(TransitionArgs),

    /// Link two issues
    Link(LinkArgs),

    /// Remove a link between two issues
    Unlink(LinkArgs),

    /// Change one field of an issue
    Patch(PatchArgs),

    /// Add a comment to an issue
    Comment(CommentArgs),

    /// Delete issues and every link pointing at them
    Delete(DeleteArgs),

    /// List the children of an issue
    Children(RelationArgs),

    /// List the parents of an issue
    Parents(RelationArgs),

    /// Validate the data file
    Check,
}

#[derive(Args, Debug, Default)]
pub struct InitArgs {
    /// Project code for new issues (1-3 letters)
    #[arg(long)]
    pub project: Option<String>,

    /// Default page size for list
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Overwrite an existing configuration
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    /// Issue title
    pub title: Option<String>,

    /// Issue title (alternative to the positional argument)
    #[arg(long = "title")]
    pub title_flag: Option<String>,

    /// Description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Priority: high, medium or low
    #[arg(short, long)]
    pub priority: Option<String>,

    /// Type: epic, story, task, sub_task or defect
    #[arg(short = 't', long = "type")]
    pub type_: Option<String>,

    /// Epic this issue belongs to
    #[arg(long)]
    pub epic: Option<String>,

    /// Assignee, as 'Full Name <id>' or a bare id
    #[arg(long)]
    pub assignee: Option<String>,

    /// Reporter (defaults to the configured actor)
    #[arg(long)]
    pub reporter: Option<String>,

    /// Project code (defaults to the configured project)
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only issues in this project
    #[arg(long)]
    pub project: Option<String>,

    /// Priority filter (repeatable, any of)
    #[arg(short, long)]
    pub priority: Vec<String>,

    /// Type filter (repeatable, any of)
    #[arg(short = 't', long = "type")]
    pub type_: Vec<String>,

    /// State filter (repeatable, any of)
    #[arg(short, long)]
    pub state: Vec<String>,

    /// Epic filter; 'none' for issues without an epic
    #[arg(long)]
    pub epic: Option<String>,

    /// Case-insensitive title search
    #[arg(long)]
    pub search: Option<String>,

    /// Order by, e.g. "Priority, Title DESC"
    #[arg(long)]
    pub sort: Option<String>,

    /// Page number (1-based)
    #[arg(long)]
    pub page: Option<u32>,

    /// Page size (1-100)
    #[arg(long)]
    pub page_size: Option<u32>,
}

#[derive(Args, Debug, Default)]
pub struct ShowArgs {
    /// Issue IDs
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct TransitionArgs {
    /// Issue ID
    pub id: String,

    /// Workflow command, e.g. open, ready_for_review, close
    pub command: String,

    /// When it happened (RFC 3339); defaults to now
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct LinkArgs {
    /// Source issue ID
    pub source: String,

    /// Target issue ID
    pub target: String,

    /// Link type: related, duplicate, blocking, clone or parent-child
    #[arg(short = 't', long = "type", default_value = "related")]
    pub type_: String,
}

#[derive(Args, Debug, Default)]
pub struct PatchArgs {
    /// Issue ID
    pub id: String,

    /// Field name, e.g. title, priority, epicId, assignee
    pub field: String,

    /// New value; 'null' clears optional fields
    pub value: String,
}

#[derive(Args, Debug, Default)]
pub struct CommentArgs {
    /// Issue ID
    pub id: String,

    /// Comment text
    pub text: String,

    /// Author as 'Full Name <id>' (default: configured actor)
    #[arg(long)]
    pub author: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct DeleteArgs {
    /// Issue IDs
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct RelationArgs {
    /// Issue ID
    pub id: String,

    /// Order by, e.g. "Priority, Title DESC"
    #[arg(long)]
    pub sort: Option<String>,

    /// Page number (1-based)
    #[arg(long)]
    pub page: Option<u32>,

    /// Page size (1-100)
    #[arg(long)]
    pub page_size: Option<u32>,
}

/// Parse a user-supplied issue identifier.
///
/// # Errors
///
/// Returns `InvalidId` for a malformed identifier.
pub fn parse_id(raw: &str) -> crate::error::Result<IssueIdentifier> {
    Ok(raw.trim().parse()?)
}

/// Parse an RFC 3339 timestamp, or return now when absent.
///
/// # Errors
///
/// Returns `Validation` on field `at` for a malformed timestamp.
pub fn parse_at(raw: Option<&str>) -> crate::error::Result<DateTime<Utc>> {
    raw.map_or_else(
        || Ok(Utc::now()),
        |s| {
            DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| AppError::from(IssueError::validation("at", e.to_string())))
        },
    )
}

/// Run the CLI.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet, cli.log_json)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;
    issue_core::verify_field_tables().map_err(AppError::from)?;

    let overrides = CliOverrides {
        actor: cli.actor.clone(),
        ..CliOverrides::default()
    };
    let json = cli.json;

    let Some(command) = cli.command else {
        println!("itr - issue tracker. Use --help for usage.");
        return Ok(());
    };
    tracing::debug!(command = command.name(), "dispatch");

    match command {
        Commands::Init(args) => commands::init::execute(&args, json, &overrides)?,
        Commands::Create(args) => commands::create::execute(&args, json, &overrides)?,
        Commands::List(args) => commands::list::execute(&args, json, &overrides)?,
        Commands::Show(args) => commands::show::execute(&args, json, &overrides)?,
        Commands::Transition(args) => commands::transition::execute(&args, json, &overrides)?,
        Commands::Link(args) => commands::link::execute_link(&args, json, &overrides)?,
        Commands::Unlink(args) => commands::link::execute_unlink(&args, json, &overrides)?,
        Commands::Patch(args) => commands::patch::execute(&args, json, &overrides)?,
        Commands::Comment(args) => commands::comment::execute(&args, json, &overrides)?,
        Commands::Delete(args) => commands::delete::execute(&args, json, &overrides)?,
        Commands::Children(args) => {
            commands::relations::execute_children(&args, json, &overrides)?;
        }
        Commands::Parents(args) => {
            commands::relations::execute_parents(&args, json, &overrides)?;
        }
        Commands::Check => commands::check::execute(json, &overrides)?,
    }

    Ok(())
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Create(_) => "create",
            Self::List(_) => "list",
            Self::Show(_) => "show",
            Self::Transition(_) => "transition",
            Self::Link(_) => "link",
            Self::Unlink(_) => "unlink",
            Self::Patch(_) => "patch",
            Self::Comment(_) => "comment",
            Self::Delete(_) => "delete",
            Self::Children(_) => "children",
            Self::Parents(_) => "parents",
            Self::Check => "check",
        }
    }
}
