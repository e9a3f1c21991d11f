//! List command implementation.
//!
//! Primary discovery interface. Values of one filter are OR'ed, different
//! filters are AND'ed, and the result is sorted and paged by the core query
//! engine.

use issue_core::{
    CancellationToken, Issue, IssueError, IssueRepository, IssueState, IssueSummary, IssueType, Page,
    PagingOptions, Predicate, Priority, Selector, SortingOptions,
};

use crate::cli::{ListArgs, parse_id};
use crate::config::{CliOverrides, Workspace};
use crate::error::Result;
use crate::format::{PageEnvelope, format_issue_line, print_json};

/// Execute the list command.
///
/// # Errors
///
/// Returns an error if a filter, the sort string or the paging values are
/// invalid, or if the store cannot be opened.
pub fn execute(args: &ListArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    let workspace = Workspace::discover(overrides)?;
    let store = workspace.open_store()?;

    let predicates = build_predicates(args)?;
    let sorting = SortingOptions::parse(args.sort.as_deref())?;
    let paging = PagingOptions::new(
        args.page.unwrap_or(1),
        args.page_size.unwrap_or(workspace.config().page_size),
    )?;
    let selector = Selector::issue_summary()?;

    let (total, stream) =
        store.query(&predicates, &selector, &sorting, paging, &CancellationToken::new())?;
    let page = stream.into_page(paging, total)?;

    print_page(page, &sorting, json)
}

/// Print one page of summaries as JSON or as text lines with a footer.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn print_page(page: Page<IssueSummary>, sorting: &SortingOptions, json: bool) -> Result<()> {
    if json {
        return print_json(&PageEnvelope::new(page, sorting.to_string()));
    }

    if page.items.is_empty() {
        if page.total_count == 0 {
            println!("No issues found.");
        } else {
            println!(
                "Page {} is past the end ({} page(s)).",
                page.page_number,
                page.total_pages()
            );
        }
        return Ok(());
    }

    for summary in &page.items {
        println!("{}", format_issue_line(summary));
    }
    println!(
        "\nPage {} of {} ({} issue(s), sorted by {})",
        page.page_number,
        page.total_pages(),
        page.total_count,
        sorting
    );
    Ok(())
}

/// Convert CLI args to query predicates.
///
/// # Errors
///
/// Returns `Validation` for any value that does not parse.
pub fn build_predicates(args: &ListArgs) -> Result<Vec<Predicate<Issue>>> {
    let mut predicates = Vec::new();

    if let Some(project) = &args.project {
        predicates.push(Predicate::project_equals(project)?);
    }
    if let Some(p) = any_of(&args.priority, |raw| {
        Ok(Predicate::priority_equals(raw.parse::<Priority>()?))
    })? {
        predicates.push(p);
    }
    if let Some(p) = any_of(&args.type_, |raw| {
        Ok(Predicate::type_equals(raw.parse::<IssueType>()?))
    })? {
        predicates.push(p);
    }
    if let Some(p) = any_of(&args.state, |raw| {
        Ok(Predicate::state_equals(raw.parse::<IssueState>()?))
    })? {
        predicates.push(p);
    }
    if let Some(epic) = &args.epic {
        let epic_id = if epic.trim().eq_ignore_ascii_case("none") {
            None
        } else {
            Some(parse_id(epic)?)
        };
        predicates.push(Predicate::epic_equals(epic_id));
    }
    if let Some(search) = &args.search {
        let search = search.trim();
        if search.is_empty() {
            return Err(IssueError::validation("search", "cannot be empty").into());
        }
        predicates.push(Predicate::title_contains(search)?);
    }

    tracing::debug!(count = predicates.len(), "built list predicates");
    Ok(predicates)
}

fn any_of(
    values: &[String],
    to_predicate: impl Fn(&str) -> Result<Predicate<Issue>>,
) -> Result<Option<Predicate<Issue>>> {
    let mut combined: Option<Predicate<Issue>> = None;
    for raw in values {
        let next = to_predicate(raw)?;
        combined = Some(match combined {
            Some(acc) => acc.or(next),
            None => next,
        });
    }
    Ok(combined)
}
