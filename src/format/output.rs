use issue_core::{CommandKind, Issue, IssueLink, Page};
use serde::Serialize;

/// Issue details with workflow hints for show view.
#[derive(Debug, Clone, Serialize)]
pub struct IssueDetails {
    #[serde(flatten)]
    pub issue: Issue,
    pub allowed_commands: Vec<CommandKind>,
    pub is_terminal: bool,
}

impl IssueDetails {
    #[must_use]
    pub fn new(issue: Issue) -> Self {
        let state = issue.state();
        Self {
            issue,
            allowed_commands: state.allowed_commands(),
            is_terminal: state.is_terminal(),
        }
    }
}

/// Paged list output for list view.
#[derive(Debug, Clone, Serialize)]
pub struct PageEnvelope<T> {
    pub items: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_count: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub order_by: String,
}

impl<T> PageEnvelope<T> {
    #[must_use]
    pub fn new(page: Page<T>, order_by: String) -> Self {
        let total_pages = page.total_pages();
        let has_next = page.has_next();
        Self {
            items: page.items,
            page_number: page.page_number,
            page_size: page.page_size,
            total_count: page.total_count,
            total_pages,
            has_next,
            order_by,
        }
    }
}

/// Outcome of a link or unlink request.
#[derive(Debug, Clone, Serialize)]
pub struct LinkOutcome {
    #[serde(flatten)]
    pub link: IssueLink,
    pub changed: bool,
}

/// One finding from `itr check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFinding {
    /// Issue identifier, or `line N` when the record could not be parsed.
    pub subject: String,
    pub field: String,
    pub message: String,
}

/// Summary of `itr check`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub checked: usize,
    pub ok: bool,
    pub findings: Vec<CheckFinding>,
}
