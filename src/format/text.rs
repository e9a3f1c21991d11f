//! Text formatting functions for `itr`.
//!
//! Provides plain text (non-ANSI) formatting for terminal output:
//! - State icons (❄ ○ ◐ ◑ ● ✓ ✗ ?)
//! - Priority labels (P1-P3)
//! - Type badges ([defect], [story], etc.)
//! - Issue line formatting with width-aware title truncation

use issue_core::{IssueState, IssueSummary, IssueType, Priority};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Widest title shown on a one-line summary, in terminal columns.
pub const TITLE_WIDTH: usize = 60;

/// State icon characters.
pub mod icons {
    /// Parked in the backlog (snowflake).
    pub const BACKLOG: &str = "❄";
    /// Planned but not started (hollow circle).
    pub const TODO: &str = "○";
    /// Active work (half-filled).
    pub const ACTIVE: &str = "◐";
    /// Waiting on review or test (other half).
    pub const WAITING: &str = "◑";
    /// Review or test failed, needs attention (filled circle).
    pub const FAILED: &str = "●";
    /// Finished (checkmark).
    pub const DONE: &str = "✓";
    /// Dropped without doing the work (X mark).
    pub const DROPPED: &str = "✗";
    /// Could not reproduce.
    pub const UNKNOWN: &str = "?";
}

/// Return the icon character for a state.
#[must_use]
pub const fn format_state_icon(state: IssueState) -> &'static str {
    match state {
        IssueState::BackLog => icons::BACKLOG,
        IssueState::ToDo => icons::TODO,
        IssueState::Open => icons::ACTIVE,
        IssueState::ReadyForReview | IssueState::ReadyForTest => icons::WAITING,
        IssueState::ReviewFailed | IssueState::TestFailed => icons::FAILED,
        IssueState::Completed | IssueState::Closed => icons::DONE,
        IssueState::WontDo | IssueState::NotADefect => icons::DROPPED,
        IssueState::CannotReproduce => icons::UNKNOWN,
    }
}

/// Format priority as "P1" (high) through "P3" (low).
#[must_use]
pub const fn format_priority(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "P1",
        Priority::Medium => "P2",
        Priority::Low => "P3",
    }
}

/// Format issue type as a bracketed badge.
#[must_use]
pub fn format_type_badge(issue_type: IssueType) -> String {
    format!("[{}]", issue_type.as_str())
}

/// Shorten `text` to at most `width` terminal columns, ending in `…` when cut.
#[must_use]
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let budget = width - 1;
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

/// Format a single-line issue summary.
///
/// Format: `{icon} {id} [{priority}] [{type}] {title}`
#[must_use]
pub fn format_issue_line(issue: &IssueSummary) -> String {
    let mut line = format!(
        "{} {} [{}] {} {}",
        format_state_icon(issue.state),
        issue.id,
        format_priority(issue.priority),
        format_type_badge(issue.issue_type),
        truncate_to_width(&issue.title, TITLE_WIDTH),
    );
    if let Some(assignee) = &issue.assignee {
        line.push_str(&format!(" (@{})", assignee.user_id));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use issue_core::{IssueIdentifier, User};

    fn make_summary(title: &str) -> IssueSummary {
        IssueSummary {
            id: "APP-7".parse::<IssueIdentifier>().unwrap(),
            title: title.to_string(),
            priority: Priority::Medium,
            issue_type: IssueType::Task,
            state: IssueState::ToDo,
            assignee: None,
            epic_id: None,
        }
    }

    #[test]
    fn test_state_icons() {
        assert_eq!(format_state_icon(IssueState::BackLog), "❄");
        assert_eq!(format_state_icon(IssueState::ToDo), "○");
        assert_eq!(format_state_icon(IssueState::Open), "◐");
        assert_eq!(format_state_icon(IssueState::ReadyForTest), "◑");
        assert_eq!(format_state_icon(IssueState::TestFailed), "●");
        assert_eq!(format_state_icon(IssueState::Closed), "✓");
        assert_eq!(format_state_icon(IssueState::WontDo), "✗");
        assert_eq!(format_state_icon(IssueState::CannotReproduce), "?");
    }

    #[test]
    fn test_format_priority() {
        assert_eq!(format_priority(Priority::High), "P1");
        assert_eq!(format_priority(Priority::Medium), "P2");
        assert_eq!(format_priority(Priority::Low), "P3");
    }

    #[test]
    fn test_format_type_badge() {
        assert_eq!(format_type_badge(IssueType::SubTask), "[sub_task]");
        assert_eq!(format_type_badge(IssueType::Defect), "[defect]");
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("exact", 5), "exact");
    }

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // Each CJK character is two columns wide
        let cut = truncate_to_width("日本語のタイトル", 7);
        assert_eq!(cut, "日本語…");
        assert!(cut.width() <= 7);
    }

    #[test]
    fn test_truncate_zero_width() {
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn test_format_issue_line() {
        let line = format_issue_line(&make_summary("Fix login"));
        assert_eq!(line, "○ APP-7 [P2] [task] Fix login");
    }

    #[test]
    fn test_format_issue_line_with_assignee() {
        let mut summary = make_summary("Fix login");
        summary.assignee = Some(User::new("ada", "Ada Lovelace"));
        assert!(format_issue_line(&summary).ends_with("(@ada)"));
    }

    proptest::proptest! {
        #[test]
        fn prop_truncate_fits_and_keeps_prefix(
            text in "[a-zA-Z0-9 日本語タイトル]{0,80}",
            width in 0usize..40,
        ) {
            let cut = truncate_to_width(&text, width);
            proptest::prop_assert!(cut.width() <= width);
            proptest::prop_assert!(text.starts_with(cut.trim_end_matches('…')));
        }
    }

    #[test]
    fn test_format_issue_line_truncates_long_title() {
        let line = format_issue_line(&make_summary(&"x".repeat(200)));
        assert!(line.ends_with('…'));
        assert!(line.width() < 100);
    }
}
