//! Issue workflow state machine.
//!
//! The workflow is a closed set of [`IssueState`]s and a closed set of
//! [`CommandKind`]s. [`TRANSITIONS`] is a dense `state × command` table, so
//! every pair has exactly one answer: a successor state or `None`
//! (rejected). Adding a state or command without extending the table is a
//! compile error because the array dimensions are tied to `COUNT`.
//!
//! Side effects bound to transitions:
//! - entering `Open` for the first time records the start time;
//! - entering `Completed`, `CannotReproduce`, `WontDo` or `NotADefect`
//!   records the stop time, and is rejected when a stop time already exists
//!   or the new value precedes the start time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IssueError, Result};
use crate::model::{Issue, IssueIdentifier};

/// Workflow state of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    #[default]
    #[serde(rename = "backlog")]
    BackLog,
    #[serde(rename = "todo")]
    ToDo,
    Open,
    ReadyForReview,
    ReviewFailed,
    ReadyForTest,
    TestFailed,
    Completed,
    Closed,
    CannotReproduce,
    WontDo,
    NotADefect,
}

impl IssueState {
    pub const COUNT: usize = 12;

    /// Every state, in table row order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::BackLog,
        Self::ToDo,
        Self::Open,
        Self::ReadyForReview,
        Self::ReviewFailed,
        Self::ReadyForTest,
        Self::TestFailed,
        Self::Completed,
        Self::Closed,
        Self::CannotReproduce,
        Self::WontDo,
        Self::NotADefect,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BackLog => "backlog",
            Self::ToDo => "todo",
            Self::Open => "open",
            Self::ReadyForReview => "ready_for_review",
            Self::ReviewFailed => "review_failed",
            Self::ReadyForTest => "ready_for_test",
            Self::TestFailed => "test_failed",
            Self::Completed => "completed",
            Self::Closed => "closed",
            Self::CannotReproduce => "cannot_reproduce",
            Self::WontDo => "wont_do",
            Self::NotADefect => "not_a_defect",
        }
    }

    /// Terminal states have no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Closed | Self::WontDo | Self::NotADefect
        )
    }

    /// Look up the successor for `command` in the transition table.
    #[must_use]
    pub const fn successor(self, command: CommandKind) -> Option<Self> {
        TRANSITIONS[self as usize][command as usize]
    }

    /// Commands the transition table enables from this state.
    #[must_use]
    pub fn allowed_commands(self) -> Vec<CommandKind> {
        CommandKind::ALL
            .into_iter()
            .filter(|kind| self.successor(*kind).is_some())
            .collect()
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueState {
    type Err = IssueError;

    fn from_str(s: &str) -> Result<Self> {
        let key = normalize_name(s);
        Self::ALL
            .into_iter()
            .find(|state| normalize_name(state.as_str()) == key)
            .ok_or_else(|| IssueError::validation("state", format!("unknown state '{s}'")))
    }
}

/// The kind of a state-change command, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    #[serde(rename = "move_to_backlog")]
    MoveToBackLog,
    #[serde(rename = "todo")]
    ToDo,
    Open,
    ReadyForReview,
    ReviewFailed,
    ReadyForTest,
    TestFailed,
    Completed,
    Close,
    CannotReproduce,
    WontDo,
    NotADefect,
}

impl CommandKind {
    pub const COUNT: usize = 12;

    /// Every command kind, in table column order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::MoveToBackLog,
        Self::ToDo,
        Self::Open,
        Self::ReadyForReview,
        Self::ReviewFailed,
        Self::ReadyForTest,
        Self::TestFailed,
        Self::Completed,
        Self::Close,
        Self::CannotReproduce,
        Self::WontDo,
        Self::NotADefect,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MoveToBackLog => "move_to_backlog",
            Self::ToDo => "todo",
            Self::Open => "open",
            Self::ReadyForReview => "ready_for_review",
            Self::ReviewFailed => "review_failed",
            Self::ReadyForTest => "ready_for_test",
            Self::TestFailed => "test_failed",
            Self::Completed => "completed",
            Self::Close => "close",
            Self::CannotReproduce => "cannot_reproduce",
            Self::WontDo => "wont_do",
            Self::NotADefect => "not_a_defect",
        }
    }

    /// True for commands whose payload carries a stop time.
    #[must_use]
    pub const fn records_stop_time(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CannotReproduce | Self::WontDo | Self::NotADefect
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = IssueError;

    fn from_str(s: &str) -> Result<Self> {
        let key = normalize_name(s);
        match key.as_str() {
            "backlog" | "movetobacklog" => Ok(Self::MoveToBackLog),
            "complete" => Ok(Self::Completed),
            "closed" => Ok(Self::Close),
            _ => Self::ALL
                .into_iter()
                .find(|kind| normalize_name(kind.as_str()) == key)
                .ok_or_else(|| {
                    IssueError::validation("command", format!("unknown command '{s}'"))
                }),
        }
    }
}

fn normalize_name(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

use IssueState as S;

const NO: Option<IssueState> = None;

const fn to(state: IssueState) -> Option<IssueState> {
    Some(state)
}

/// Dense transition table. Rows follow [`IssueState::ALL`], columns follow
/// [`CommandKind::ALL`]:
///
/// `Backlog ToDo Open RFR RevFail RFT TestFail Completed Close CannotRepro WontDo NotADefect`
#[rustfmt::skip]
pub const TRANSITIONS: [[Option<IssueState>; CommandKind::COUNT]; IssueState::COUNT] = [
    // BackLog
    [NO, to(S::ToDo), to(S::Open), NO, NO, NO, NO, NO, NO, to(S::CannotReproduce), to(S::WontDo), to(S::NotADefect)],
    // ToDo
    [to(S::BackLog), NO, to(S::Open), NO, NO, NO, NO, NO, NO, to(S::CannotReproduce), to(S::WontDo), to(S::NotADefect)],
    // Open
    [to(S::BackLog), to(S::ToDo), NO, to(S::ReadyForReview), NO, NO, NO, NO, to(S::Closed), to(S::CannotReproduce), to(S::WontDo), to(S::NotADefect)],
    // ReadyForReview
    [NO, NO, NO, NO, to(S::ReviewFailed), to(S::ReadyForTest), NO, NO, to(S::Closed), NO, NO, NO],
    // ReviewFailed
    [to(S::BackLog), NO, to(S::Open), to(S::ReadyForReview), NO, NO, NO, NO, to(S::Closed), NO, NO, NO],
    // ReadyForTest
    [NO, NO, NO, NO, NO, NO, to(S::TestFailed), to(S::Completed), to(S::Closed), NO, NO, NO],
    // TestFailed
    [to(S::BackLog), NO, to(S::Open), to(S::ReadyForReview), NO, NO, NO, NO, to(S::Closed), NO, NO, NO],
    // Completed
    [NO; CommandKind::COUNT],
    // Closed
    [NO; CommandKind::COUNT],
    // CannotReproduce
    [to(S::BackLog), NO, NO, NO, NO, NO, NO, NO, to(S::Closed), NO, NO, NO],
    // WontDo
    [NO; CommandKind::COUNT],
    // NotADefect
    [NO; CommandKind::COUNT],
];

/// A state-change command with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum StateChangeCommand {
    #[serde(rename = "move_to_backlog")]
    MoveToBackLog,
    #[serde(rename = "todo")]
    ToDo,
    Open { start_time: DateTime<Utc> },
    ReadyForReview,
    ReviewFailed,
    ReadyForTest,
    TestFailed,
    Completed { stop_time: DateTime<Utc> },
    Close,
    CannotReproduce { stop_time: DateTime<Utc> },
    WontDo { stop_time: DateTime<Utc> },
    NotADefect { stop_time: DateTime<Utc> },
}

impl StateChangeCommand {
    /// Build a command of `kind`, using `at` for any timestamp payload.
    #[must_use]
    pub const fn new(kind: CommandKind, at: DateTime<Utc>) -> Self {
        match kind {
            CommandKind::MoveToBackLog => Self::MoveToBackLog,
            CommandKind::ToDo => Self::ToDo,
            CommandKind::Open => Self::Open { start_time: at },
            CommandKind::ReadyForReview => Self::ReadyForReview,
            CommandKind::ReviewFailed => Self::ReviewFailed,
            CommandKind::ReadyForTest => Self::ReadyForTest,
            CommandKind::TestFailed => Self::TestFailed,
            CommandKind::Completed => Self::Completed { stop_time: at },
            CommandKind::Close => Self::Close,
            CommandKind::CannotReproduce => Self::CannotReproduce { stop_time: at },
            CommandKind::WontDo => Self::WontDo { stop_time: at },
            CommandKind::NotADefect => Self::NotADefect { stop_time: at },
        }
    }

    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::MoveToBackLog => CommandKind::MoveToBackLog,
            Self::ToDo => CommandKind::ToDo,
            Self::Open { .. } => CommandKind::Open,
            Self::ReadyForReview => CommandKind::ReadyForReview,
            Self::ReviewFailed => CommandKind::ReviewFailed,
            Self::ReadyForTest => CommandKind::ReadyForTest,
            Self::TestFailed => CommandKind::TestFailed,
            Self::Completed { .. } => CommandKind::Completed,
            Self::Close => CommandKind::Close,
            Self::CannotReproduce { .. } => CommandKind::CannotReproduce,
            Self::WontDo { .. } => CommandKind::WontDo,
            Self::NotADefect { .. } => CommandKind::NotADefect,
        }
    }

    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Open { start_time } => Some(*start_time),
            _ => None,
        }
    }

    #[must_use]
    pub const fn stop_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Completed { stop_time }
            | Self::CannotReproduce { stop_time }
            | Self::WontDo { stop_time }
            | Self::NotADefect { stop_time } => Some(*stop_time),
            _ => None,
        }
    }
}

/// A command addressed to a specific issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCommand {
    pub target: IssueIdentifier,
    #[serde(flatten)]
    pub command: StateChangeCommand,
}

impl IssueCommand {
    #[must_use]
    pub const fn new(target: IssueIdentifier, command: StateChangeCommand) -> Self {
        Self { target, command }
    }
}

/// Decide whether `command` may run against `issue` without mutating it.
///
/// Returns the successor state when the table allows the pair and the
/// timestamp guards hold.
#[must_use]
pub fn plan(issue: &Issue, command: &StateChangeCommand) -> Option<IssueState> {
    let next = issue.state().successor(command.kind())?;

    // A first start time must not follow a stop time recorded earlier
    if command.start_time().is_some_and(|start| {
        issue.start_time().is_none() && issue.stop_time().is_some_and(|stop| stop < start)
    }) {
        return None;
    }

    if let Some(stop) = command.stop_time() {
        if issue.stop_time().is_some() {
            return None;
        }
        if issue.start_time().is_some_and(|start| stop < start) {
            return None;
        }
    }

    Some(next)
}

/// Execute `command` against `issue`.
///
/// Returns `(state, true)` with the new state on success, or
/// `(unchanged_state, false)` when the command is rejected.
pub fn execute(issue: &mut Issue, command: &StateChangeCommand) -> (IssueState, bool) {
    let Some(next) = plan(issue, command) else {
        tracing::debug!(
            id = %issue.id(),
            state = %issue.state(),
            command = %command.kind(),
            "transition rejected"
        );
        return (issue.state(), false);
    };

    if let Some(start) = command.start_time() {
        issue.record_start_time(start);
    }
    if let Some(stop) = command.stop_time() {
        issue.record_stop_time(stop);
    }
    issue.set_state(next);

    tracing::debug!(id = %issue.id(), state = %next, command = %command.kind(), "transition applied");
    (next, true)
}

/// Execute `command`, turning a rejection into [`IssueError::StateConflict`].
///
/// # Errors
///
/// Returns `StateConflict` carrying the current state and the kind of the
/// command that was attempted.
pub fn execute_or_err(issue: &mut Issue, command: &StateChangeCommand) -> Result<IssueState> {
    let before = issue.state();
    match execute(issue, command) {
        (state, true) => Ok(state),
        (_, false) => Err(IssueError::StateConflict {
            id: issue.id().to_string(),
            state: before,
            command: command.kind(),
        }),
    }
}
