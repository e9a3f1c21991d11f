//! Core data types for issue-core.
//!
//! [`Issue`] is the aggregate root. Its fields are private: reads go through
//! accessors, writes go through guarded setters, [`Issue::execute`] or
//! [`Issue::patch`](crate::patch), so the invariants below always hold:
//!
//! - title is 1..=200 characters, description at most 500;
//! - the start time is recorded once, by the first transition into `Open`;
//! - the stop time is recorded once and never precedes the start time;
//! - an epic never references another epic;
//! - comments are non-empty, at most 500 characters, with increasing ids.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{IssueError, Result, ValidationError};
use crate::workflow::{self, IssueState, StateChangeCommand};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_COMMENT_LEN: usize = 500;
pub const MAX_PROJECT_LEN: usize = 3;

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| match Regex::new(r"^([A-Za-z]{1,3})-([0-9]+)$") {
    Ok(re) => re,
    Err(_) => unreachable!("static regex pattern"),
});

/// Issue identifier: project code plus per-project sequence number.
///
/// Ordering is project first, then number, which is the default sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IssueIdentifier {
    project: String,
    issue_number: u32,
}

impl IssueIdentifier {
    /// Create an identifier, normalizing the project code to upper case.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the project code is not 1-3 ASCII letters or
    /// the issue number is zero.
    pub fn new(project: &str, issue_number: u32) -> Result<Self> {
        let project = validate_project_code(project)?;
        if issue_number == 0 {
            return Err(IssueError::validation("issueNumber", "must be greater than 0"));
        }
        Ok(Self {
            project,
            issue_number,
        })
    }

    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    #[must_use]
    pub const fn issue_number(&self) -> u32 {
        self.issue_number
    }
}

/// Validate and normalize a project code.
///
/// # Errors
///
/// Returns `Validation` on field `project` when the code is not 1-3 ASCII letters.
pub fn validate_project_code(project: &str) -> Result<String> {
    let trimmed = project.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_PROJECT_LEN {
        return Err(IssueError::validation("project", "must be 1-3 characters"));
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(IssueError::validation("project", "must contain only letters"));
    }
    Ok(trimmed.to_ascii_uppercase())
}

impl fmt::Display for IssueIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.project, self.issue_number)
    }
}

impl FromStr for IssueIdentifier {
    type Err = IssueError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || IssueError::InvalidId { id: s.to_string() };
        let caps = IDENTIFIER_RE.captures(s.trim()).ok_or_else(invalid)?;
        let number: u32 = caps[2].parse().map_err(|_| invalid())?;
        Self::new(&caps[1], number).map_err(|_| invalid())
    }
}

impl TryFrom<String> for IssueIdentifier {
    type Error = IssueError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<IssueIdentifier> for String {
    fn from(value: IssueIdentifier) -> Self {
        value.to_string()
    }
}

/// Issue priority, ordered by severity: `High` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    #[default]
    Low,
}

impl Priority {
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = IssueError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" | "h" => Ok(Self::High),
            "medium" | "m" => Ok(Self::Medium),
            "low" | "l" => Ok(Self::Low),
            other => Err(IssueError::validation(
                "priority",
                format!("unknown priority '{other}'"),
            )),
        }
    }
}

/// Issue type category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Epic,
    Story,
    Task,
    SubTask,
    #[default]
    Defect,
}

impl IssueType {
    pub const ALL: [Self; 5] = [Self::Epic, Self::Story, Self::Task, Self::SubTask, Self::Defect];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Story => "story",
            Self::Task => "task",
            Self::SubTask => "sub_task",
            Self::Defect => "defect",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = IssueError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "epic" => Ok(Self::Epic),
            "story" => Ok(Self::Story),
            "task" => Ok(Self::Task),
            "sub_task" | "subtask" => Ok(Self::SubTask),
            "defect" | "bug" => Ok(Self::Defect),
            other => Err(IssueError::validation(
                "type",
                format!("unknown issue type '{other}'"),
            )),
        }
    }
}

/// Link relationship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LinkType {
    #[default]
    Related,
    Duplicate,
    Blocking,
    Clone,
    ParentChild,
}

impl LinkType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Related => "related",
            Self::Duplicate => "duplicate",
            Self::Blocking => "blocking",
            Self::Clone => "clone",
            Self::ParentChild => "parent-child",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = IssueError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "related" => Ok(Self::Related),
            "duplicate" => Ok(Self::Duplicate),
            "blocking" | "blocks" => Ok(Self::Blocking),
            "clone" => Ok(Self::Clone),
            "parent-child" | "parentchild" | "child" => Ok(Self::ParentChild),
            other => Err(IssueError::validation(
                "linkType",
                format!("unknown link type '{other}'"),
            )),
        }
    }
}

/// Which end of a link the current issue sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDirection {
    /// `self -> other`
    Outgoing,
    /// `other -> self`
    Incoming,
}

/// Directed, typed edge between two issues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssueLink {
    #[serde(rename = "type")]
    pub link_type: LinkType,
    pub source_id: IssueIdentifier,
    pub target_id: IssueIdentifier,
}

impl IssueLink {
    /// Create a link.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on field `targetId` for a self-link.
    pub fn new(
        link_type: LinkType,
        source_id: IssueIdentifier,
        target_id: IssueIdentifier,
    ) -> Result<Self> {
        if source_id == target_id {
            return Err(IssueError::validation(
                "targetId",
                "issue cannot be linked to itself",
            ));
        }
        Ok(Self {
            link_type,
            source_id,
            target_id,
        })
    }
}

/// Reference to a user (assignee or reporter).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct User {
    pub full_name: String,
    pub user_id: String,
}

impl User {
    #[must_use]
    pub fn new(user_id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            user_id: user_id.into(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.full_name, self.user_id)
    }
}

impl FromStr for User {
    type Err = IssueError;

    /// Parse `Full Name <user-id>` or a bare user id.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IssueError::validation("user", "cannot be empty"));
        }
        if let Some((name, rest)) = s.split_once('<') {
            let user_id = rest
                .strip_suffix('>')
                .ok_or_else(|| IssueError::validation("user", "unterminated '<'"))?
                .trim();
            let name = name.trim();
            if user_id.is_empty() || name.is_empty() {
                return Err(IssueError::validation("user", "expected 'Full Name <id>'"));
            }
            return Ok(Self::new(user_id, name));
        }
        Ok(Self::new(s, s))
    }
}

/// A comment on an issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: u32,
    pub author: User,
    #[serde(rename = "text")]
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Opaque optimistic-concurrency token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConcurrencyToken(String);

impl ConcurrencyToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConcurrencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The issue aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    id: IssueIdentifier,
    title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default)]
    priority: Priority,
    #[serde(default, rename = "type")]
    issue_type: IssueType,
    #[serde(default)]
    state: IssueState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    epic_id: Option<IssueIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    assignee: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reporter: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stop_time: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    outgoing: BTreeSet<IssueLink>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    incoming: BTreeSet<IssueLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    comments: Vec<Comment>,
    #[serde(default)]
    revision: u64,
    concurrency_token: ConcurrencyToken,
}

impl Issue {
    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub const fn id(&self) -> &IssueIdentifier {
        &self.id
    }

    #[must_use]
    pub fn project(&self) -> &str {
        self.id.project()
    }

    #[must_use]
    pub const fn issue_number(&self) -> u32 {
        self.id.issue_number()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    #[must_use]
    pub const fn issue_type(&self) -> IssueType {
        self.issue_type
    }

    #[must_use]
    pub const fn state(&self) -> IssueState {
        self.state
    }

    #[must_use]
    pub const fn epic_id(&self) -> Option<&IssueIdentifier> {
        self.epic_id.as_ref()
    }

    #[must_use]
    pub const fn assignee(&self) -> Option<&User> {
        self.assignee.as_ref()
    }

    #[must_use]
    pub const fn reporter(&self) -> Option<&User> {
        self.reporter.as_ref()
    }

    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    #[must_use]
    pub const fn stop_time(&self) -> Option<DateTime<Utc>> {
        self.stop_time
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub const fn concurrency_token(&self) -> &ConcurrencyToken {
        &self.concurrency_token
    }

    /// Links where this issue is the source.
    pub fn outgoing_links(&self) -> impl Iterator<Item = &IssueLink> {
        self.outgoing.iter()
    }

    /// Links where this issue is the target.
    pub fn incoming_links(&self) -> impl Iterator<Item = &IssueLink> {
        self.incoming.iter()
    }

    /// Comments in the order they were added.
    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Issues this issue is the parent of.
    pub fn child_ids(&self) -> impl Iterator<Item = &IssueIdentifier> {
        self.outgoing
            .iter()
            .filter(|l| l.link_type == LinkType::ParentChild)
            .map(|l| &l.target_id)
    }

    /// Issues this issue is a child of.
    pub fn parent_ids(&self) -> impl Iterator<Item = &IssueIdentifier> {
        self.incoming
            .iter()
            .filter(|l| l.link_type == LinkType::ParentChild)
            .map(|l| &l.source_id)
    }

    // ========================================================================
    // Workflow
    // ========================================================================

    /// Execute a state-change command, returning `false` when rejected.
    pub fn execute(&mut self, command: &StateChangeCommand) -> bool {
        workflow::execute(self, command).1
    }

    /// Execute a state-change command, failing with `StateConflict` when rejected.
    ///
    /// # Errors
    ///
    /// Returns `StateConflict` with the current state and attempted command kind.
    pub fn try_execute(&mut self, command: &StateChangeCommand) -> Result<IssueState> {
        workflow::execute_or_err(self, command)
    }

    pub(crate) fn set_state(&mut self, state: IssueState) {
        self.state = state;
        self.touch();
    }

    /// Record the start time unless one already exists.
    pub(crate) fn record_start_time(&mut self, at: DateTime<Utc>) {
        if self.start_time.is_none() {
            self.start_time = Some(at);
        }
    }

    /// Record the stop time. Callers check the guards first (see `workflow::plan`).
    pub(crate) fn record_stop_time(&mut self, at: DateTime<Utc>) {
        debug_assert!(self.stop_time.is_none());
        self.stop_time = Some(at);
    }

    // ========================================================================
    // Guarded setters
    // ========================================================================

    /// # Errors
    ///
    /// Returns `Validation` on field `title` if empty or longer than 200 characters.
    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        if self.title == title {
            return Ok(());
        }
        validate_title(&title)?;
        self.title = title;
        self.touch();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Validation` on field `description` if longer than 500 characters.
    pub fn set_description(&mut self, description: impl Into<String>) -> Result<()> {
        let description = description.into();
        validate_description(&description)?;
        if self.description != description {
            self.description = description;
            self.touch();
        }
        Ok(())
    }

    pub fn set_priority(&mut self, priority: Priority) {
        if self.priority != priority {
            self.priority = priority;
            self.touch();
        }
    }

    /// Change the type. Becoming an `Epic` clears any epic reference.
    pub fn set_issue_type(&mut self, issue_type: IssueType) {
        if self.issue_type == issue_type {
            return;
        }
        if issue_type == IssueType::Epic {
            self.epic_id = None;
        }
        self.issue_type = issue_type;
        self.touch();
    }

    /// # Errors
    ///
    /// Returns `Validation` on field `epicId` if this issue is itself an epic
    /// or the reference points at this issue.
    pub fn set_epic_id(&mut self, epic_id: Option<IssueIdentifier>) -> Result<()> {
        if let Some(epic) = &epic_id {
            if self.issue_type == IssueType::Epic {
                return Err(IssueError::validation(
                    "epicId",
                    "cannot assign an epic to an epic",
                ));
            }
            if *epic == self.id {
                return Err(IssueError::validation(
                    "epicId",
                    "issue cannot be its own epic",
                ));
            }
        }
        if self.epic_id != epic_id {
            self.epic_id = epic_id;
            self.touch();
        }
        Ok(())
    }

    pub fn set_assignee(&mut self, assignee: Option<User>) {
        if self.assignee != assignee {
            self.assignee = assignee;
            self.touch();
        }
    }

    pub fn set_reporter(&mut self, reporter: Option<User>) {
        if self.reporter != reporter {
            self.reporter = reporter;
            self.touch();
        }
    }

    /// Set the start time if none is recorded yet.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on field `startTime` if a different start time is
    /// already set or the value would follow an existing stop time.
    pub fn set_start_time(&mut self, at: DateTime<Utc>) -> Result<()> {
        match self.start_time {
            Some(existing) if existing == at => return Ok(()),
            Some(_) => {
                return Err(IssueError::validation(
                    "startTime",
                    "cannot be changed once set",
                ));
            }
            None => {}
        }
        if self.stop_time.is_some_and(|stop| stop < at) {
            return Err(IssueError::validation(
                "startTime",
                "cannot be later than stopTime",
            ));
        }
        self.start_time = Some(at);
        self.touch();
        Ok(())
    }

    /// Set the stop time if none is recorded yet.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on field `stopTime` if a different stop time is
    /// already set or the value precedes the start time.
    pub fn set_stop_time(&mut self, at: DateTime<Utc>) -> Result<()> {
        match self.stop_time {
            Some(existing) if existing == at => return Ok(()),
            Some(_) => {
                return Err(IssueError::validation(
                    "stopTime",
                    "cannot be changed once set",
                ));
            }
            None => {}
        }
        if self.start_time.is_some_and(|start| at < start) {
            return Err(IssueError::validation(
                "stopTime",
                "cannot be earlier than startTime",
            ));
        }
        self.stop_time = Some(at);
        self.touch();
        Ok(())
    }

    // ========================================================================
    // Linking
    // ========================================================================

    /// Add a typed link between this issue and `other`.
    ///
    /// Returns `Ok(false)` when the edge already exists.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a self-link.
    pub fn add_link(
        &mut self,
        direction: LinkDirection,
        link_type: LinkType,
        other: &IssueIdentifier,
    ) -> Result<bool> {
        let added = match direction {
            LinkDirection::Outgoing => {
                let link = IssueLink::new(link_type, self.id.clone(), other.clone())?;
                self.outgoing.insert(link)
            }
            LinkDirection::Incoming => {
                let link = IssueLink::new(link_type, other.clone(), self.id.clone())?;
                self.incoming.insert(link)
            }
        };
        if added {
            self.touch();
        }
        Ok(added)
    }

    /// Remove a typed link. Returns `false` when no such edge exists.
    pub fn remove_link(
        &mut self,
        direction: LinkDirection,
        link_type: LinkType,
        other: &IssueIdentifier,
    ) -> bool {
        let removed = match direction {
            LinkDirection::Outgoing => {
                let (id, other) = (&self.id, other);
                let before = self.outgoing.len();
                self.outgoing
                    .retain(|l| !(l.link_type == link_type && &l.source_id == id && &l.target_id == other));
                before != self.outgoing.len()
            }
            LinkDirection::Incoming => {
                let (id, other) = (&self.id, other);
                let before = self.incoming.len();
                self.incoming
                    .retain(|l| !(l.link_type == link_type && &l.source_id == other && &l.target_id == id));
                before != self.incoming.len()
            }
        };
        if removed {
            self.touch();
        }
        removed
    }

    /// Drop every link that mentions `other` (used when `other` is deleted).
    pub fn forget_links_to(&mut self, other: &IssueIdentifier) -> bool {
        let before = self.outgoing.len() + self.incoming.len();
        self.outgoing.retain(|l| &l.target_id != other);
        self.incoming.retain(|l| &l.source_id != other);
        let changed = before != self.outgoing.len() + self.incoming.len();
        if changed {
            self.touch();
        }
        changed
    }

    // ========================================================================
    // Comments
    // ========================================================================

    /// Append a comment by `author`, returning its id.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on field `content` if the text is blank or longer
    /// than 500 characters.
    pub fn add_comment(
        &mut self,
        author: User,
        content: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<u32> {
        let content = content.into();
        validate_comment(&content)?;
        let id = self.comments.last().map_or(1, |c| c.id + 1);
        self.comments.push(Comment {
            id,
            author,
            content,
            created_at: at,
        });
        self.touch();
        Ok(id)
    }

    // ========================================================================
    // Invariants & concurrency
    // ========================================================================

    /// Check every aggregate invariant, collecting all violations.
    ///
    /// Aggregates built through [`IssueBuilder`] always pass; this exists for
    /// records that arrive from outside (deserialized files, adapters).
    ///
    /// # Errors
    ///
    /// Returns the list of violated invariants.
    pub fn check_invariants(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(IssueError::Validation { field, reason }) = validate_title(&self.title) {
            errors.push(ValidationError::new(field, reason));
        }
        if let Err(IssueError::Validation { field, reason }) =
            validate_description(&self.description)
        {
            errors.push(ValidationError::new(field, reason));
        }
        if let (Some(start), Some(stop)) = (self.start_time, self.stop_time) {
            if stop < start {
                errors.push(ValidationError::new(
                    "stopTime",
                    "cannot be earlier than startTime",
                ));
            }
        }
        if self.epic_id.is_some() && self.issue_type == IssueType::Epic {
            errors.push(ValidationError::new("epicId", "an epic cannot reference an epic"));
        }
        if self.epic_id.as_ref() == Some(&self.id) {
            errors.push(ValidationError::new("epicId", "issue cannot be its own epic"));
        }
        if self.outgoing.iter().any(|l| l.source_id != self.id) {
            errors.push(ValidationError::new("outgoing", "link source must be this issue"));
        }
        if self.incoming.iter().any(|l| l.target_id != self.id) {
            errors.push(ValidationError::new("incoming", "link target must be this issue"));
        }
        if self
            .outgoing
            .iter()
            .chain(self.incoming.iter())
            .any(|l| l.source_id == l.target_id)
        {
            errors.push(ValidationError::new("links", "self-links are not allowed"));
        }
        for comment in &self.comments {
            if let Err(IssueError::Validation { reason, .. }) = validate_comment(&comment.content) {
                errors.push(ValidationError::new(
                    "comments",
                    format!("comment {}: {reason}", comment.id),
                ));
            }
        }
        if self.comments.windows(2).any(|pair| pair[0].id >= pair[1].id) {
            errors.push(ValidationError::new("comments", "ids must be increasing"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Advance the revision and derive a fresh concurrency token.
    ///
    /// Called by repositories when a write is accepted.
    pub fn rotate_concurrency_token(&mut self) {
        self.revision += 1;
        self.concurrency_token = crate::util::concurrency_token(self);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(IssueError::validation("title", "cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(IssueError::validation("title", "exceeds 200 characters"));
    }
    Ok(())
}

fn validate_comment(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(IssueError::validation("content", "cannot be empty"));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(IssueError::validation("content", "exceeds 500 characters"));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(IssueError::validation(
            "description",
            "exceeds 500 characters",
        ));
    }
    Ok(())
}

/// Validating builder for new issues.
///
/// Either [`IssueBuilder::id`] or both [`IssueBuilder::project`] and
/// [`IssueBuilder::issue_number`] must be given, plus a title.
#[derive(Debug, Clone, Default)]
pub struct IssueBuilder {
    id: Option<IssueIdentifier>,
    project: Option<String>,
    issue_number: Option<u32>,
    title: Option<String>,
    description: Option<String>,
    priority: Option<Priority>,
    issue_type: Option<IssueType>,
    epic_id: Option<IssueIdentifier>,
    assignee: Option<User>,
    reporter: Option<User>,
    created_at: Option<DateTime<Utc>>,
}

impl IssueBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn id(mut self, id: IssueIdentifier) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    #[must_use]
    pub const fn issue_number(mut self, issue_number: u32) -> Self {
        self.issue_number = Some(issue_number);
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub const fn issue_type(mut self, issue_type: IssueType) -> Self {
        self.issue_type = Some(issue_type);
        self
    }

    #[must_use]
    pub fn epic_id(mut self, epic_id: IssueIdentifier) -> Self {
        self.epic_id = Some(epic_id);
        self
    }

    #[must_use]
    pub fn assignee(mut self, assignee: User) -> Self {
        self.assignee = Some(assignee);
        self
    }

    #[must_use]
    pub fn reporter(mut self, reporter: User) -> Self {
        self.reporter = Some(reporter);
        self
    }

    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Validate the collected fields and build the issue in `BackLog`.
    ///
    /// # Errors
    ///
    /// Returns `Validation`/`ValidationErrors` listing every problem found.
    pub fn build(self) -> Result<Issue> {
        let mut errors = Vec::new();

        let id = match (self.id, self.project, self.issue_number) {
            (Some(id), None, None) => Some(id),
            (Some(_), _, _) => {
                errors.push(ValidationError::new(
                    "id",
                    "cannot combine id with project or issue number",
                ));
                None
            }
            (None, Some(project), Some(number)) => match IssueIdentifier::new(&project, number) {
                Ok(id) => Some(id),
                Err(IssueError::Validation { field, reason }) => {
                    errors.push(ValidationError::new(field, reason));
                    None
                }
                Err(other) => return Err(other),
            },
            (None, None, _) => {
                errors.push(ValidationError::new("project", "is required"));
                None
            }
            (None, Some(_), None) => {
                errors.push(ValidationError::new("issueNumber", "is required"));
                None
            }
        };

        let title = self.title.unwrap_or_default();
        if let Err(IssueError::Validation { field, reason }) = validate_title(&title) {
            errors.push(ValidationError::new(field, reason));
        }

        let description = self.description.unwrap_or_default();
        if let Err(IssueError::Validation { field, reason }) = validate_description(&description) {
            errors.push(ValidationError::new(field, reason));
        }

        let issue_type = self.issue_type.unwrap_or_default();
        if self.epic_id.is_some() && issue_type == IssueType::Epic {
            errors.push(ValidationError::new(
                "epicId",
                "cannot assign an epic to an epic",
            ));
        }
        if self.epic_id.is_some() && self.epic_id == id {
            errors.push(ValidationError::new("epicId", "issue cannot be its own epic"));
        }

        let Some(id) = id.filter(|_| errors.is_empty()) else {
            return Err(IssueError::from_validation_errors(errors));
        };

        let now = self.created_at.unwrap_or_else(Utc::now);
        let mut issue = Issue {
            id,
            title,
            description,
            priority: self.priority.unwrap_or_default(),
            issue_type,
            state: IssueState::default(),
            epic_id: self.epic_id,
            assignee: self.assignee,
            reporter: self.reporter,
            start_time: None,
            stop_time: None,
            created_at: now,
            updated_at: now,
            outgoing: BTreeSet::new(),
            incoming: BTreeSet::new(),
            comments: Vec::new(),
            revision: 0,
            concurrency_token: ConcurrencyToken(String::new()),
        };
        issue.concurrency_token = crate::util::concurrency_token(&issue);
        Ok(issue)
    }
}

impl ConcurrencyToken {
    pub(crate) const fn from_hex(hex: String) -> Self {
        Self(hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn id(s: &str) -> IssueIdentifier {
        s.parse().unwrap()
    }

    fn make_issue(project: &str, number: u32, title: &str) -> Issue {
        IssueBuilder::new()
            .project(project)
            .issue_number(number)
            .title(title)
            .build()
            .unwrap()
    }

    #[test]
    fn test_identifier_parse_and_display() {
        let parsed = id("app-12");
        assert_eq!(parsed.project(), "APP");
        assert_eq!(parsed.issue_number(), 12);
        assert_eq!(parsed.to_string(), "APP-12");
    }

    #[test]
    fn test_identifier_rejects_malformed() {
        for bad in ["", "APP", "APP-", "-1", "ABCD-1", "AP1-3", "APP-0", "APP-x"] {
            let err = bad.parse::<IssueIdentifier>().unwrap_err();
            assert!(matches!(err, IssueError::InvalidId { .. }), "{bad} accepted");
        }
    }

    #[test]
    fn test_identifier_serde_as_string() {
        let json = serde_json::to_string(&id("ops-7")).unwrap();
        assert_eq!(json, "\"OPS-7\"");
        let back: IssueIdentifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id("OPS-7"));
        assert!(serde_json::from_str::<IssueIdentifier>("\"nope\"").is_err());
    }

    #[test]
    fn test_identifier_ordering() {
        let mut ids = vec![id("B-1"), id("A-10"), id("A-2")];
        ids.sort();
        assert_eq!(ids, vec![id("A-2"), id("A-10"), id("B-1")]);
    }

    #[test]
    fn test_priority_orders_by_severity() {
        let mut priorities = vec![Priority::Low, Priority::High, Priority::Medium];
        priorities.sort();
        assert_eq!(priorities, vec![Priority::High, Priority::Medium, Priority::Low]);
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_builder_requires_title_and_project() {
        let err = IssueBuilder::new().build().unwrap_err();
        match err {
            IssueError::ValidationErrors { errors } => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert!(fields.contains(&"project"));
                assert!(fields.contains(&"title"));
            }
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_rejects_long_fields() {
        let err = IssueBuilder::new()
            .project("APP")
            .issue_number(1)
            .title("x".repeat(201))
            .description("y".repeat(501))
            .build()
            .unwrap_err();
        assert!(matches!(err, IssueError::ValidationErrors { ref errors } if errors.len() == 2));
    }

    #[test]
    fn test_builder_rejects_epic_on_epic() {
        let err = IssueBuilder::new()
            .project("APP")
            .issue_number(2)
            .title("Platform")
            .issue_type(IssueType::Epic)
            .epic_id(id("APP-1"))
            .build()
            .unwrap_err();
        assert!(matches!(err, IssueError::Validation { ref field, .. } if field == "epicId"));
    }

    #[test]
    fn test_builder_defaults() {
        let issue = make_issue("app", 3, "Defaults");
        assert_eq!(issue.id(), &id("APP-3"));
        assert_eq!(issue.priority(), Priority::Low);
        assert_eq!(issue.issue_type(), IssueType::Defect);
        assert_eq!(issue.state(), IssueState::BackLog);
        assert!(issue.start_time().is_none());
        assert!(!issue.concurrency_token().as_str().is_empty());
        assert!(issue.check_invariants().is_ok());
    }

    #[test]
    fn test_set_title_validates() {
        let mut issue = make_issue("APP", 1, "Original");
        assert!(issue.set_title("").is_err());
        assert_eq!(issue.title(), "Original");
        issue.set_title("Renamed").unwrap();
        assert_eq!(issue.title(), "Renamed");
    }

    #[test]
    fn test_becoming_epic_clears_epic_reference() {
        let mut issue = make_issue("APP", 4, "Story");
        issue.set_epic_id(Some(id("APP-1"))).unwrap();
        issue.set_issue_type(IssueType::Epic);
        assert!(issue.epic_id().is_none());
        assert!(issue.set_epic_id(Some(id("APP-1"))).is_err());
    }

    #[test]
    fn test_add_link_rejects_self_link() {
        let mut a = make_issue("APP", 1, "A");
        let own = a.id().clone();
        let err = a
            .add_link(LinkDirection::Outgoing, LinkType::Related, &own)
            .unwrap_err();
        assert!(matches!(err, IssueError::Validation { .. }));
        assert_eq!(a.outgoing_links().count(), 0);
    }

    #[test]
    fn test_add_link_is_idempotent() {
        let mut a = make_issue("APP", 1, "A");
        let b = id("APP-2");
        assert!(a.add_link(LinkDirection::Outgoing, LinkType::Related, &b).unwrap());
        assert!(!a.add_link(LinkDirection::Outgoing, LinkType::Related, &b).unwrap());
        assert_eq!(a.outgoing_links().count(), 1);

        // Same endpoints, different type is a distinct edge.
        assert!(a.add_link(LinkDirection::Outgoing, LinkType::Blocking, &b).unwrap());
        assert_eq!(a.outgoing_links().count(), 2);
    }

    #[test]
    fn test_parent_child_navigation() {
        let mut epic = make_issue("APP", 1, "Epic");
        let mut child = make_issue("APP", 2, "Child");
        epic.add_link(LinkDirection::Outgoing, LinkType::ParentChild, child.id())
            .unwrap();
        child
            .add_link(LinkDirection::Incoming, LinkType::ParentChild, epic.id())
            .unwrap();
        assert_eq!(epic.child_ids().collect::<Vec<_>>(), vec![child.id()]);
        assert_eq!(child.parent_ids().collect::<Vec<_>>(), vec![epic.id()]);
    }

    #[test]
    fn test_remove_link() {
        let mut a = make_issue("APP", 1, "A");
        let b = id("APP-2");
        a.add_link(LinkDirection::Incoming, LinkType::Duplicate, &b).unwrap();
        assert!(!a.remove_link(LinkDirection::Incoming, LinkType::Related, &b));
        assert!(a.remove_link(LinkDirection::Incoming, LinkType::Duplicate, &b));
        assert_eq!(a.incoming_links().count(), 0);
    }

    #[test]
    fn test_check_invariants_reports_bad_records() {
        let start = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let mut issue = make_issue("APP", 1, "Imported");
        issue.start_time = Some(start);
        issue.stop_time = Some(start - Duration::days(1));
        issue.title = String::new();

        let errors = issue.check_invariants().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"title"));
        assert!(fields.contains(&"stopTime"));
    }

    #[test]
    fn test_rotate_concurrency_token_changes_token() {
        let mut issue = make_issue("APP", 1, "Token");
        let before = issue.concurrency_token().clone();
        issue.rotate_concurrency_token();
        assert_ne!(&before, issue.concurrency_token());
        assert_eq!(issue.revision(), 1);
    }

    #[test]
    fn test_time_setters_are_write_once() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut issue = make_issue("APP", 1, "Times");
        issue.set_start_time(start).unwrap();
        assert!(issue.set_start_time(start + Duration::hours(1)).is_err());
        assert!(issue.set_stop_time(start - Duration::hours(1)).is_err());
        issue.set_stop_time(start + Duration::hours(2)).unwrap();
        assert!(issue.set_stop_time(start + Duration::hours(3)).is_err());
        assert!(issue.check_invariants().is_ok());
    }

    #[test]
    fn test_user_parse() {
        let user: User = "Ada Lovelace <ada>".parse().unwrap();
        assert_eq!(user.user_id, "ada");
        assert_eq!(user.full_name, "Ada Lovelace");
        let bare: User = "bob".parse().unwrap();
        assert_eq!(bare.full_name, "bob");
        assert!("Ada <".parse::<User>().is_err());
    }

    #[test]
    fn test_add_comment_assigns_ids_and_stamps_time() {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let mut issue = make_issue("APP", 1, "Comments");
        let ada = User::new("ada", "Ada Lovelace");
        assert_eq!(issue.add_comment(ada.clone(), "Reproduced on 1.2", at).unwrap(), 1);
        assert_eq!(issue.add_comment(ada, "Fixed upstream", at).unwrap(), 2);

        let comments = issue.comments();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "Reproduced on 1.2");
        assert_eq!(comments[0].author.user_id, "ada");
        assert_eq!(comments[1].created_at, at);
        assert!(issue.check_invariants().is_ok());
    }

    #[test]
    fn test_add_comment_rejects_blank_and_long_content() {
        let mut issue = make_issue("APP", 1, "Comments");
        let bob = User::new("bob", "bob");
        let err = issue.add_comment(bob.clone(), "   ", Utc::now()).unwrap_err();
        assert!(matches!(err, IssueError::Validation { ref field, .. } if field == "content"));
        assert!(issue.add_comment(bob.clone(), "x".repeat(MAX_COMMENT_LEN + 1), Utc::now()).is_err());
        assert!(issue.add_comment(bob, "x".repeat(MAX_COMMENT_LEN), Utc::now()).is_ok());
        assert_eq!(issue.comments().len(), 1);
    }

    #[test]
    fn test_comments_round_trip_through_json() {
        let mut issue = make_issue("APP", 1, "Comments");
        issue
            .add_comment(User::new("ada", "Ada Lovelace"), "Looks good", Utc::now())
            .unwrap();
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["comments"][0]["text"], "Looks good");
        let back: Issue = serde_json::from_value(json).unwrap();
        assert_eq!(back.comments(), issue.comments());

        let bare = serde_json::to_value(make_issue("APP", 2, "Quiet")).unwrap();
        assert!(bare.get("comments").is_none());
    }
}
