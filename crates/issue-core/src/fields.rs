//! Field schema shared by specifications, sorting and patching.
//!
//! Entities expose their columns through [`Queryable::field_value`], which
//! returns a typed [`Value`]. Predicates, selectors and sort keys only ever
//! name fields from a closed enum, so a persistence adapter can map each one
//! to a native column.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{IssueError, Result};
use crate::model::{Issue, IssueIdentifier, IssueType, Priority, User};
use crate::patch::PatchField;
use crate::workflow::IssueState;

/// A column value read from an entity.
///
/// Variant order matters: `Null` sorts before every other value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Number(i64),
    Time(DateTime<Utc>),
    Priority(Priority),
    Type(IssueType),
    State(IssueState),
    Identifier(IssueIdentifier),
    User(User),
}

/// The kind of a non-null [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Text,
    Number,
    Time,
    Priority,
    Type,
    State,
    Identifier,
    User,
}

impl ValueKind {
    /// Whether `<`, `<=`, `>`, `>=` are meaningful for this kind.
    #[must_use]
    pub const fn is_ordered(self) -> bool {
        matches!(
            self,
            Self::Text | Self::Number | Self::Time | Self::Priority | Self::Identifier
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Time => "time",
            Self::Priority => "priority",
            Self::Type => "type",
            Self::State => "state",
            Self::Identifier => "identifier",
            Self::User => "user",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// `None` for `Null`.
    #[must_use]
    pub const fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Text(_) => Some(ValueKind::Text),
            Self::Number(_) => Some(ValueKind::Number),
            Self::Time(_) => Some(ValueKind::Time),
            Self::Priority(_) => Some(ValueKind::Priority),
            Self::Type(_) => Some(ValueKind::Type),
            Self::State(_) => Some(ValueKind::State),
            Self::Identifier(_) => Some(ValueKind::Identifier),
            Self::User(_) => Some(ValueKind::User),
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_identifier(&self) -> Option<&IssueIdentifier> {
        match self {
            Self::Identifier(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_user(&self) -> Option<&User> {
        match self {
            Self::User(user) => Some(user),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Time(t) => f.write_str(&t.to_rfc3339()),
            Self::Priority(p) => write!(f, "{p}"),
            Self::Type(t) => write!(f, "{t}"),
            Self::State(s) => write!(f, "{s}"),
            Self::Identifier(id) => write!(f, "{id}"),
            Self::User(u) => write!(f, "{:?}", u.user_id),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Number(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Time(value)
    }
}

impl From<Priority> for Value {
    fn from(value: Priority) -> Self {
        Self::Priority(value)
    }
}

impl From<IssueType> for Value {
    fn from(value: IssueType) -> Self {
        Self::Type(value)
    }
}

impl From<IssueState> for Value {
    fn from(value: IssueState) -> Self {
        Self::State(value)
    }
}

impl From<IssueIdentifier> for Value {
    fn from(value: IssueIdentifier) -> Self {
        Self::Identifier(value)
    }
}

impl From<User> for Value {
    fn from(value: User) -> Self {
        Self::User(value)
    }
}

impl<V: Into<Self>> From<Option<V>> for Value {
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A column of a queryable entity.
pub trait QueryField: Copy + Eq + Hash + fmt::Debug + fmt::Display + 'static {
    /// Kind of every non-null value of this field.
    fn kind(self) -> ValueKind;

    /// Whether the field may read as [`Value::Null`].
    fn is_nullable(self) -> bool;
}

/// An entity that predicates, selectors and sort keys can read.
pub trait Queryable {
    type Field: QueryField;

    fn field_value(&self, field: Self::Field) -> Value;
}

/// Whitelisted issue fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueField {
    Id,
    Title,
    Description,
    Project,
    IssueNumber,
    Type,
    Priority,
    State,
    EpicId,
    Assignee,
    Reporter,
    StartTime,
    StopTime,
}

impl IssueField {
    pub const COUNT: usize = Self::StopTime as usize + 1;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Id,
        Self::Title,
        Self::Description,
        Self::Project,
        Self::IssueNumber,
        Self::Type,
        Self::Priority,
        Self::State,
        Self::EpicId,
        Self::Assignee,
        Self::Reporter,
        Self::StartTime,
        Self::StopTime,
    ];

    /// Canonical name, as accepted by the sort parser.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "Id",
            Self::Title => "Title",
            Self::Description => "Description",
            Self::Project => "Project",
            Self::IssueNumber => "IssueNumber",
            Self::Type => "Type",
            Self::Priority => "Priority",
            Self::State => "State",
            Self::EpicId => "EpicId",
            Self::Assignee => "Assignee",
            Self::Reporter => "Reporter",
            Self::StartTime => "StartTime",
            Self::StopTime => "StopTime",
        }
    }
}

impl fmt::Display for IssueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueField {
    type Err = IssueError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| IssueError::validation("field", format!("unknown field '{name}'")))
    }
}

impl QueryField for IssueField {
    fn kind(self) -> ValueKind {
        match self {
            Self::Id | Self::EpicId => ValueKind::Identifier,
            Self::Title | Self::Description | Self::Project => ValueKind::Text,
            Self::IssueNumber => ValueKind::Number,
            Self::Type => ValueKind::Type,
            Self::Priority => ValueKind::Priority,
            Self::State => ValueKind::State,
            Self::Assignee | Self::Reporter => ValueKind::User,
            Self::StartTime | Self::StopTime => ValueKind::Time,
        }
    }

    fn is_nullable(self) -> bool {
        matches!(
            self,
            Self::EpicId | Self::Assignee | Self::Reporter | Self::StartTime | Self::StopTime
        )
    }
}

impl Queryable for Issue {
    type Field = IssueField;

    fn field_value(&self, field: IssueField) -> Value {
        match field {
            IssueField::Id => self.id().clone().into(),
            IssueField::Title => self.title().into(),
            IssueField::Description => self.description().into(),
            IssueField::Project => self.project().into(),
            IssueField::IssueNumber => self.issue_number().into(),
            IssueField::Type => self.issue_type().into(),
            IssueField::Priority => self.priority().into(),
            IssueField::State => self.state().into(),
            IssueField::EpicId => self.epic_id().cloned().into(),
            IssueField::Assignee => self.assignee().cloned().into(),
            IssueField::Reporter => self.reporter().cloned().into(),
            IssueField::StartTime => self.start_time().into(),
            IssueField::StopTime => self.stop_time().into(),
        }
    }
}

/// Check the sortable and patchable field whitelists.
///
/// Every canonical name must parse back to its own field, names must be
/// unique case-insensitively, table order must follow declaration order, and
/// every patchable field must be backed by an issue field of the same kind.
///
/// # Errors
///
/// Returns `InvalidSpecification` describing the first broken entry.
pub fn verify_field_tables() -> Result<()> {
    let mut seen = HashSet::new();
    for (index, field) in IssueField::ALL.into_iter().enumerate() {
        if field as usize != index {
            return Err(IssueError::invalid_specification(format!(
                "field table out of order at {field}"
            )));
        }
        if field.as_str().parse::<IssueField>().ok() != Some(field) {
            return Err(IssueError::invalid_specification(format!(
                "field name '{field}' does not round-trip"
            )));
        }
        if !seen.insert(field.as_str().to_ascii_lowercase()) {
            return Err(IssueError::invalid_specification(format!(
                "duplicate field name '{field}'"
            )));
        }
    }

    let mut seen = HashSet::new();
    for field in PatchField::ALL {
        if field.as_str().parse::<PatchField>().ok() != Some(field) {
            return Err(IssueError::invalid_specification(format!(
                "patch field name '{field}' does not round-trip"
            )));
        }
        if !seen.insert(field.as_str().to_ascii_lowercase()) {
            return Err(IssueError::invalid_specification(format!(
                "duplicate patch field name '{field}'"
            )));
        }
        let backing = field.issue_field();
        if backing.as_str() != field.as_str() {
            return Err(IssueError::invalid_specification(format!(
                "patch field '{field}' is backed by '{backing}'"
            )));
        }
    }

    tracing::debug!(
        sortable = IssueField::COUNT,
        patchable = PatchField::ALL.len(),
        "field tables verified"
    );
    Ok(())
}
