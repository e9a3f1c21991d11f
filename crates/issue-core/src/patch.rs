//! Whitelisted partial updates.
//!
//! A patch names one [`PatchField`] and carries a [`PatchValue`]. Unknown
//! names and values of the wrong kind fail with `Validation` on the patched
//! field; the aggregate's own setters enforce the remaining invariants.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IssueError, Result};
use crate::fields::{IssueField, QueryField, ValueKind};
use crate::model::{Issue, IssueIdentifier, IssueType, Priority, User};

/// Fields that may be changed by a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchField {
    Title,
    Description,
    Priority,
    Type,
    EpicId,
    Assignee,
    Reporter,
    StartTime,
    StopTime,
}

impl PatchField {
    pub const ALL: [Self; 9] = [
        Self::Title,
        Self::Description,
        Self::Priority,
        Self::Type,
        Self::EpicId,
        Self::Assignee,
        Self::Reporter,
        Self::StartTime,
        Self::StopTime,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Description => "Description",
            Self::Priority => "Priority",
            Self::Type => "Type",
            Self::EpicId => "EpicId",
            Self::Assignee => "Assignee",
            Self::Reporter => "Reporter",
            Self::StartTime => "StartTime",
            Self::StopTime => "StopTime",
        }
    }

    /// The issue column this patch writes.
    #[must_use]
    pub const fn issue_field(self) -> IssueField {
        match self {
            Self::Title => IssueField::Title,
            Self::Description => IssueField::Description,
            Self::Priority => IssueField::Priority,
            Self::Type => IssueField::Type,
            Self::EpicId => IssueField::EpicId,
            Self::Assignee => IssueField::Assignee,
            Self::Reporter => IssueField::Reporter,
            Self::StartTime => IssueField::StartTime,
            Self::StopTime => IssueField::StopTime,
        }
    }

    fn field_key(self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_ascii_lowercase().to_string() + chars.as_str()
        })
    }
}

impl fmt::Display for PatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchField {
    type Err = IssueError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                IssueError::validation("field", format!("'{name}' is not a patchable field"))
            })
    }
}

/// A typed patch payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PatchValue {
    /// Clears an optional field.
    Null,
    Text(String),
    Priority(Priority),
    Type(IssueType),
    Identifier(IssueIdentifier),
    User(User),
    Time(DateTime<Utc>),
}

impl PatchValue {
    const fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Text(_) => Some(ValueKind::Text),
            Self::Priority(_) => Some(ValueKind::Priority),
            Self::Type(_) => Some(ValueKind::Type),
            Self::Identifier(_) => Some(ValueKind::Identifier),
            Self::User(_) => Some(ValueKind::User),
            Self::Time(_) => Some(ValueKind::Time),
        }
    }

    /// Parse a raw string into the payload kind `field` expects.
    ///
    /// `null`, `none` and the empty string clear optional fields.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on the patched field when `raw` does not parse.
    pub fn parse(field: PatchField, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let issue_field = field.issue_field();
        if issue_field.is_nullable()
            && (trimmed.is_empty()
                || trimmed.eq_ignore_ascii_case("null")
                || trimmed.eq_ignore_ascii_case("none"))
        {
            return Ok(Self::Null);
        }

        let wrong = |reason: String| IssueError::validation(field.field_key(), reason);
        match issue_field.kind() {
            ValueKind::Text => Ok(Self::Text(raw.to_string())),
            ValueKind::Priority => trimmed
                .parse()
                .map(Self::Priority)
                .map_err(|e| wrong(e.to_string())),
            ValueKind::Type => trimmed
                .parse()
                .map(Self::Type)
                .map_err(|e| wrong(e.to_string())),
            ValueKind::Identifier => trimmed
                .parse()
                .map(Self::Identifier)
                .map_err(|e| wrong(e.to_string())),
            ValueKind::User => trimmed
                .parse()
                .map(Self::User)
                .map_err(|e| wrong(e.to_string())),
            ValueKind::Time => DateTime::parse_from_rfc3339(trimmed)
                .map(|t| Self::Time(t.with_timezone(&Utc)))
                .map_err(|e| wrong(format!("expected an RFC 3339 timestamp: {e}"))),
            ValueKind::Number | ValueKind::State => Err(wrong(format!(
                "{} values cannot be patched",
                issue_field.kind()
            ))),
        }
    }
}

impl Issue {
    /// Apply one whitelisted partial update.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the value has the wrong kind for the field,
    /// clears a required field, or breaks an aggregate invariant.
    pub fn patch(&mut self, field: PatchField, value: PatchValue) -> Result<()> {
        let expected = field.issue_field().kind();
        match value.kind() {
            Some(kind) if kind != expected => {
                return Err(IssueError::validation(
                    field.field_key(),
                    format!("expected a {expected} value, got {kind}"),
                ));
            }
            None if !field.issue_field().is_nullable() => {
                return Err(IssueError::validation(field.field_key(), "cannot be cleared"));
            }
            _ => {}
        }

        match (field, value) {
            (PatchField::Title, PatchValue::Text(title)) => self.set_title(title),
            (PatchField::Description, PatchValue::Text(description)) => {
                self.set_description(description)
            }
            (PatchField::Priority, PatchValue::Priority(priority)) => {
                self.set_priority(priority);
                Ok(())
            }
            (PatchField::Type, PatchValue::Type(issue_type)) => {
                self.set_issue_type(issue_type);
                Ok(())
            }
            (PatchField::EpicId, PatchValue::Identifier(epic)) => self.set_epic_id(Some(epic)),
            (PatchField::EpicId, PatchValue::Null) => self.set_epic_id(None),
            (PatchField::Assignee, PatchValue::User(user)) => {
                self.set_assignee(Some(user));
                Ok(())
            }
            (PatchField::Assignee, PatchValue::Null) => {
                self.set_assignee(None);
                Ok(())
            }
            (PatchField::Reporter, PatchValue::User(user)) => {
                self.set_reporter(Some(user));
                Ok(())
            }
            (PatchField::Reporter, PatchValue::Null) => {
                self.set_reporter(None);
                Ok(())
            }
            (PatchField::StartTime, PatchValue::Time(at)) => self.set_start_time(at),
            (PatchField::StopTime, PatchValue::Time(at)) => self.set_stop_time(at),
            (PatchField::StartTime | PatchField::StopTime, PatchValue::Null) => Err(
                IssueError::validation(field.field_key(), "cannot be cleared once recorded"),
            ),
            (field, _) => Err(IssueError::validation(
                field.field_key(),
                "value does not match field",
            )),
        }
    }

    /// Apply a patch addressed by field name.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for unknown names, plus everything [`Issue::patch`] returns.
    pub fn patch_named(&mut self, name: &str, value: PatchValue) -> Result<()> {
        let field: PatchField = name.parse()?;
        self.patch(field, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IssueBuilder;

    fn make_issue() -> Issue {
        IssueBuilder::new()
            .project("APP")
            .issue_number(5)
            .title("Patch me")
            .build()
            .unwrap()
    }

    #[test]
    fn test_patch_title() {
        let mut issue = make_issue();
        issue
            .patch_named("title", PatchValue::Text("Patched".to_string()))
            .unwrap();
        assert_eq!(issue.title(), "Patched");
    }

    #[test]
    fn test_unknown_field_is_validation_error() {
        let mut issue = make_issue();
        let err = issue
            .patch_named("Colour", PatchValue::Text("red".to_string()))
            .unwrap_err();
        assert!(matches!(err, IssueError::Validation { ref field, .. } if field == "field"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_state_is_not_patchable() {
        assert!("State".parse::<PatchField>().is_err());
        assert!("Id".parse::<PatchField>().is_err());
    }

    #[test]
    fn test_wrong_value_kind_rejected() {
        let mut issue = make_issue();
        let err = issue
            .patch(PatchField::Priority, PatchValue::Text("high".to_string()))
            .unwrap_err();
        assert!(matches!(err, IssueError::Validation { ref field, .. } if field == "priority"));
        assert_eq!(issue.priority(), Priority::Low);
    }

    #[test]
    fn test_required_field_cannot_be_cleared() {
        let mut issue = make_issue();
        assert!(issue.patch(PatchField::Title, PatchValue::Null).is_err());
        assert_eq!(issue.title(), "Patch me");
    }

    #[test]
    fn test_patch_epic_then_clear() {
        let mut issue = make_issue();
        let epic: IssueIdentifier = "APP-1".parse().unwrap();
        issue
            .patch(PatchField::EpicId, PatchValue::Identifier(epic.clone()))
            .unwrap();
        assert_eq!(issue.epic_id(), Some(&epic));
        issue.patch(PatchField::EpicId, PatchValue::Null).unwrap();
        assert!(issue.epic_id().is_none());
    }

    #[test]
    fn test_parse_raw_values() {
        assert_eq!(
            PatchValue::parse(PatchField::Priority, "High").unwrap(),
            PatchValue::Priority(Priority::High)
        );
        assert_eq!(
            PatchValue::parse(PatchField::Assignee, "none").unwrap(),
            PatchValue::Null
        );
        assert!(matches!(
            PatchValue::parse(PatchField::StartTime, "2026-01-01T10:00:00Z").unwrap(),
            PatchValue::Time(_)
        ));
        let err = PatchValue::parse(PatchField::EpicId, "not an id").unwrap_err();
        assert!(matches!(err, IssueError::Validation { ref field, .. } if field == "epicId"));
    }

    #[test]
    fn test_title_patch_keeps_whitespace_verbatim() {
        assert_eq!(
            PatchValue::parse(PatchField::Title, "  spaced  ").unwrap(),
            PatchValue::Text("  spaced  ".to_string())
        );
    }
}
