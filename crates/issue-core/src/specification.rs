//! Predicate and selector specifications.
//!
//! A [`Predicate`] is data, not a closure: field comparisons, text
//! containment and boolean combinators over a closed field enum. Adapters
//! walk the tree to build a native filter; [`Predicate::evaluate`] is the
//! in-memory fallback. A [`Selector`] declares the columns it reads and maps
//! that row through a plain `fn` pointer, so it cannot capture state either.
//!
//! Ill-typed specifications are rejected when they are built, never when
//! they run.

use std::collections::HashSet;
use std::fmt;
use std::ops::Not;

use serde::Serialize;

use crate::error::{IssueError, Result};
use crate::fields::{IssueField, QueryField, Queryable, Value};
use crate::model::{
    Issue, IssueIdentifier, IssueType, Priority, User, validate_project_code,
};
use crate::workflow::IssueState;

/// Comparison operator of a [`Predicate::Compare`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    const fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A boolean test over `T`.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate<T: Queryable> {
    /// Matches everything.
    Always,
    Compare {
        field: T::Field,
        op: CompareOp,
        value: Value,
    },
    /// Case-insensitive substring match on a text field.
    Contains { field: T::Field, needle: String },
    And(Vec<Predicate<T>>),
    Or(Vec<Predicate<T>>),
    Not(Box<Predicate<T>>),
}

impl<T: Queryable> Predicate<T> {
    #[must_use]
    pub const fn always() -> Self {
        Self::Always
    }

    /// Build a comparison node.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpecification` when the value kind differs from the
    /// field kind, an ordering operator targets an unordered field, or a null
    /// is compared with anything but `=`/`!=` on a nullable field.
    pub fn compare(field: T::Field, op: CompareOp, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        match value.kind() {
            None => {
                if !field.is_nullable() {
                    return Err(IssueError::invalid_specification(format!(
                        "{field} is never null"
                    )));
                }
                if op.is_ordering() {
                    return Err(IssueError::invalid_specification(format!(
                        "cannot order {field} against null"
                    )));
                }
            }
            Some(kind) => {
                if kind != field.kind() {
                    return Err(IssueError::invalid_specification(format!(
                        "{field} holds {} values, not {kind}",
                        field.kind()
                    )));
                }
                if op.is_ordering() && !kind.is_ordered() {
                    return Err(IssueError::invalid_specification(format!(
                        "{field} does not support '{op}'"
                    )));
                }
            }
        }
        Ok(Self::Compare { field, op, value })
    }

    /// Shorthand for an `=` comparison.
    ///
    /// # Errors
    ///
    /// Same as [`Predicate::compare`].
    pub fn equals(field: T::Field, value: impl Into<Value>) -> Result<Self> {
        Self::compare(field, CompareOp::Eq, value)
    }

    /// Build a case-insensitive containment test on a text field.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpecification` for non-text fields or an empty needle.
    pub fn contains(field: T::Field, needle: &str) -> Result<Self> {
        if field.kind() != crate::fields::ValueKind::Text {
            return Err(IssueError::invalid_specification(format!(
                "{field} is not a text field"
            )));
        }
        if needle.is_empty() {
            return Err(IssueError::invalid_specification(
                "containment needle cannot be empty",
            ));
        }
        Ok(Self::Contains {
            field,
            needle: needle.to_lowercase(),
        })
    }

    /// Conjunction, flattening nested `And` nodes and dropping `Always`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::all([self, other])
    }

    /// Disjunction, flattening nested `Or` nodes.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        let mut parts = Vec::new();
        for p in [self, other] {
            match p {
                Self::Or(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        }
        Self::Or(parts)
    }

    /// Conjunction of any number of predicates. Empty input matches everything.
    #[must_use]
    pub fn all(predicates: impl IntoIterator<Item = Self>) -> Self {
        let mut parts = Vec::new();
        for p in predicates {
            match p {
                Self::Always => {}
                Self::And(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        }
        match parts.len() {
            0 => Self::Always,
            1 => parts.pop().unwrap_or(Self::Always),
            _ => Self::And(parts),
        }
    }

    /// In-memory evaluation against one entity.
    #[must_use]
    pub fn evaluate(&self, entity: &T) -> bool {
        match self {
            Self::Always => true,
            Self::Compare { field, op, value } => {
                let actual = entity.field_value(*field);
                match op {
                    CompareOp::Eq => actual == *value,
                    CompareOp::Ne => actual != *value,
                    // Ordering comparisons never match a null column.
                    _ if actual.is_null() => false,
                    CompareOp::Lt => actual < *value,
                    CompareOp::Le => actual <= *value,
                    CompareOp::Gt => actual > *value,
                    CompareOp::Ge => actual >= *value,
                }
            }
            Self::Contains { field, needle } => entity
                .field_value(*field)
                .as_text()
                .is_some_and(|text| text.to_lowercase().contains(needle.as_str())),
            Self::And(parts) => parts.iter().all(|p| p.evaluate(entity)),
            Self::Or(parts) => parts.iter().any(|p| p.evaluate(entity)),
            Self::Not(inner) => !inner.evaluate(entity),
        }
    }

    /// Stable textual rendering, e.g. `(Project = "APP" AND Priority = high)`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Always => "TRUE".to_string(),
            Self::Compare { field, op, value } => format!("{field} {op} {value}"),
            Self::Contains { field, needle } => format!("{field} CONTAINS {needle:?}"),
            Self::And(parts) => join_parts(parts, " AND "),
            Self::Or(parts) => join_parts(parts, " OR "),
            Self::Not(inner) => format!("NOT {}", inner.describe()),
        }
    }
}

fn join_parts<T: Queryable>(parts: &[Predicate<T>], sep: &str) -> String {
    let rendered: Vec<String> = parts.iter().map(Predicate::describe).collect();
    format!("({})", rendered.join(sep))
}

impl<T: Queryable> Not for Predicate<T> {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}

impl<T: Queryable> fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl Predicate<Issue> {
    /// Issues belonging to `project` (project codes compare upper-cased).
    ///
    /// # Errors
    ///
    /// Returns `Validation` on field `project` for a malformed code.
    pub fn project_equals(project: &str) -> Result<Self> {
        let code = validate_project_code(project)?;
        Ok(Self::Compare {
            field: IssueField::Project,
            op: CompareOp::Eq,
            value: Value::Text(code),
        })
    }

    #[must_use]
    pub const fn priority_equals(priority: Priority) -> Self {
        Self::Compare {
            field: IssueField::Priority,
            op: CompareOp::Eq,
            value: Value::Priority(priority),
        }
    }

    #[must_use]
    pub const fn type_equals(issue_type: IssueType) -> Self {
        Self::Compare {
            field: IssueField::Type,
            op: CompareOp::Eq,
            value: Value::Type(issue_type),
        }
    }

    #[must_use]
    pub const fn state_equals(state: IssueState) -> Self {
        Self::Compare {
            field: IssueField::State,
            op: CompareOp::Eq,
            value: Value::State(state),
        }
    }

    /// Issues whose epic is `epic`; `None` selects issues without an epic.
    #[must_use]
    pub fn epic_equals(epic: Option<IssueIdentifier>) -> Self {
        Self::Compare {
            field: IssueField::EpicId,
            op: CompareOp::Eq,
            value: epic.into(),
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidSpecification` for an empty search string.
    pub fn title_contains(text: &str) -> Result<Self> {
        Self::contains(IssueField::Title, text)
    }

    /// The single issue with identifier `id`.
    #[must_use]
    pub fn issue_number(id: IssueIdentifier) -> Self {
        Self::Compare {
            field: IssueField::Id,
            op: CompareOp::Eq,
            value: Value::Identifier(id),
        }
    }
}

/// A pure projection `T -> R` over declared columns.
pub struct Selector<T: Queryable, R> {
    name: &'static str,
    columns: Vec<T::Field>,
    project: fn(&[Value]) -> Option<R>,
}

impl<T: Queryable, R> Selector<T, R> {
    /// Build a selector.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpecification` when no columns are declared or a
    /// column is listed twice.
    pub fn new(
        name: &'static str,
        columns: Vec<T::Field>,
        project: fn(&[Value]) -> Option<R>,
    ) -> Result<Self> {
        if columns.is_empty() {
            return Err(IssueError::invalid_specification(format!(
                "selector '{name}' reads no columns"
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(**c)) {
            return Err(IssueError::invalid_specification(format!(
                "selector '{name}' reads {dup} twice"
            )));
        }
        Ok(Self {
            name,
            columns,
            project,
        })
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[T::Field] {
        &self.columns
    }

    /// Read the declared columns into a row.
    #[must_use]
    pub fn row(&self, entity: &T) -> Vec<Value> {
        self.columns.iter().map(|c| entity.field_value(*c)).collect()
    }

    /// Project a row already fetched by an adapter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpecification` when the row does not have the shape
    /// the selector declared.
    pub fn project_row(&self, row: &[Value]) -> Result<R> {
        (self.project)(row).ok_or_else(|| {
            IssueError::invalid_specification(format!(
                "selector '{}' cannot project row of {} values",
                self.name,
                row.len()
            ))
        })
    }

    /// In-memory projection of one entity.
    ///
    /// # Errors
    ///
    /// Same as [`Selector::project_row`].
    pub fn apply(&self, entity: &T) -> Result<R> {
        self.project_row(&self.row(entity))
    }
}

impl<T: Queryable, R> Clone for Selector<T, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            columns: self.columns.clone(),
            project: self.project,
        }
    }
}

impl<T: Queryable, R> fmt::Debug for Selector<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// List-view projection of an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueSummary {
    pub id: IssueIdentifier,
    pub title: String,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub state: IssueState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epic_id: Option<IssueIdentifier>,
}

fn summary_from_row(row: &[Value]) -> Option<IssueSummary> {
    match row {
        [
            Value::Identifier(id),
            Value::Text(title),
            Value::Priority(priority),
            Value::Type(issue_type),
            Value::State(state),
            assignee,
            epic,
        ] => Some(IssueSummary {
            id: id.clone(),
            title: title.clone(),
            priority: *priority,
            issue_type: *issue_type,
            state: *state,
            assignee: assignee.as_user().cloned(),
            epic_id: epic.as_identifier().cloned(),
        }),
        _ => None,
    }
}

fn number_from_row(row: &[Value]) -> Option<u32> {
    match row {
        [Value::Number(n)] => u32::try_from(*n).ok(),
        _ => None,
    }
}

fn identifier_from_row(row: &[Value]) -> Option<IssueIdentifier> {
    match row {
        [Value::Identifier(id)] => Some(id.clone()),
        _ => None,
    }
}

impl Selector<Issue, IssueSummary> {
    /// # Errors
    ///
    /// Never fails for the built-in column list.
    pub fn issue_summary() -> Result<Self> {
        Self::new(
            "IssueSummary",
            vec![
                IssueField::Id,
                IssueField::Title,
                IssueField::Priority,
                IssueField::Type,
                IssueField::State,
                IssueField::Assignee,
                IssueField::EpicId,
            ],
            summary_from_row,
        )
    }
}

impl Selector<Issue, u32> {
    /// # Errors
    ///
    /// Never fails for the built-in column list.
    pub fn issue_number() -> Result<Self> {
        Self::new("IssueNumber", vec![IssueField::IssueNumber], number_from_row)
    }
}

impl Selector<Issue, IssueIdentifier> {
    /// # Errors
    ///
    /// Never fails for the built-in column list.
    pub fn identifier() -> Result<Self> {
        Self::new("Identifier", vec![IssueField::Id], identifier_from_row)
    }
}
