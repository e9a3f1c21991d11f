//! Order-by parsing and sort application.
//!
//! Grammar: comma-separated `<field> [ASC|DESC]` tokens, field names matched
//! case-insensitively against [`IssueField`]. Anything else is a validation
//! error on `orderBy`. An `Id ASC` tie-breaker is always appended so pages
//! are stable across calls.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{IssueError, Result};
use crate::fields::{IssueField, Queryable};

pub const ORDER_BY_FIELD: &str = "orderBy";

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = IssueError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(IssueError::validation(
                ORDER_BY_FIELD,
                format!("unknown sort direction '{s}'"),
            ))
        }
    }
}

/// One `(field, direction)` sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: IssueField,
    pub direction: SortDirection,
}

impl SortKey {
    #[must_use]
    pub const fn asc(field: IssueField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    #[must_use]
    pub const fn desc(field: IssueField) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction)
    }
}

/// Parsed order-by expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortingOptions {
    keys: Vec<SortKey>,
}

impl Default for SortingOptions {
    fn default() -> Self {
        Self {
            keys: vec![SortKey::asc(IssueField::Id)],
        }
    }
}

impl SortingOptions {
    /// Parse an order-by expression such as `"Priority, Type, Title DESC"`.
    ///
    /// `None`, empty and blank input yield `Id ASC`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` on `orderBy` for empty tokens, unknown fields,
    /// unknown directions or extra words.
    pub fn parse(order_by: Option<&str>) -> Result<Self> {
        let Some(text) = order_by.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(Self::default());
        };

        let mut keys: Vec<SortKey> = Vec::new();
        for token in text.split(',') {
            let mut words = token.split_whitespace();
            let Some(name) = words.next() else {
                return Err(IssueError::validation(
                    ORDER_BY_FIELD,
                    format!("empty sort key in '{text}'"),
                ));
            };
            let field: IssueField = name.parse().map_err(|_| {
                IssueError::validation(ORDER_BY_FIELD, format!("unknown sort field '{name}'"))
            })?;
            let direction = match words.next() {
                Some(word) => word.parse()?,
                None => SortDirection::Asc,
            };
            if let Some(extra) = words.next() {
                return Err(IssueError::validation(
                    ORDER_BY_FIELD,
                    format!("unexpected '{extra}' after '{name}'"),
                ));
            }
            // A repeated field can never change the order; keep the first.
            if !keys.iter().any(|k| k.field == field) {
                keys.push(SortKey { field, direction });
            }
        }

        if !keys.iter().any(|k| k.field == IssueField::Id) {
            keys.push(SortKey::asc(IssueField::Id));
        }

        tracing::trace!(order_by = text, keys = keys.len(), "parsed sort expression");
        Ok(Self { keys })
    }

    /// The sort keys in application order, tie-breaker included.
    #[must_use]
    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Compare two entities by every key in turn.
    #[must_use]
    pub fn compare<T: Queryable<Field = IssueField>>(&self, a: &T, b: &T) -> Ordering {
        for key in &self.keys {
            let ordering = a.field_value(key.field).cmp(&b.field_value(key.field));
            let ordering = match key.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Sort a slice in place.
    pub fn sort<T: Queryable<Field = IssueField>>(&self, items: &mut [T]) {
        items.sort_by(|a, b| self.compare(a, b));
    }
}

impl fmt::Display for SortingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.keys.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join(", "))
    }
}
