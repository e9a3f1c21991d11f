//! Validation helpers for `itr`.
//!
//! These routines check records as they sit in the data file and return
//! structured findings without mutating anything. Single-record rules come
//! from the aggregate itself; cross-record rules (dangling links, link
//! symmetry, epic references) live here.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use issue_core::{Issue, IssueIdentifier, IssueType, ValidationError};

use crate::error::Result;
use crate::format::{CheckFinding, CheckReport};

/// Validates a single issue record.
pub struct IssueValidator;

impl IssueValidator {
    /// Validate an issue and return all validation errors found.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any validation rules are violated.
    pub fn validate(issue: &Issue) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = match issue.check_invariants() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };

        if issue.updated_at() < issue.created_at() {
            errors.push(ValidationError::new(
                "updatedAt",
                "cannot be before createdAt",
            ));
        }

        if let Some(assignee) = issue.assignee() {
            if assignee.user_id.trim().is_empty() {
                errors.push(ValidationError::new("assignee", "user id cannot be empty"));
            }
        }

        if let Some(reporter) = issue.reporter() {
            if reporter.user_id.trim().is_empty() {
                errors.push(ValidationError::new("reporter", "user id cannot be empty"));
            }
        }

        for comment in issue.comments() {
            if comment.author.user_id.trim().is_empty() {
                errors.push(ValidationError::new(
                    "comments",
                    format!("comment {}: author id cannot be empty", comment.id),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Validates rules that span several records.
pub struct CollectionValidator;

impl CollectionValidator {
    /// Check every record against every other, collecting all findings.
    #[must_use]
    pub fn validate(issues: &[Issue]) -> Vec<CheckFinding> {
        let mut findings = Vec::new();
        let mut by_id: HashMap<&IssueIdentifier, &Issue> = HashMap::new();

        for issue in issues {
            if by_id.insert(issue.id(), issue).is_some() {
                findings.push(finding(issue.id(), "id", "duplicate identifier"));
            }
        }

        for issue in issues {
            if let Err(errors) = IssueValidator::validate(issue) {
                findings.extend(
                    errors
                        .into_iter()
                        .map(|e| finding(issue.id(), &e.field, &e.message)),
                );
            }

            for link in issue.outgoing_links() {
                match by_id.get(&link.target_id) {
                    None => findings.push(finding(
                        issue.id(),
                        "outgoing",
                        &format!("{} link points at missing issue {}", link.link_type, link.target_id),
                    )),
                    Some(target) if !target.incoming_links().any(|l| l == link) => {
                        findings.push(finding(
                            issue.id(),
                            "outgoing",
                            &format!(
                                "{} link to {} is not recorded on the target",
                                link.link_type, link.target_id
                            ),
                        ));
                    }
                    Some(_) => {}
                }
            }

            for link in issue.incoming_links() {
                match by_id.get(&link.source_id) {
                    None => findings.push(finding(
                        issue.id(),
                        "incoming",
                        &format!("{} link comes from missing issue {}", link.link_type, link.source_id),
                    )),
                    Some(source) if !source.outgoing_links().any(|l| l == link) => {
                        findings.push(finding(
                            issue.id(),
                            "incoming",
                            &format!(
                                "{} link from {} is not recorded on the source",
                                link.link_type, link.source_id
                            ),
                        ));
                    }
                    Some(_) => {}
                }
            }

            if let Some(epic_id) = issue.epic_id() {
                match by_id.get(epic_id) {
                    None => findings.push(finding(
                        issue.id(),
                        "epicId",
                        &format!("epic {epic_id} does not exist"),
                    )),
                    Some(epic) if epic.issue_type() != IssueType::Epic => {
                        findings.push(finding(
                            issue.id(),
                            "epicId",
                            &format!("{epic_id} is a {}, not an epic", epic.issue_type()),
                        ));
                    }
                    Some(_) => {}
                }
            }
        }

        findings
    }
}

fn finding(subject: &IssueIdentifier, field: &str, message: &str) -> CheckFinding {
    CheckFinding {
        subject: subject.to_string(),
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Parse and validate every record in a JSONL data file.
///
/// Unparseable lines are reported as findings instead of aborting, so one
/// bad record does not hide problems in the rest of the file.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read.
pub fn check_file(path: &Path) -> Result<CheckReport> {
    let content = fs::read_to_string(path)?;
    let mut findings = Vec::new();
    let mut issues = Vec::new();
    let mut checked = 0;

    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        checked += 1;
        match serde_json::from_str::<Issue>(trimmed) {
            Ok(issue) => issues.push(issue),
            Err(err) => findings.push(CheckFinding {
                subject: format!("line {}", index + 1),
                field: "record".to_string(),
                message: err.to_string(),
            }),
        }
    }

    findings.extend(CollectionValidator::validate(&issues));
    tracing::debug!(
        path = %path.display(),
        records = checked,
        findings = findings.len(),
        "checked data file"
    );

    Ok(CheckReport {
        checked,
        ok: findings.is_empty(),
        findings,
    })
}
