//! Concurrency-token hashing.

use sha2::{Digest, Sha256};

use crate::model::{ConcurrencyToken, Issue, IssueLink};

/// Derive the concurrency token for an issue.
///
/// Fields included (stable order with null separators): id, revision,
/// title, description, priority, type, state, epic, assignee, reporter,
/// start/stop time, outgoing and incoming links, comments.
///
/// Fields excluded: `created_at`, `updated_at`, the previous token.
#[must_use]
pub fn concurrency_token(issue: &Issue) -> ConcurrencyToken {
    let mut hasher = Sha256::new();

    let mut hash_field = |value: &str| {
        if value.contains('\0') {
            hasher.update(value.replace('\0', " ").as_bytes());
        } else {
            hasher.update(value.as_bytes());
        }
        hasher.update(b"\x00");
    };

    hash_field(&issue.id().to_string());
    hash_field(&issue.revision().to_string());
    hash_field(issue.title());
    hash_field(issue.description());
    hash_field(issue.priority().as_str());
    hash_field(issue.issue_type().as_str());
    hash_field(issue.state().as_str());
    hash_field(&issue.epic_id().map(ToString::to_string).unwrap_or_default());
    hash_field(&issue.assignee().map(|u| u.user_id.as_str()).unwrap_or_default());
    hash_field(&issue.reporter().map(|u| u.user_id.as_str()).unwrap_or_default());
    hash_field(&issue.start_time().map(|t| t.to_rfc3339()).unwrap_or_default());
    hash_field(&issue.stop_time().map(|t| t.to_rfc3339()).unwrap_or_default());
    for link in issue.outgoing_links().chain(issue.incoming_links()) {
        hash_field(&link_key(link));
    }
    for comment in issue.comments() {
        hash_field(&comment.id.to_string());
        hash_field(&comment.author.user_id);
        hash_field(&comment.content);
    }

    ConcurrencyToken::from_hex(format!("{:x}", hasher.finalize()))
}

fn link_key(link: &IssueLink) -> String {
    format!("{}>{}>{}", link.source_id, link.link_type, link.target_id)
}
