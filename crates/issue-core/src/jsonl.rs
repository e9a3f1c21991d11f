//! JSONL file I/O for issues.
//!
//! Each line in the JSONL file is a complete Issue with its outgoing and
//! incoming links embedded.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::{IssueError, Result};
use crate::model::Issue;

/// Load issues from a JSONL file, skipping blank lines.
///
/// # Errors
///
/// Returns `FileNotFound` if the file is missing, `Io` if it cannot be read,
/// or `JsonlParse` if any line is invalid.
pub fn load(path: &Path) -> Result<Vec<Issue>> {
    let file = fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IssueError::FileNotFound(path.to_path_buf())
        } else {
            IssueError::Io(e)
        }
    })?;
    let reader = BufReader::new(file);

    let mut issues = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let issue: Issue = serde_json::from_str(trimmed).map_err(|e| IssueError::JsonlParse {
            line: line_num + 1,
            reason: e.to_string(),
        })?;
        issues.push(issue);
    }

    tracing::debug!(path = %path.display(), count = issues.len(), "loaded issues");
    Ok(issues)
}

/// Save issues to a JSONL file with atomic write (temp file + rename).
///
/// # Errors
///
/// Returns `Io` if the file cannot be written.
pub fn save<'a>(path: &Path, issues: impl IntoIterator<Item = &'a Issue>) -> Result<usize> {
    let tmp_path = path.with_extension("jsonl.tmp");
    let mut file = fs::File::create(&tmp_path)?;

    let mut count = 0;
    for issue in issues {
        let json = serde_json::to_string(issue)?;
        writeln!(file, "{json}")?;
        count += 1;
    }

    file.flush()?;
    drop(file);

    fs::rename(&tmp_path, path)?;

    tracing::debug!(path = %path.display(), count, "saved issues");
    Ok(count)
}
