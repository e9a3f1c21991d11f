use crate::config::{CliOverrides, Workspace};
use crate::error::{AppError, Result};
use crate::format::{CheckReport, print_json};
use crate::validation::check_file;

/// Execute the check command.
///
/// # Errors
///
/// Returns `CheckFailed` when the data file has problems, after printing them.
pub fn execute(json: bool, overrides: &CliOverrides) -> Result<()> {
    let workspace = Workspace::discover(overrides)?;
    let path = workspace.data_path();

    let report = if path.exists() {
        check_file(&path)?
    } else {
        CheckReport {
            checked: 0,
            ok: true,
            findings: Vec::new(),
        }
    };

    if json {
        print_json(&report)?;
    } else if report.ok {
        println!("OK: {} record(s) checked", report.checked);
    } else {
        for finding in &report.findings {
            println!("ERROR {} {}: {}", finding.subject, finding.field, finding.message);
        }
    }

    if report.ok {
        Ok(())
    } else {
        Err(AppError::CheckFailed {
            count: report.findings.len(),
        })
    }
}
