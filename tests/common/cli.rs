use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// A throwaway directory to run `itr` in.
pub struct ItrWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl ItrWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self { temp_dir, root }
    }

    /// Workspace with `itr init` already run for `project`.
    pub fn initialized(project: &str) -> Self {
        let workspace = Self::new();
        let init = run_itr(&workspace, ["init", "--project", project], "init");
        assert!(init.status.success(), "init failed: {}", init.stderr);
        workspace
    }

    pub fn data_path(&self) -> PathBuf {
        self.root.join(".issues").join("issues.jsonl")
    }

    pub fn path(&self) -> &Path {
        &self.root
    }
}

/// Captured result of one `itr` invocation.
pub struct ItrRun {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ItrRun {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {}", self.stdout))
    }
}

/// Run `itr` in `workspace` with a clean environment.
pub fn run_itr<I, S>(workspace: &ItrWorkspace, args: I, label: &str) -> ItrRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_itr_in(&workspace.root, args, label)
}

/// Run `itr` in an arbitrary directory with a clean environment.
pub fn run_itr_in<I, S>(dir: &Path, args: I, label: &str) -> ItrRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = cargo_bin_cmd!("itr")
        .current_dir(dir)
        .env_remove("ITR_PROJECT")
        .env_remove("ITR_ACTOR")
        .env_remove("ITR_PAGE_SIZE")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("{label}: failed to spawn itr: {e}"));

    ItrRun {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

/// Create an issue and return its identifier.
pub fn create_issue(workspace: &ItrWorkspace, args: &[&str]) -> String {
    let mut full = vec!["create"];
    full.extend_from_slice(args);
    let run = run_itr(workspace, &full, "create");
    assert!(run.status.success(), "create failed: {}", run.stderr);
    run.stdout
        .split_whitespace()
        .nth(1)
        .map(|s| s.trim_end_matches(':').to_string())
        .unwrap_or_else(|| panic!("unexpected create output: {}", run.stdout))
}
