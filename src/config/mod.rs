//! Configuration management for `itr`.
//!
//! Configuration is layered, lowest precedence first:
//! - Workspace config (`.issues/config.yaml`)
//! - Environment variables (`ITR_PROJECT`, `ITR_ACTOR`, `ITR_PAGE_SIZE`)
//! - Command-line flags ([`CliOverrides`])

use std::fs;
use std::path::{Path, PathBuf};

use issue_core::model::validate_project_code;
use issue_core::paging::DEFAULT_PAGE_SIZE;
use issue_core::{InMemoryStore, PagingOptions, User};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

pub const ISSUES_DIR_NAME: &str = ".issues";
pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const DEFAULT_DATA_FILE: &str = "issues.jsonl";
pub const DEFAULT_PROJECT: &str = "APP";

pub const ENV_PROJECT: &str = "ITR_PROJECT";
pub const ENV_ACTOR: &str = "ITR_ACTOR";
pub const ENV_PAGE_SIZE: &str = "ITR_PAGE_SIZE";

const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Workspace configuration stored in `.issues/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project code used when a command does not name one (1-3 letters).
    pub project: String,
    /// Default reporter for new issues, as `Full Name <id>` or a bare id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Default page size for `list`.
    pub page_size: u32,
    /// Data file name, relative to `.issues/`.
    pub data_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: DEFAULT_PROJECT.to_string(),
            actor: None,
            page_size: DEFAULT_PAGE_SIZE,
            data_file: DEFAULT_DATA_FILE.to_string(),
        }
    }
}

/// Values supplied on the command line, applied last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub project: Option<String>,
    pub actor: Option<String>,
    pub page_size: Option<u32>,
}

impl Config {
    /// Creates a config for `project` with every other value defaulted.
    ///
    /// # Errors
    ///
    /// Returns a core `Validation` error if the project code is malformed.
    pub fn new(project: &str) -> Result<Self> {
        let mut config = Self {
            project: project.to_string(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the given `.issues/` directory.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Yaml` if the file exists but cannot be read.
    pub fn load(issues_dir: &Path) -> Result<Self> {
        let path = issues_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Saves configuration to the given `.issues/` directory.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Yaml` on write failure.
    pub fn save(&self, issues_dir: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(issues_dir.join(CONFIG_FILE_NAME), content)?;
        Ok(())
    }

    /// Apply `ITR_*` variables from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `ITR_PAGE_SIZE` is not a number.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `ITR_*` variables read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the page size is not a number.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(project) = lookup(ENV_PROJECT).filter(|v| !v.trim().is_empty()) {
            self.project = project;
        }
        if let Some(actor) = lookup(ENV_ACTOR).filter(|v| !v.trim().is_empty()) {
            self.actor = Some(actor);
        }
        if let Some(raw) = lookup(ENV_PAGE_SIZE).filter(|v| !v.trim().is_empty()) {
            self.page_size = raw
                .trim()
                .parse()
                .map_err(|_| AppError::config(format!("{ENV_PAGE_SIZE} must be a number, got '{raw}'")))?;
        }
        Ok(())
    }

    /// Apply command-line values.
    pub fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(project) = &overrides.project {
            self.project.clone_from(project);
        }
        if let Some(actor) = &overrides.actor {
            self.actor = Some(actor.clone());
        }
        if let Some(page_size) = overrides.page_size {
            self.page_size = page_size;
        }
    }

    /// Normalize and check every value.
    ///
    /// # Errors
    ///
    /// Returns a core `Validation` error for a bad project code or page size,
    /// and `Config` for a bad data file name.
    pub fn validate(&mut self) -> Result<()> {
        self.project = validate_project_code(&self.project)?;
        PagingOptions::first(self.page_size)?;
        let data_file = Path::new(&self.data_file);
        if self.data_file.trim().is_empty()
            || data_file.is_absolute()
            || data_file.components().count() != 1
        {
            return Err(AppError::config(format!(
                "data_file must be a plain file name, got '{}'",
                self.data_file
            )));
        }
        Ok(())
    }

    /// The configured actor as a [`User`].
    ///
    /// # Errors
    ///
    /// Returns a core `Validation` error if the actor string is malformed.
    pub fn actor_user(&self) -> Result<Option<User>> {
        self.actor
            .as_deref()
            .map(str::parse::<User>)
            .transpose()
            .map_err(AppError::from)
    }
}

/// Find `.issues/` by walking up from `start`.
///
/// # Errors
///
/// Returns `NotInitialized` if no ancestor contains one.
pub fn find_issues_dir_from(start: &Path) -> Result<PathBuf> {
    let mut current = dunce::canonicalize(start)?;
    loop {
        let candidate = current.join(ISSUES_DIR_NAME);
        if candidate.is_dir() {
            return Ok(candidate);
        }
        if !current.pop() {
            return Err(AppError::NotInitialized);
        }
    }
}

/// Find `.issues/` by walking up from the current directory.
///
/// # Errors
///
/// Returns `NotInitialized` if no ancestor contains one.
pub fn find_issues_dir() -> Result<PathBuf> {
    find_issues_dir_from(&std::env::current_dir()?)
}

/// A discovered workspace with its effective configuration.
#[derive(Debug, Clone)]
pub struct Workspace {
    issues_dir: PathBuf,
    config: Config,
}

impl Workspace {
    /// Discover the workspace above the current directory and layer config.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized`, or config loading and validation errors.
    pub fn discover(overrides: &CliOverrides) -> Result<Self> {
        Self::open(find_issues_dir()?, overrides)
    }

    /// Open a known `.issues/` directory and layer config.
    ///
    /// # Errors
    ///
    /// Returns config loading and validation errors.
    pub fn open(issues_dir: PathBuf, overrides: &CliOverrides) -> Result<Self> {
        let mut config = Config::load(&issues_dir)?;
        config.apply_env_overrides()?;
        config.apply_cli_overrides(overrides);
        config.validate()?;
        Ok(Self { issues_dir, config })
    }

    /// Create `.issues/` under `root`.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyInitialized` unless `force`, or I/O errors.
    pub fn init(root: &Path, config: Config, force: bool) -> Result<Self> {
        let issues_dir = root.join(ISSUES_DIR_NAME);
        let config_path = issues_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() && !force {
            return Err(AppError::AlreadyInitialized { path: issues_dir });
        }
        fs::create_dir_all(&issues_dir)?;
        let issues_dir = dunce::canonicalize(&issues_dir)?;
        config.save(&issues_dir)?;

        let data_path = issues_dir.join(&config.data_file);
        if !data_path.exists() {
            fs::write(&data_path, "")?;
        }

        let gitignore_path = issues_dir.join(GITIGNORE_FILE_NAME);
        if !gitignore_path.exists() {
            fs::write(gitignore_path, "# Temporary\n*.jsonl.tmp\n")?;
        }

        tracing::info!(path = %issues_dir.display(), project = %config.project, "initialized workspace");
        Ok(Self { issues_dir, config })
    }

    #[must_use]
    pub fn issues_dir(&self) -> &Path {
        &self.issues_dir
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        self.issues_dir.join(&self.config.data_file)
    }

    /// Load the issue store, or start an empty one if the data file is gone.
    ///
    /// # Errors
    ///
    /// Returns core parse or I/O errors.
    pub fn open_store(&self) -> Result<InMemoryStore> {
        let path = self.data_path();
        if path.exists() {
            Ok(InMemoryStore::open(&path)?)
        } else {
            Ok(InMemoryStore::with_path(path)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.project, "APP");
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.data_file, "issues.jsonl");
        assert!(config.actor.is_none());
    }

    #[test]
    fn test_new_normalizes_project() {
        let config = Config::new("ops").unwrap();
        assert_eq!(config.project, "OPS");
        assert!(Config::new("TOOLONG").is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new("WEB").unwrap();
        config.actor = Some("Ada Lovelace <ada>".to_string());
        config.page_size = 5;
        config.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "project: OPS\n").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.project, "OPS");
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_load_malformed_yaml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "page_size: [not, a, number]\n").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(AppError::Yaml(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides_from(lookup(&[
                (ENV_PROJECT, "ops"),
                (ENV_ACTOR, "bob"),
                (ENV_PAGE_SIZE, " 50 "),
            ]))
            .unwrap();
        config.validate().unwrap();
        assert_eq!(config.project, "OPS");
        assert_eq!(config.actor.as_deref(), Some("bob"));
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_env_page_size_must_be_numeric() {
        let mut config = Config::default();
        let err = config
            .apply_overrides_from(lookup(&[(ENV_PAGE_SIZE, "lots")]))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_cli_overrides_win_over_env() {
        let mut config = Config::default();
        config
            .apply_overrides_from(lookup(&[(ENV_PROJECT, "OPS")]))
            .unwrap();
        config.apply_cli_overrides(&CliOverrides {
            project: Some("WEB".to_string()),
            actor: None,
            page_size: Some(3),
        });
        assert_eq!(config.project, "WEB");
        assert_eq!(config.page_size, 3);
    }

    #[test]
    fn test_validate_rejects_bad_page_size() {
        let mut config = Config {
            page_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        config.page_size = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nested_data_file() {
        let mut config = Config {
            data_file: "../escape.jsonl".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_actor_user() {
        let config = Config {
            actor: Some("Ada Lovelace <ada>".to_string()),
            ..Config::default()
        };
        let user = config.actor_user().unwrap().unwrap();
        assert_eq!(user.user_id, "ada");
        assert!(Config::default().actor_user().unwrap().is_none());
    }

    #[test]
    fn test_find_issues_dir_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(ISSUES_DIR_NAME)).unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let found = find_issues_dir_from(&nested).unwrap();
        assert_eq!(found, dunce::canonicalize(dir.path()).unwrap().join(ISSUES_DIR_NAME));
    }

    #[test]
    fn test_find_issues_dir_not_initialized() {
        let dir = tempfile::tempdir().unwrap();
        // A temp dir could sit under a directory that has `.issues/`; only
        // assert when the walk really reaches the root.
        if let Err(err) = find_issues_dir_from(dir.path()) {
            assert!(matches!(err, AppError::NotInitialized));
        }
    }

    #[test]
    fn test_init_creates_layout_and_refuses_twice() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::init(dir.path(), Config::new("APP").unwrap(), false).unwrap();
        assert!(workspace.issues_dir().join(CONFIG_FILE_NAME).exists());
        assert!(workspace.data_path().exists());
        assert!(workspace.issues_dir().join(GITIGNORE_FILE_NAME).exists());

        let err = Workspace::init(dir.path(), Config::default(), false).unwrap_err();
        assert!(matches!(err, AppError::AlreadyInitialized { .. }));
        assert!(Workspace::init(dir.path(), Config::default(), true).is_ok());
    }

    #[test]
    fn test_open_store_on_fresh_workspace_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::init(dir.path(), Config::default(), false).unwrap();
        let store = workspace.open_store().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.path(), Some(workspace.data_path().as_path()));
    }
}
