use crate::cli::InitArgs;
use crate::config::{CliOverrides, Config, Workspace};
use crate::error::Result;
use crate::format::print_json;

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the workspace exists (without `--force`), the
/// configuration is invalid, or the directory cannot be created.
pub fn execute(args: &InitArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    let mut config = Config::default();
    config.apply_env_overrides()?;
    config.apply_cli_overrides(&CliOverrides {
        project: args.project.clone(),
        page_size: args.page_size,
        ..overrides.clone()
    });
    config.validate()?;

    let root = std::env::current_dir()?;
    let workspace = Workspace::init(&root, config, args.force)?;

    if json {
        print_json(&serde_json::json!({
            "path": workspace.issues_dir(),
            "config": workspace.config(),
        }))?;
    } else {
        println!(
            "Initialized issue workspace in {} (project {})",
            workspace.issues_dir().display(),
            workspace.config().project
        );
    }
    Ok(())
}
