//! Shared command context for CLI commands
//!
//! Extracts the setup shared by merge, discover-new-conflicts and
//! check-target-branches.

use pr_land::auth::get_github_auth;
use pr_land::config::{CONFIG_FILE_NAME, Config};
use pr_land::error::Result;
use pr_land::git::{GitClient, RemoteRepo};
use pr_land::platform::{GitHubApi, GitHubService};
use pr_land::prompt::{Prompter, prompter_for_environment};
use std::path::Path;
use tracing::debug;

/// Shared context for CLI commands that interact with git and GitHub
///
/// Setup order matters: the config is loaded before any token lookup, so a
/// broken config is reported without touching the network.
pub struct CommandContext {
    /// Validated configuration
    pub config: Config,
    /// Git client bound to the repository
    pub git: GitClient,
    /// GitHub client for the configured repository
    pub github: Box<dyn GitHubApi>,
    /// Operator prompts
    pub prompter: Box<dyn Prompter>,
}

impl CommandContext {
    /// Create a new command context for the repository at `repo_dir`
    ///
    /// `config_path` defaults to `.pr-land.toml` in `repo_dir`.
    pub async fn new(repo_dir: &Path, config_path: Option<&Path>) -> Result<Self> {
        let config_path =
            config_path.map_or_else(|| repo_dir.join(CONFIG_FILE_NAME), Path::to_path_buf);
        let config = Config::load(&config_path)?;

        let auth = get_github_auth().await?;
        debug!(source = ?auth.source, "found GitHub token");

        let remote = RemoteRepo::github(
            &config.github.owner,
            &config.github.name,
            &auth.token,
            &config.github.main_branch,
        );
        let git = GitClient::new(repo_dir, remote).with_token(auth.token.as_str());
        let github = GitHubService::new(&auth.token, config.github.clone())?;

        Ok(Self {
            config,
            git,
            github: Box::new(github),
            prompter: prompter_for_environment(),
        })
    }
}
