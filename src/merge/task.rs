//! Landing a single pull request end to end
//!
//! The task checks the local environment and token, validates the PR, asks
//! the operator to confirm and then runs the configured strategy. The
//! checkout is restored through a [`CheckoutGuard`] on every exit path.

use super::strategy::MergeStrategy;
use super::{PullRequestFailure, load_and_validate_pull_request};
use crate::config::MergeConfig;
use crate::error::{Error, Result};
use crate::git::{CheckoutGuard, GitClient};
use crate::platform::GitHubApi;
use crate::prompt::Prompter;
use crate::types::PullRequest;
use tracing::{debug, error, info, warn};

/// Terminal state of a merge attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    /// Landed in every target branch
    Success,
    /// Validation or merge returned a [`PullRequestFailure`]
    Failed,
    /// Uncommitted local changes
    DirtyWorkingDir,
    /// The local clone is shallow
    UnexpectedShallowRepo,
    /// A git command failed unexpectedly
    UnknownGitError,
    /// The token is missing required scopes
    GithubError,
    /// The operator declined a confirmation
    UserAborted,
}

/// Outcome of [`PullRequestMergeTask::merge`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Terminal state
    pub status: MergeStatus,
    /// Set when `status` is [`MergeStatus::Failed`]
    pub failure: Option<PullRequestFailure>,
    /// Extra detail for the operator
    pub message: Option<String>,
}

impl MergeResult {
    const fn status(status: MergeStatus) -> Self {
        Self {
            status,
            failure: None,
            message: None,
        }
    }

    fn with_message(status: MergeStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            failure: None,
            message: Some(message.into()),
        }
    }

    fn failed(failure: PullRequestFailure) -> Self {
        Self {
            status: MergeStatus::Failed,
            failure: Some(failure),
            message: None,
        }
    }

    /// Whether a forced re-run could get past this result
    pub fn can_force(&self) -> bool {
        self.status == MergeStatus::Failed && self.failure.as_ref().is_some_and(|f| f.non_fatal)
    }
}

/// Behaviour switches of a merge task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeTaskFlags {
    /// Ask before merging into the resolved branches
    pub branch_prompt: bool,
}

impl Default for MergeTaskFlags {
    fn default() -> Self {
        Self {
            branch_prompt: true,
        }
    }
}

/// Merges one pull request into its target branches
pub struct PullRequestMergeTask<'a> {
    config: &'a MergeConfig,
    git: &'a GitClient,
    github: &'a dyn GitHubApi,
    prompter: &'a dyn Prompter,
    flags: MergeTaskFlags,
}

impl<'a> PullRequestMergeTask<'a> {
    /// Create a task
    pub const fn new(
        config: &'a MergeConfig,
        git: &'a GitClient,
        github: &'a dyn GitHubApi,
        prompter: &'a dyn Prompter,
        flags: MergeTaskFlags,
    ) -> Self {
        Self {
            config,
            git,
            github,
            prompter,
            flags,
        }
    }

    /// Merge `pr_number`
    ///
    /// With `force`, non-fatal validation checks are skipped. Git command
    /// failures are reported as [`MergeStatus::UnknownGitError`]; other
    /// faults are returned as errors.
    pub async fn merge(&self, pr_number: u64, force: bool) -> Result<MergeResult> {
        if let Some(missing) = self.missing_token_scopes().await? {
            return Ok(MergeResult::with_message(
                MergeStatus::GithubError,
                format!(
                    "Insufficient token scopes to merge pull requests. Please update your \
                     token at https://github.com/settings/tokens and add the following \
                     scopes: {}",
                    missing.join(", ")
                ),
            ));
        }

        if self.git.has_uncommitted_changes() {
            return Ok(MergeResult::with_message(
                MergeStatus::DirtyWorkingDir,
                Error::DirtyWorkingDir.to_string(),
            ));
        }
        match self.git.is_shallow_repo() {
            Ok(false) => {}
            Ok(true) => {
                return Ok(MergeResult::with_message(
                    MergeStatus::UnexpectedShallowRepo,
                    "Unable to perform merge in a local repository that is configured as \
                     shallow. Please convert the repository to a complete one by syncing \
                     with upstream (git fetch --unshallow).",
                ));
            }
            Err(e) => return Ok(unknown_git_error(&Error::from(e))),
        }

        let pr = match load_and_validate_pull_request(self.config, self.github, pr_number, force)
            .await?
        {
            Ok(pr) => pr,
            Err(failure) => {
                info!(pr_number, failure = %failure, "pull request failed validation");
                return Ok(MergeResult::failed(failure));
            }
        };

        if self.flags.branch_prompt && !self.confirm_target_branches(&pr)? {
            return Ok(MergeResult::status(MergeStatus::UserAborted));
        }
        if pr.has_caretaker_note && !self.confirm_caretaker_note(&pr)? {
            return Ok(MergeResult::status(MergeStatus::UserAborted));
        }

        let mut strategy = MergeStrategy::for_config(self.config, self.git, self.github, self.prompter);
        debug!(pr_number, strategy = strategy.name(), "selected merge strategy");

        let guard = match CheckoutGuard::record(self.git) {
            Ok(guard) => guard.with_clean_state(),
            Err(e) => return Ok(unknown_git_error(&e)),
        };
        let outcome = run_strategy(&mut strategy, &pr).await;
        guard.release();
        strategy.cleanup(&pr);

        match outcome {
            Ok(None) => {
                info!(pr_number, branches = ?pr.target_branches, "pull request merged");
                Ok(MergeResult::status(MergeStatus::Success))
            }
            Ok(Some(failure)) => {
                info!(pr_number, failure = %failure, "pull request could not be merged");
                Ok(MergeResult::failed(failure))
            }
            Err(e @ Error::GitCommand(_)) => Ok(unknown_git_error(&e)),
            Err(e) => Err(e),
        }
    }

    /// Scopes the token lacks, `None` if it has all it needs
    async fn missing_token_scopes(&self) -> Result<Option<Vec<String>>> {
        let scopes = self.github.oauth_scopes().await?;
        if scopes.is_empty() {
            // Fine-grained tokens report no classic scopes.
            warn!("token reports no OAuth scopes, skipping scope check");
            return Ok(None);
        }

        let mut missing = Vec::new();
        let has = |scope: &str| scopes.iter().any(|s| s == scope);
        if !has("repo") {
            if self.github.config().private {
                missing.push("repo".to_string());
            } else if !has("public_repo") {
                missing.push("public_repo".to_string());
            }
        }
        if !has("workflow") {
            missing.push("workflow".to_string());
        }
        Ok((!missing.is_empty()).then_some(missing))
    }

    fn confirm_target_branches(&self, pr: &PullRequest) -> Result<bool> {
        let branches: String = pr
            .target_branches
            .iter()
            .map(|b| format!("\n - {b}"))
            .collect();
        self.prompter.confirm(
            &format!(
                "Pull request #{} will merge into:{branches}\nDo you want to proceed merging?",
                pr.number
            ),
            true,
        )
    }

    fn confirm_caretaker_note(&self, pr: &PullRequest) -> Result<bool> {
        self.prompter.confirm(
            &format!(
                "Pull request #{} has a caretaker note. Please make sure you read it \
                 before merging: {}\nDo you want to proceed merging?",
                pr.number, pr.url
            ),
            false,
        )
    }
}

async fn run_strategy(
    strategy: &mut MergeStrategy<'_>,
    pr: &PullRequest,
) -> Result<Option<PullRequestFailure>> {
    strategy.prepare(pr)?;
    strategy.merge(pr).await
}

fn unknown_git_error(err: &Error) -> MergeResult {
    error!(error = %err, "git command failed");
    MergeResult::with_message(MergeStatus::UnknownGitError, err.to_string())
}
