//! Merge strategies
//!
//! A strategy lands one validated pull request in its target branches. Both
//! variants share the same lifecycle:
//!
//! ```text
//! Initial --prepare--> Prepared --merge--> Merged | Failed --cleanup--> Cleaned
//! ```
//!
//! `prepare` fetches every target branch into a local temp branch and the
//! PR head into [`TEMP_PR_HEAD_BRANCH`]; `cleanup` deletes them again.

mod api;
mod autosquash;

pub use api::{
    ApiMergeStrategy, COMMIT_HEADER_SEPARATOR, default_squash_commit_message,
    split_squash_commit_message,
};
pub use autosquash::{AutosquashMergeStrategy, commit_message_filter};

use crate::config::MergeConfig;
use crate::error::{Error, Result};
use crate::git::GitClient;
use crate::merge::PullRequestFailure;
use crate::platform::GitHubApi;
use crate::prompt::Prompter;
use crate::types::PullRequest;
use tracing::{debug, info};

/// Local branch the PR head is fetched into
pub const TEMP_PR_HEAD_BRANCH: &str = "merge_pr_head";

/// Local temp branch holding upstream `branch`
pub fn temp_target_branch_name(branch: &str) -> String {
    format!("merge_pr_target_{}", branch.replace('/', "_"))
}

/// `merge_pr_head~<commit count>`: the commit the PR is based on
pub fn pull_request_base_revision(pr: &PullRequest) -> String {
    format!("{TEMP_PR_HEAD_BRANCH}~{}", pr.commit_count)
}

/// Range covering all commits of the PR
pub fn pull_request_revision_range(pr: &PullRequest) -> String {
    format!("{}..{TEMP_PR_HEAD_BRANCH}", pull_request_base_revision(pr))
}

/// Lifecycle state of a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    /// Nothing fetched yet
    Initial,
    /// Temp branches fetched
    Prepared,
    /// PR landed in every target branch
    Merged,
    /// Merge returned a failure or error
    Failed,
    /// Temp branches deleted
    Cleaned,
}

/// Options for [`MergeStrategy::cherry_pick_into_target_branches`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CherryPickOptions {
    /// Apply without committing and hard reset afterwards
    pub dry_run: bool,
    /// Record the original commit in each message (`-x`)
    pub link_to_original_commits: bool,
}

/// Git plumbing shared by both strategies
#[derive(Debug)]
pub(crate) struct StrategyCore<'a> {
    git: &'a GitClient,
    state: StrategyState,
}

impl<'a> StrategyCore<'a> {
    const fn new(git: &'a GitClient) -> Self {
        Self {
            git,
            state: StrategyState::Initial,
        }
    }

    pub(crate) const fn git(&self) -> &'a GitClient {
        self.git
    }

    fn prepare(&mut self, pr: &PullRequest) -> Result<()> {
        let head_refspec = format!("pull/{}/head:{TEMP_PR_HEAD_BRANCH}", pr.number);
        self.fetch_target_branches(&pr.target_branches, &[head_refspec])?;
        self.state = StrategyState::Prepared;
        Ok(())
    }

    /// Fetch `branches` (and `extra_refspecs`) in a single forced fetch
    pub(crate) fn fetch_target_branches(
        &self,
        branches: &[String],
        extra_refspecs: &[String],
    ) -> Result<()> {
        let refspecs: Vec<String> = branches
            .iter()
            .map(|b| format!("refs/heads/{b}:{}", temp_target_branch_name(b)))
            .chain(extra_refspecs.iter().cloned())
            .collect();
        debug!(?refspecs, "fetching target branches");

        let mut args = vec!["fetch", "-q", "-f", self.git.repo_git_url()];
        args.extend(refspecs.iter().map(String::as_str));
        self.git.run(&args)?;
        Ok(())
    }

    /// Cherry-pick `revision_range` into the temp branch of every target
    ///
    /// Returns the branches the cherry-pick failed for. A dry run leaves every
    /// ref and the working tree untouched.
    pub(crate) fn cherry_pick_into_target_branches(
        &self,
        revision_range: &str,
        target_branches: &[String],
        options: CherryPickOptions,
    ) -> Result<Vec<String>> {
        let mut args = vec!["cherry-pick", revision_range];
        if options.dry_run {
            args.push("--no-commit");
        }
        if options.link_to_original_commits {
            args.push("-x");
        }

        let mut failed = Vec::new();
        for branch in target_branches {
            self.git.run(&["checkout", &temp_target_branch_name(branch)])?;
            if !self.git.run_graceful(&args).success() {
                self.git.run_graceful(&["cherry-pick", "--abort"]);
                failed.push(branch.clone());
            }
            if options.dry_run {
                self.git.run(&["reset", "--hard", "HEAD"])?;
            }
        }
        debug!(revision_range, dry_run = options.dry_run, ?failed, "cherry-picked into target branches");
        Ok(failed)
    }

    /// Push the temp branches to their upstream branches in one push
    ///
    /// The push is not atomic: a rejected branch does not roll back the others.
    pub(crate) fn push_target_branches_upstream(&self, branches: &[String]) -> Result<()> {
        let refspecs: Vec<String> = branches
            .iter()
            .map(|b| format!("{}:refs/heads/{b}", temp_target_branch_name(b)))
            .collect();
        let mut args = vec!["push", self.git.repo_git_url()];
        args.extend(refspecs.iter().map(String::as_str));
        self.git.run(&args)?;
        info!(?branches, "pushed target branches");
        Ok(())
    }

    fn cleanup(&mut self, pr: &PullRequest) {
        for branch in &pr.target_branches {
            self.git
                .run_graceful(&["branch", "-D", &temp_target_branch_name(branch)]);
        }
        self.git.run_graceful(&["branch", "-D", TEMP_PR_HEAD_BRANCH]);
        // Backup ref left behind by filter-branch.
        self.git.run_graceful(&[
            "update-ref",
            "-d",
            &format!("refs/original/refs/heads/{TEMP_PR_HEAD_BRANCH}"),
        ]);
        self.state = StrategyState::Cleaned;
    }
}

/// The two ways of landing a pull request
pub enum MergeStrategy<'a> {
    /// Merge through the GitHub merge endpoint, cherry-pick into the rest
    Api(ApiMergeStrategy<'a>),
    /// Autosquash locally and push every target branch
    Autosquash(AutosquashMergeStrategy<'a>),
}

impl<'a> MergeStrategy<'a> {
    /// Pick the strategy `config` asks for
    ///
    /// A configured `github_api_merge` selects the API strategy, its absence
    /// the autosquash strategy.
    pub fn for_config(
        config: &'a MergeConfig,
        git: &'a GitClient,
        github: &'a dyn GitHubApi,
        prompter: &'a dyn Prompter,
    ) -> Self {
        let core = StrategyCore::new(git);
        match &config.github_api_merge {
            Some(api) => Self::Api(ApiMergeStrategy::new(core, api, github, prompter)),
            None => Self::Autosquash(AutosquashMergeStrategy::new(core, github, prompter)),
        }
    }

    /// Short name for logs
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Api(_) => "github-api",
            Self::Autosquash(_) => "autosquash",
        }
    }

    const fn core(&self) -> &StrategyCore<'a> {
        match self {
            Self::Api(s) => &s.core,
            Self::Autosquash(s) => &s.core,
        }
    }

    const fn core_mut(&mut self) -> &mut StrategyCore<'a> {
        match self {
            Self::Api(s) => &mut s.core,
            Self::Autosquash(s) => &mut s.core,
        }
    }

    /// Current lifecycle state
    pub const fn state(&self) -> StrategyState {
        self.core().state
    }

    /// Fetch the target branches and the PR head into temp branches
    pub fn prepare(&mut self, pr: &PullRequest) -> Result<()> {
        debug!(strategy = self.name(), pr_number = pr.number, "preparing merge");
        self.core_mut().prepare(pr)
    }

    /// Land `pr`; `Ok(None)` on success
    pub async fn merge(&mut self, pr: &PullRequest) -> Result<Option<PullRequestFailure>> {
        if self.state() != StrategyState::Prepared {
            return Err(Error::Internal(format!(
                "merge called in state {:?}",
                self.state()
            )));
        }
        debug!(strategy = self.name(), pr_number = pr.number, "merging");
        let outcome = match self {
            Self::Api(s) => s.merge(pr).await,
            Self::Autosquash(s) => s.merge(pr).await,
        };
        self.core_mut().state = match outcome {
            Ok(None) => StrategyState::Merged,
            _ => StrategyState::Failed,
        };
        outcome
    }

    /// Delete all temp branches; safe after a failed merge
    pub fn cleanup(&mut self, pr: &PullRequest) {
        debug!(strategy = self.name(), pr_number = pr.number, "cleaning up");
        self.core_mut().cleanup(pr);
    }

    /// Cherry-pick `revision_range` into the temp branches of `target_branches`
    pub fn cherry_pick_into_target_branches(
        &self,
        revision_range: &str,
        target_branches: &[String],
        options: CherryPickOptions,
    ) -> Result<Vec<String>> {
        self.core()
            .cherry_pick_into_target_branches(revision_range, target_branches, options)
    }
}
