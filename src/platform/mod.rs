//! GitHub API access
//!
//! The merge engine and conflict discovery only talk to GitHub through the
//! [`GitHubApi`] trait, so tests can substitute a recording mock.

mod github;

pub use github::GitHubService;

use crate::error::Result;
use crate::types::{ApiMergeOptions, ApiMergeOutcome, PendingPr, PullRequestData, RepoConfig};
use async_trait::async_trait;

/// Pull request operations needed to land PRs
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Repository this client talks to
    fn config(&self) -> &RepoConfig;

    /// OAuth scopes granted to the token
    async fn oauth_scopes(&self) -> Result<Vec<String>>;

    /// Load a pull request, `None` if it does not exist
    async fn get_pull_request(&self, pr_number: u64) -> Result<Option<PullRequestData>>;

    /// Full messages of every commit in the PR, oldest first
    async fn list_pr_commit_messages(&self, pr_number: u64) -> Result<Vec<String>>;

    /// Merge a PR through the merge endpoint
    ///
    /// Refusals GitHub reports through a status code are returned as
    /// [`ApiMergeOutcome`] values, not errors.
    async fn merge_pr(&self, pr_number: u64, options: &ApiMergeOptions) -> Result<ApiMergeOutcome>;

    /// Post a comment on a PR
    async fn create_comment(&self, pr_number: u64, body: &str) -> Result<()>;

    /// Close a PR without merging
    async fn close_pr(&self, pr_number: u64) -> Result<()>;

    /// All open pull requests of the repository
    async fn list_pending_prs(&self) -> Result<Vec<PendingPr>>;
}
