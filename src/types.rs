//! Core types for pr-land

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository coordinates on GitHub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Main (default) branch of the repository
    #[serde(default = "default_main_branch")]
    pub main_branch: String,
    /// Whether the repository is private
    #[serde(default)]
    pub private: bool,
}

fn default_main_branch() -> String {
    "main".to_string()
}

// =============================================================================
// Pull request data (as reported by GitHub)
// =============================================================================

/// PR state (open, closed, merged)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrState {
    /// PR is open and can be merged
    Open,
    /// PR was closed without merging
    Closed,
    /// PR was merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// Combined CI status of the latest commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CiStatus {
    /// All checks passed (or none configured)
    Success,
    /// Checks still running
    Pending,
    /// At least one check failed
    Failure,
}

/// Pull request as loaded from GitHub, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestData {
    /// Web URL of the PR
    pub url: String,
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Whether PR is a draft
    pub is_draft: bool,
    /// Current state of the PR
    pub state: PrState,
    /// Branch selected as base in the GitHub UI
    pub base_ref_name: String,
    /// Names of all labels applied to the PR
    pub labels: Vec<String>,
    /// Full commit messages, oldest first
    pub commit_messages: Vec<String>,
    /// Total number of commits in the PR
    pub commit_count: u64,
    /// CI status of the last commit
    pub ci_status: CiStatus,
}

/// A validated pull request, ready to be merged
///
/// Created fresh for every merge invocation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct PullRequest {
    /// Web URL of the PR
    pub url: String,
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Names of all labels applied to the PR
    pub labels: Vec<String>,
    /// Branches the PR lands in, in resolution order
    pub target_branches: Vec<String>,
    /// Branch selected as base in the GitHub UI
    pub github_target_branch: String,
    /// Number of commits in the PR
    pub commit_count: u64,
    /// Commit that must be part of the PR head, if configured
    pub required_base_sha: Option<String>,
    /// Whether the operator wants to edit the commit message before merging
    pub needs_commit_message_fixup: bool,
    /// Whether the PR carries a caretaker note
    pub has_caretaker_note: bool,
}

// =============================================================================
// Merging through the GitHub API
// =============================================================================

/// Merge strategy/method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    /// Squash all commits into one
    Squash,
    /// Create a merge commit
    Merge,
    /// Rebase commits onto base branch
    Rebase,
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Squash => write!(f, "squash"),
            Self::Merge => write!(f, "merge"),
            Self::Rebase => write!(f, "rebase"),
        }
    }
}

/// Parameters of a merge API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiMergeOptions {
    /// Merge method
    pub method: MergeMethod,
    /// Custom commit title (squash only)
    pub commit_title: Option<String>,
    /// Custom commit message (squash only)
    pub commit_message: Option<String>,
}

impl ApiMergeOptions {
    /// Options with no custom commit message
    pub const fn new(method: MergeMethod) -> Self {
        Self {
            method,
            commit_title: None,
            commit_message: None,
        }
    }
}

/// Outcome of a merge API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiMergeOutcome {
    /// PR merged; SHA of the commit now at the tip of the base branch
    Merged {
        /// Merge (or squash/rebase tip) commit SHA
        sha: String,
    },
    /// GitHub refused the merge because of conflicts (HTTP 405)
    NotMergeable,
    /// Token lacks permission (HTTP 403/404)
    PermissionDenied,
    /// Any other status
    Failed {
        /// HTTP status code
        status: u16,
    },
}

// =============================================================================
// Conflict discovery
// =============================================================================

/// GitHub's view of whether a PR merges cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeableState {
    /// Merges cleanly
    Mergeable,
    /// Has conflicts with its base
    Conflicting,
    /// Not computed yet
    Unknown,
}

/// A branch in some (possibly forked) repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRef {
    /// Branch name
    pub name: String,
    /// Clone URL of the repository holding the branch
    pub repo_url: String,
}

/// An open pull request considered by conflict discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPr {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// Last update
    pub updated_at: DateTime<Utc>,
    /// Mergeability as reported by GitHub
    pub mergeable: MergeableState,
    /// Head branch
    pub head: RemoteRef,
    /// Base branch
    pub base: RemoteRef,
}

/// A pull request that would newly conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictCandidate {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
}

impl From<&PendingPr> for ConflictCandidate {
    fn from(pr: &PendingPr) -> Self {
        Self {
            number: pr.number,
            title: pr.title.clone(),
        }
    }
}
