//! Predicting which open pull requests a merge would break
//!
//! The target PR is rebased onto its base in a scratch branch, then every
//! relevant open PR is rebased onto that scratch branch. A failing rebase
//! means the PR would start conflicting once the target lands. All of this
//! happens behind a [`CheckoutGuard`], so the operator's checkout is back
//! in place afterwards.

use crate::error::{Error, Result};
use crate::git::{CheckoutGuard, GitClient};
use crate::platform::GitHubApi;
use crate::types::{ConflictCandidate, MergeableState, PendingPr};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Scratch branch holding the target PR rebased onto its base
pub const TEMP_WORKING_BRANCH: &str = "__PrLandBaseAfterChange__";

/// Result of a discovery run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// No candidate would conflict
    NoConflicts,
    /// These candidates would conflict, in evaluation order
    Conflicts(Vec<ConflictCandidate>),
    /// The target PR does not rebase cleanly onto its own base
    TargetHasConflicts,
}

/// Progress reporting for discovery runs
pub trait DiscoveryProgress: Send + Sync {
    /// Evaluation of `total` candidates starts
    fn on_start(&self, total: usize);

    /// `candidate` is being evaluated
    fn on_candidate(&self, candidate: &ConflictCandidate);

    /// All candidates evaluated
    fn on_finish(&self);
}

/// Discards progress updates
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl DiscoveryProgress for NoopProgress {
    fn on_start(&self, _total: usize) {}
    fn on_candidate(&self, _candidate: &ConflictCandidate) {}
    fn on_finish(&self) {}
}

/// Open PRs worth checking against `target`
///
/// Same base branch, not already conflicting, updated at or after
/// `updated_after`, and not the target itself.
pub fn select_candidates<'a>(
    all: &'a [PendingPr],
    target: &PendingPr,
    updated_after: DateTime<Utc>,
) -> Vec<&'a PendingPr> {
    all.iter()
        .filter(|pr| pr.number != target.number)
        .filter(|pr| pr.base.name == target.base.name)
        .filter(|pr| pr.mergeable != MergeableState::Conflicting)
        .filter(|pr| pr.updated_at >= updated_after)
        .collect()
}

/// Simulates landing a PR and rebasing other open PRs onto it
pub struct ConflictDiscovery<'a> {
    git: &'a GitClient,
    github: &'a dyn GitHubApi,
}

impl<'a> ConflictDiscovery<'a> {
    /// Create a discovery bound to a working tree and GitHub client
    pub const fn new(git: &'a GitClient, github: &'a dyn GitHubApi) -> Self {
        Self { git, github }
    }

    /// Find open PRs that would newly conflict once `pr_number` lands
    pub async fn discover_new_conflicts(
        &self,
        pr_number: u64,
        updated_after: DateTime<Utc>,
        progress: &dyn DiscoveryProgress,
    ) -> Result<DiscoveryOutcome> {
        if self.git.has_uncommitted_changes() {
            return Err(Error::DirtyWorkingDir);
        }

        let all = self.github.list_pending_prs().await?;
        let target = all
            .iter()
            .find(|pr| pr.number == pr_number)
            .ok_or(Error::PullRequestNotFound(pr_number))?;
        let candidates = select_candidates(&all, target, updated_after);
        info!(
            pr_number,
            pending = all.len(),
            candidates = candidates.len(),
            "discovering new conflicts"
        );

        let mut guard = CheckoutGuard::record(self.git)?.with_clean_state();
        guard.delete_on_release(TEMP_WORKING_BRANCH);

        self.git
            .run(&["fetch", "-q", &target.head.repo_url, &target.head.name])?;
        self.git
            .run(&["checkout", "-q", "-B", TEMP_WORKING_BRANCH, "FETCH_HEAD"])?;
        self.git
            .run(&["fetch", "-q", &target.base.repo_url, &target.base.name])?;
        if !self.git.run_graceful(&["rebase", "FETCH_HEAD"]).success() {
            info!(pr_number, "target pull request has conflicts with its base");
            guard.release();
            return Ok(DiscoveryOutcome::TargetHasConflicts);
        }

        progress.on_start(candidates.len());
        let mut conflicts = Vec::new();
        for pr in candidates {
            let candidate = ConflictCandidate::from(pr);
            progress.on_candidate(&candidate);

            self.git
                .run(&["fetch", "-q", &pr.head.repo_url, &pr.head.name])?;
            self.git.run(&["checkout", "-q", "--detach", "FETCH_HEAD"])?;
            let rebased = self
                .git
                .run_graceful(&["rebase", TEMP_WORKING_BRANCH])
                .success();
            self.git.run_graceful(&["rebase", "--abort"]);

            debug!(candidate = pr.number, conflicting = !rebased, "evaluated candidate");
            if !rebased {
                conflicts.push(candidate);
            }
        }
        progress.on_finish();
        guard.release();

        if conflicts.is_empty() {
            Ok(DiscoveryOutcome::NoConflicts)
        } else {
            Ok(DiscoveryOutcome::Conflicts(conflicts))
        }
    }
}
