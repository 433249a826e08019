//! Expected reasons a pull request cannot be merged

use crate::targeting::TargetLabel;
use std::fmt;

/// Why a pull request could not be merged
///
/// Non-fatal failures can be overridden by re-running the merge with force.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestFailure {
    /// Human readable explanation
    pub message: String,
    /// Whether a forced re-run may get past this failure
    pub non_fatal: bool,
}

impl fmt::Display for PullRequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[allow(missing_docs)]
impl PullRequestFailure {
    /// A failure that cannot be forced past
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            non_fatal: false,
        }
    }

    /// A failure a forced re-run ignores
    pub fn non_fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            non_fatal: true,
        }
    }

    pub fn cla_unsigned() -> Self {
        Self::fatal("CLA has not been signed. Please make sure the PR author has signed the CLA.")
    }

    pub fn failing_ci_jobs() -> Self {
        Self::non_fatal("Failing CI jobs.")
    }

    pub fn pending_ci_jobs() -> Self {
        Self::non_fatal("Pending CI jobs.")
    }

    pub fn not_merge_ready() -> Self {
        Self::fatal("Not marked as merge ready.")
    }

    pub fn is_draft() -> Self {
        Self::fatal("Pull request is still a draft.")
    }

    pub fn is_closed() -> Self {
        Self::fatal("Pull request is already closed.")
    }

    pub fn is_merged() -> Self {
        Self::fatal("Pull request is already merged.")
    }

    pub fn not_found() -> Self {
        Self::fatal("Pull request could not be found upstream.")
    }

    pub fn mismatching_target_branch(allowed: &[String]) -> Self {
        Self::fatal(format!(
            "Pull request is set to wrong base branch. Please update the PR in the Github UI \
             to one of the following branches: {}.",
            allowed.join(", ")
        ))
    }

    pub fn unsatisfied_base_sha() -> Self {
        Self::fatal(
            "Pull request has not been rebased recently and could be bypassing CI checks. \
             Please rebase the PR.",
        )
    }

    pub fn merge_conflicts(failed_branches: &[String]) -> Self {
        Self::non_fatal(format!(
            "Could not merge pull request into the following branches due to merge conflicts: \
             {}. Please rebase the PR or update the target label.",
            failed_branches.join(", ")
        ))
    }

    pub fn unknown_merge_error() -> Self {
        Self::fatal("Unknown merge error occurred.")
    }

    pub fn unable_to_fixup_commit_message_squash_only() -> Self {
        Self::fatal(
            "Unable to fixup commit message of pull request. Commit message can only be \
             modified if the PR is merged using squash.",
        )
    }

    pub fn insufficient_permissions_to_merge() -> Self {
        Self::fatal(
            "Insufficient Github API permissions to merge pull request. Please ensure that your \
             auth token has write access.",
        )
    }

    pub fn has_breaking_changes(label: &TargetLabel) -> Self {
        Self::non_fatal(format!(
            "Cannot merge into branch for \"{}\" as the pull request has breaking changes. \
             Breaking changes can only be merged with the \"target: major\" label.",
            label.name()
        ))
    }

    pub fn has_deprecations(label: &TargetLabel) -> Self {
        Self::non_fatal(format!(
            "Cannot merge into branch for \"{}\" as the pull request contains deprecations. \
             Deprecations can only be merged with the \"target: minor\" or \"target: major\" \
             label.",
            label.name()
        ))
    }

    pub fn has_feature_commits(label: &TargetLabel) -> Self {
        Self::non_fatal(format!(
            "Cannot merge into branch for \"{}\" as the pull request has commits with the \
             \"feat\" type. New features can only be merged with the \"target: minor\" or \
             \"target: major\" label.",
            label.name()
        ))
    }

    pub fn missing_breaking_change_label() -> Self {
        Self::non_fatal(
            "Pull Request has at least one commit containing a breaking change note, but does \
             not have a breaking change label.",
        )
    }

    pub fn missing_breaking_change_commit() -> Self {
        Self::non_fatal(
            "Pull Request has a breaking change label, but does not contain any commits with \
             breaking change notes.",
        )
    }
}
