//! Merging through the GitHub merge endpoint

use super::{
    CherryPickOptions, StrategyCore, pull_request_revision_range, temp_target_branch_name,
};
use crate::commit_message::parse_commit_message;
use crate::config::ApiMergeConfig;
use crate::error::Result;
use crate::merge::PullRequestFailure;
use crate::platform::GitHubApi;
use crate::prompt::Prompter;
use crate::types::{ApiMergeOptions, ApiMergeOutcome, MergeMethod, PullRequest};
use tracing::{debug, info, warn};

/// Separates the header of a commit message from its body
pub const COMMIT_HEADER_SEPARATOR: &str = "\n\n";

/// Lands the GitHub target branch through the merge endpoint, then
/// cherry-picks the resulting commits into every other target branch.
pub struct ApiMergeStrategy<'a> {
    pub(super) core: StrategyCore<'a>,
    config: &'a ApiMergeConfig,
    github: &'a dyn GitHubApi,
    prompter: &'a dyn Prompter,
}

impl<'a> ApiMergeStrategy<'a> {
    pub(super) const fn new(
        core: StrategyCore<'a>,
        config: &'a ApiMergeConfig,
        github: &'a dyn GitHubApi,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            core,
            config,
            github,
            prompter,
        }
    }

    pub(super) async fn merge(&self, pr: &PullRequest) -> Result<Option<PullRequestFailure>> {
        let git = self.core.git();

        if !pr.target_branches.contains(&pr.github_target_branch) {
            return Ok(Some(PullRequestFailure::mismatching_target_branch(
                &pr.target_branches,
            )));
        }
        if let Some(sha) = &pr.required_base_sha
            && !git.has_commit(super::TEMP_PR_HEAD_BRANCH, sha)
        {
            return Ok(Some(PullRequestFailure::unsatisfied_base_sha()));
        }

        let method = self.config.method_for(&pr.labels);
        let cherry_pick_branches: Vec<String> = pr
            .target_branches
            .iter()
            .filter(|b| **b != pr.github_target_branch)
            .cloned()
            .collect();

        // Find conflicts in the other branches before anything lands upstream.
        let failed = self.core.cherry_pick_into_target_branches(
            &pull_request_revision_range(pr),
            &cherry_pick_branches,
            CherryPickOptions {
                dry_run: true,
                ..CherryPickOptions::default()
            },
        )?;
        if !failed.is_empty() {
            return Ok(Some(PullRequestFailure::merge_conflicts(&failed)));
        }

        let mut options = ApiMergeOptions::new(method);
        if pr.needs_commit_message_fixup {
            if method != MergeMethod::Squash {
                return Ok(Some(
                    PullRequestFailure::unable_to_fixup_commit_message_squash_only(),
                ));
            }
            self.prompt_commit_message_edit(pr, &mut options).await?;
        }

        let sha = match self.github.merge_pr(pr.number, &options).await? {
            ApiMergeOutcome::Merged { sha } => sha,
            ApiMergeOutcome::NotMergeable => {
                return Ok(Some(PullRequestFailure::merge_conflicts(&[pr
                    .github_target_branch
                    .clone()])));
            }
            ApiMergeOutcome::PermissionDenied => {
                return Ok(Some(PullRequestFailure::insufficient_permissions_to_merge()));
            }
            ApiMergeOutcome::Failed { status } => {
                warn!(status, pr_number = pr.number, "merge endpoint returned unexpected status");
                return Ok(Some(PullRequestFailure::unknown_merge_error()));
            }
        };
        info!(pr_number = pr.number, %method, sha = %sha, "merged through the GitHub API");

        if cherry_pick_branches.is_empty() {
            return Ok(None);
        }

        // The merged commits only exist upstream; refresh the primary target.
        self.core
            .fetch_target_branches(std::slice::from_ref(&pr.github_target_branch), &[])?;
        debug!(
            branch = %temp_target_branch_name(&pr.github_target_branch),
            "refetched GitHub target branch"
        );

        let landed_commits = if method == MergeMethod::Squash {
            1
        } else {
            pr.commit_count
        };
        let failed = self.core.cherry_pick_into_target_branches(
            &format!("{sha}~{landed_commits}..{sha}"),
            &cherry_pick_branches,
            CherryPickOptions {
                link_to_original_commits: true,
                ..CherryPickOptions::default()
            },
        )?;
        if !failed.is_empty() {
            return Ok(Some(PullRequestFailure::merge_conflicts(&failed)));
        }

        self.core.push_target_branches_upstream(&cherry_pick_branches)?;
        Ok(None)
    }

    async fn prompt_commit_message_edit(
        &self,
        pr: &PullRequest,
        options: &mut ApiMergeOptions,
    ) -> Result<()> {
        let commit_messages = self.github.list_pr_commit_messages(pr.number).await?;
        let default_message = default_squash_commit_message(&pr.title, &commit_messages);
        let message = self
            .prompter
            .edit(
                "Edit the squash commit message (header and body are separated by an empty line)",
                &default_message,
            )?
            .map_or(default_message, |edited| edited.trim_end().to_string());

        let (title, body) = split_squash_commit_message(&message, pr.number);
        options.commit_title = Some(title);
        options.commit_message = Some(body);
        Ok(())
    }
}

/// Default message offered when squashing a PR
///
/// A single commit contributes its body below the PR title; several commits
/// are listed as bullets.
pub fn default_squash_commit_message(title: &str, commit_messages: &[String]) -> String {
    let body = match commit_messages {
        [] => String::new(),
        [single] => parse_commit_message(single).body,
        many => many
            .iter()
            .map(|m| format!("* {}", m.trim_end()))
            .collect::<Vec<_>>()
            .join(COMMIT_HEADER_SEPARATOR),
    };
    format!("{title}{COMMIT_HEADER_SEPARATOR}{body}")
}

/// Split an edited squash message into the commit title and body
///
/// The title gets the PR number appended as ` (#N)`.
pub fn split_squash_commit_message(message: &str, pr_number: u64) -> (String, String) {
    let (title, body) = message
        .split_once(COMMIT_HEADER_SEPARATOR)
        .unwrap_or((message, ""));
    (format!("{} (#{pr_number})", title.trim()), body.to_string())
}
