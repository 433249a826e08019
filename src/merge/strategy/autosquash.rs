//! Local autosquash merge

use super::{
    CherryPickOptions, StrategyCore, TEMP_PR_HEAD_BRANCH, pull_request_base_revision,
    temp_target_branch_name,
};
use crate::error::Result;
use crate::merge::PullRequestFailure;
use crate::platform::GitHubApi;
use crate::prompt::Prompter;
use crate::types::PullRequest;
use tracing::{debug, info};

/// `--msg-filter` appending ` (#N)` to the header and a `PR Close #N` trailer
pub fn commit_message_filter(pr_number: u64) -> String {
    format!("sed -e '1s/$/ (#{pr_number})/' && printf '\\nPR Close #{pr_number}\\n'")
}

/// Squashes fixup commits locally, rewrites the messages to reference the PR
/// and pushes the result into every target branch.
pub struct AutosquashMergeStrategy<'a> {
    pub(super) core: StrategyCore<'a>,
    github: &'a dyn GitHubApi,
    prompter: &'a dyn Prompter,
}

impl<'a> AutosquashMergeStrategy<'a> {
    pub(super) const fn new(
        core: StrategyCore<'a>,
        github: &'a dyn GitHubApi,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            core,
            github,
            prompter,
        }
    }

    pub(super) async fn merge(&self, pr: &PullRequest) -> Result<Option<PullRequestFailure>> {
        let git = self.core.git();

        if let Some(sha) = &pr.required_base_sha
            && !git.has_commit(TEMP_PR_HEAD_BRANCH, sha)
        {
            return Ok(Some(PullRequestFailure::unsatisfied_base_sha()));
        }

        // Pin the base: the rebase below moves merge_pr_head and may drop commits.
        let base_sha = git.rev_parse(&pull_request_base_revision(pr))?;
        let revision_range = format!("{base_sha}..{TEMP_PR_HEAD_BRANCH}");
        let branch_before_rebase = git.current_branch_or_revision()?;

        let rebase_args = [
            "rebase",
            "--interactive",
            "--autosquash",
            base_sha.as_str(),
            TEMP_PR_HEAD_BRANCH,
        ];
        if pr.needs_commit_message_fixup && self.prompter.is_interactive() {
            git.run_interactive(&rebase_args, &[])?;
        } else {
            git.run_with_env(&rebase_args, &[("GIT_SEQUENCE_EDITOR", "true")])?;
        }
        git.run(&["checkout", "-f", &branch_before_rebase])?;
        debug!(pr_number = pr.number, base = %base_sha, "autosquashed pull request");

        git.run_with_env(
            &[
                "filter-branch",
                "-f",
                "--msg-filter",
                &commit_message_filter(pr.number),
                &revision_range,
            ],
            &[("FILTER_BRANCH_SQUELCH_WARNING", "1")],
        )?;

        let failed = self.core.cherry_pick_into_target_branches(
            &revision_range,
            &pr.target_branches,
            CherryPickOptions::default(),
        )?;
        if !failed.is_empty() {
            return Ok(Some(PullRequestFailure::merge_conflicts(&failed)));
        }

        self.core.push_target_branches_upstream(&pr.target_branches)?;

        // GitHub only closes PRs automatically when they land in the default branch.
        if pr.github_target_branch != git.main_branch() {
            let closing_branch = if pr.target_branches.contains(&pr.github_target_branch) {
                &pr.github_target_branch
            } else {
                pr.target_branches
                    .first()
                    .unwrap_or(&pr.github_target_branch)
            };
            let sha = git.rev_parse(&temp_target_branch_name(closing_branch))?;
            self.github
                .create_comment(pr.number, &format!("Closed by commit {sha}"))
                .await?;
            self.github.close_pr(pr.number).await?;
            info!(pr_number = pr.number, sha = %sha, "closed pull request");
        }
        Ok(None)
    }
}
