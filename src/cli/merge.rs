//! Merge command - land a pull request in its target branches

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check, cross};
use anstream::println;
use pr_land::error::Result;
use pr_land::merge::{MergeResult, MergeStatus, MergeTaskFlags, PullRequestMergeTask};

/// Options for the merge command
#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    /// Skip non-fatal validation checks
    pub force: bool,
    /// Confirm target branches before merging
    pub branch_prompt: bool,
}

/// Run the merge command
///
/// Returns whether the pull request was merged. A non-fatal failure offers
/// one forced retry.
pub async fn run_merge(ctx: &CommandContext, pr_number: u64, options: MergeOptions) -> Result<bool> {
    let task = PullRequestMergeTask::new(
        &ctx.config.merge,
        &ctx.git,
        ctx.github.as_ref(),
        ctx.prompter.as_ref(),
        MergeTaskFlags {
            branch_prompt: options.branch_prompt,
        },
    );

    println!(
        "{} {}",
        "Merging".emphasis(),
        format!("pull request #{pr_number}...").accent()
    );
    let mut result = task.merge(pr_number, options.force).await?;

    if !options.force && result.can_force() {
        report_result(pr_number, &result);
        if ctx
            .prompter
            .confirm("Do you want to forcibly proceed with merging?", false)?
        {
            result = task.merge(pr_number, true).await?;
        } else {
            return Ok(false);
        }
    }

    report_result(pr_number, &result);
    Ok(result.status == MergeStatus::Success)
}

fn report_result(pr_number: u64, result: &MergeResult) {
    match result.status {
        MergeStatus::Success => {
            println!(
                "{} Successfully merged the pull request: {}",
                check(),
                format!("#{pr_number}").accent()
            );
        }
        MergeStatus::Failed => {
            println!(
                "{} Could not merge the specified pull request.",
                cross()
            );
            if let Some(failure) = &result.failure {
                println!("  {}", failure.message.error());
                if failure.non_fatal {
                    println!(
                        "  {}",
                        "The merge can be forced by re-running with --force.".muted()
                    );
                }
            }
        }
        MergeStatus::UserAborted => {
            println!(
                "{}",
                format!("Merge of pull request has been aborted manually: #{pr_number}").warn()
            );
        }
        MergeStatus::DirtyWorkingDir
        | MergeStatus::UnexpectedShallowRepo
        | MergeStatus::UnknownGitError
        | MergeStatus::GithubError => {
            let heading = match result.status {
                MergeStatus::DirtyWorkingDir => "Local working repository is not clean.",
                MergeStatus::UnexpectedShallowRepo => "Local repository is a shallow clone.",
                MergeStatus::UnknownGitError => "An unknown git error has been thrown.",
                _ => "GitHub token is missing required scopes.",
            };
            println!("{} {}", cross(), heading.error());
            if let Some(message) = &result.message {
                println!("  {}", message.muted());
            }
        }
    }
}
