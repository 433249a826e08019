//! Check-target-branches command - show where a PR would land

use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, cross};
use anstream::println;
use pr_land::error::Result;
use pr_land::targeting::{TargetingError, resolve_branches, resolve_label};

/// Run the check-target-branches command
///
/// Returns whether the target branches could be resolved.
pub async fn run_check_target_branches(ctx: &CommandContext, pr_number: u64) -> Result<bool> {
    let Some(pr) = ctx.github.get_pull_request(pr_number).await? else {
        println!(
            "{} {}",
            cross(),
            format!("Pull request #{pr_number} could not be found upstream.").error()
        );
        return Ok(false);
    };

    let resolved = match resolve_label(&ctx.config.merge.labels, &pr.labels) {
        Ok(label) => resolve_branches(label, &pr.base_ref_name).await,
        Err(e) => Err(e),
    };
    let branches = match resolved {
        Ok(branches) => branches,
        Err(TargetingError::Lookup(e)) => return Err(e),
        Err(e) => {
            println!("{} {}", cross(), e.to_string().error());
            return Ok(false);
        }
    };

    println!(
        "{}",
        format!("PR #{pr_number} will merge into:").emphasis()
    );
    for branch in &branches {
        println!(" - {}", branch.accent());
    }
    Ok(true)
}
