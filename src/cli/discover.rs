//! Discover-new-conflicts command

use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check, cross};
use anstream::println;
use chrono::{DateTime, Utc};
use pr_land::conflicts::{ConflictDiscovery, DiscoveryOutcome};
use pr_land::error::Result;

/// Run the discover-new-conflicts command
///
/// Returns whether no new conflicts were found.
pub async fn run_discover(
    ctx: &CommandContext,
    pr_number: u64,
    updated_after: DateTime<Utc>,
) -> Result<bool> {
    println!(
        "{}",
        format!("Checking open pull requests updated since {updated_after}...").muted()
    );

    let discovery = ConflictDiscovery::new(&ctx.git, ctx.github.as_ref());
    let progress = CliProgress::compact();
    let outcome = discovery
        .discover_new_conflicts(pr_number, updated_after, &progress)
        .await?;

    match outcome {
        DiscoveryOutcome::NoConflicts => {
            println!(
                "{} No new conflicting PRs found after {} merging",
                check(),
                format!("#{pr_number}").accent()
            );
            Ok(true)
        }
        DiscoveryOutcome::Conflicts(conflicts) => {
            println!(
                "{} {} PR(s) which conflict(s) after {} merges:",
                cross(),
                conflicts.len(),
                format!("#{pr_number}").accent()
            );
            for pr in &conflicts {
                println!("  - {}: {}", format!("#{}", pr.number).accent(), pr.title);
            }
            Ok(false)
        }
        DiscoveryOutcome::TargetHasConflicts => {
            println!(
                "{} {}",
                cross(),
                format!(
                    "The requested PR (#{pr_number}) currently has conflicts with its base."
                )
                .error()
            );
            Ok(false)
        }
    }
}
