//! pr-land - land pull requests into release branches

mod cli;

use anstream::eprintln;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use cli::context::CommandContext;
use cli::merge::MergeOptions;
use cli::style::{Stylize, cross};
use pr_land::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code for an unusable configuration
const EXIT_CONFIG_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = "pr-land")]
#[command(about = "Land pull requests into release branches")]
#[command(version)]
struct Cli {
    /// Repository root
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Config file (default: <repo>/.pr-land.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a pull request into its target branches
    Merge {
        /// Pull request number
        pr_number: u64,

        /// Skip non-fatal checks (CI status, commit content policy)
        #[arg(long)]
        force: bool,

        /// Do not ask to confirm the target branches
        #[arg(long)]
        no_branch_prompt: bool,
    },

    /// List open pull requests that would conflict once a PR lands
    DiscoverNewConflicts {
        /// Pull request number
        pr_number: u64,

        /// Only consider PRs updated after this time (milliseconds since epoch)
        #[arg(value_parser = parse_epoch_millis)]
        updated_after: DateTime<Utc>,
    },

    /// Print the branches a pull request would merge into
    CheckTargetBranches {
        /// Pull request number
        pr_number: u64,
    },
}

fn parse_epoch_millis(raw: &str) -> Result<DateTime<Utc>, String> {
    let millis: i64 = raw
        .parse()
        .map_err(|e| format!("expected milliseconds since epoch: {e}"))?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| format!("timestamp out of range: {raw}"))
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("pr_land=debug")
    } else {
        EnvFilter::try_from_env("PR_LAND_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => report_error(&err),
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let ctx = CommandContext::new(&cli.repo, cli.config.as_deref()).await?;

    let succeeded = match cli.command {
        Commands::Merge {
            pr_number,
            force,
            no_branch_prompt,
        } => {
            cli::merge::run_merge(
                &ctx,
                pr_number,
                MergeOptions {
                    force,
                    branch_prompt: !no_branch_prompt,
                },
            )
            .await?
        }
        Commands::DiscoverNewConflicts {
            pr_number,
            updated_after,
        } => cli::discover::run_discover(&ctx, pr_number, updated_after).await?,
        Commands::CheckTargetBranches { pr_number } => {
            cli::check_target::run_check_target_branches(&ctx, pr_number).await?
        }
    };
    Ok(succeeded)
}

fn report_error(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<Error>() {
        Some(Error::Config(_)) => {
            eprintln!("{} {}", cross(), format!("{err}").error());
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
        Some(e) if e.is_unauthorized() => {
            eprintln!(
                "{} {}",
                cross(),
                "GitHub rejected the token: it is invalid or expired.".error()
            );
            eprintln!(
                "  {}",
                "Set a valid GITHUB_TOKEN or run 'gh auth login'.".muted()
            );
            ExitCode::FAILURE
        }
        _ => {
            eprintln!("{} {}", cross(), format!("{err:#}").error());
            ExitCode::FAILURE
        }
    }
}
