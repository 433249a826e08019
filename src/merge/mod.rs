//! Merge engine
//!
//! Three layers, leaves first:
//! 1. Validate - load the PR from GitHub and check it may be merged
//! 2. Strategy - land it in every target branch (API or autosquash)
//! 3. Task - sequence checks, prompts, strategy and cleanup

mod failure;
mod pull_request;
pub mod strategy;
mod task;

pub use failure::PullRequestFailure;
pub use pull_request::{Validation, load_and_validate_pull_request};
pub use strategy::{CherryPickOptions, MergeStrategy, StrategyState};
pub use task::{MergeResult, MergeStatus, MergeTaskFlags, PullRequestMergeTask};
