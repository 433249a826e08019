//! pr-land - land pull requests into release branches
//!
//! A pull request's target label decides which branches it lands in. The
//! merge engine validates the PR against GitHub, lands it either through
//! the GitHub merge API or by autosquashing it locally, and cherry-picks it
//! into every other target branch. Conflict discovery predicts which open
//! PRs would stop rebasing cleanly once a PR lands.

pub mod auth;
pub mod commit_message;
pub mod config;
pub mod conflicts;
pub mod error;
pub mod git;
pub mod merge;
pub mod platform;
pub mod prompt;
pub mod targeting;
pub mod types;

pub use error::{Error, Result};
