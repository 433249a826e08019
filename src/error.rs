//! Error types for pr-land
//!
//! Expected merge outcomes (validation failures, merge conflicts) are not
//! errors; they are returned as [`PullRequestFailure`] values. This enum is
//! reserved for faults: failing git processes, unreachable APIs, broken
//! configuration.
//!
//! [`PullRequestFailure`]: crate::merge::PullRequestFailure

use crate::git::GitCommandError;
use thiserror::Error;

/// Errors that can occur in pr-land
#[derive(Debug, Error)]
pub enum Error {
    /// A git command exited unsuccessfully
    #[error(transparent)]
    GitCommand(#[from] GitCommandError),

    /// Generic GitHub API failure
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// GitHub answered with an unexpected HTTP status
    #[error("GitHub API request failed with status {status}: {message}")]
    GitHubStatus {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// No usable GitHub token
    #[error("authentication error: {0}")]
    Auth(String),

    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Interactive prompt could not be shown or read
    #[error("prompt error: {0}")]
    Prompt(String),

    /// npm registry lookup failed
    #[error("npm registry error: {0}")]
    Registry(String),

    /// The working tree has uncommitted changes
    #[error("local working repository not clean, please make sure there are no uncommitted changes")]
    DirtyWorkingDir,

    /// Pull request does not exist (or is not open)
    #[error("pull request #{0} was not found as a pending pull request")]
    PullRequestNotFound(u64),

    /// Internal invariant violated
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error was produced by GitHub rejecting our credentials.
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::GitHubStatus { status: 401, .. })
    }
}

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        Self::GitHubApi(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::GitHubStatus {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::GitHubApi(err.to_string()),
        }
    }
}

/// Result type alias for pr-land operations
pub type Result<T> = std::result::Result<T, Error>;
