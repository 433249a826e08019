//! Git subprocess client
//!
//! Every repository mutation goes through the `git` binary. The client is an
//! explicit value bound to one working tree, so tests can drive several
//! isolated repositories side by side.

mod guard;

pub use guard::CheckoutGuard;

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

/// Placeholder substituted for the GitHub token in logged command lines.
const TOKEN_PLACEHOLDER: &str = "<TOKEN>";

/// Captured output of a git invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit status (`-1` if the process could not be spawned or was killed)
    pub status: i32,
}

impl GitOutput {
    /// Whether the command exited with status 0
    pub const fn success(&self) -> bool {
        self.status == 0
    }
}

/// A git command that exited unsuccessfully
///
/// The command line is stored with the GitHub token already redacted.
#[derive(Debug, Clone, Error)]
pub struct GitCommandError {
    /// Redacted argv (without the leading `git`)
    pub args: Vec<String>,
    /// Exit status (`-1` if the process could not be spawned)
    pub status: i32,
    /// Redacted stderr
    pub stderr: String,
}

impl fmt::Display for GitCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "command failed: git {} (exit {})",
            self.args.join(" "),
            self.status
        )?;
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            write!(f, ": {stderr}")?;
        }
        Ok(())
    }
}

/// Remote repository the client pushes to and fetches from
#[derive(Debug, Clone)]
pub struct RemoteRepo {
    /// Fetch/push URL (may embed the token)
    pub url: String,
    /// Name of the repository's main branch (e.g. `main`)
    pub main_branch: String,
}

impl RemoteRepo {
    /// Authenticated HTTPS remote for `owner/name` on github.com
    pub fn github(owner: &str, name: &str, token: &str, main_branch: &str) -> Self {
        Self {
            url: format!("https://{token}@github.com/{owner}/{name}.git"),
            main_branch: main_branch.to_string(),
        }
    }
}

/// Git client bound to one working tree
#[derive(Debug, Clone)]
pub struct GitClient {
    base_dir: PathBuf,
    remote: RemoteRepo,
    token: Option<String>,
}

impl GitClient {
    /// Create a client operating in `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>, remote: RemoteRepo) -> Self {
        Self {
            base_dir: base_dir.into(),
            remote,
            token: None,
        }
    }

    /// Redact `token` from every logged or returned command line
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    /// Working tree the client operates in
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// URL used for fetches and pushes
    pub fn repo_git_url(&self) -> &str {
        &self.remote.url
    }

    /// Main branch of the remote repository
    pub fn main_branch(&self) -> &str {
        &self.remote.main_branch
    }

    /// Run a git command, failing on non-zero exit
    pub fn run(&self, args: &[&str]) -> std::result::Result<GitOutput, GitCommandError> {
        self.run_with_env(args, &[])
    }

    /// Run a git command with extra environment variables, failing on non-zero exit
    pub fn run_with_env(
        &self,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> std::result::Result<GitOutput, GitCommandError> {
        let output = self.execute(args, env);
        if output.success() {
            Ok(output)
        } else {
            Err(self.command_error(args, &output))
        }
    }

    /// Run a git command and report its status instead of failing
    pub fn run_graceful(&self, args: &[&str]) -> GitOutput {
        self.execute(args, &[])
    }

    /// Run a git command attached to the terminal, so the operator can
    /// interact with editors git opens.
    pub fn run_interactive(
        &self,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> std::result::Result<(), GitCommandError> {
        debug!(args = %self.redact(&args.join(" ")), "running interactive git command");
        let status = Command::new("git")
            .args(args)
            .envs(env.iter().copied())
            .current_dir(&self.base_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(self.command_error(
                args,
                &GitOutput {
                    status: status.code().unwrap_or(-1),
                    ..GitOutput::default()
                },
            )),
            Err(e) => Err(self.command_error(
                args,
                &GitOutput {
                    status: -1,
                    stderr: e.to_string(),
                    ..GitOutput::default()
                },
            )),
        }
    }

    fn execute(&self, args: &[&str], env: &[(&str, &str)]) -> GitOutput {
        debug!(args = %self.redact(&args.join(" ")), "running git command");
        let output = Command::new("git")
            .args(args)
            .envs(env.iter().copied())
            .current_dir(&self.base_dir)
            .stdin(Stdio::null())
            .output();

        match output {
            Ok(output) => {
                let result = GitOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    status: output.status.code().unwrap_or(-1),
                };
                if !result.success() {
                    debug!(
                        status = result.status,
                        stderr = %self.redact(result.stderr.trim()),
                        "git command exited unsuccessfully"
                    );
                }
                result
            }
            Err(e) => GitOutput {
                stdout: String::new(),
                stderr: format!("failed to run git: {e}"),
                status: -1,
            },
        }
    }

    fn command_error(&self, args: &[&str], output: &GitOutput) -> GitCommandError {
        GitCommandError {
            args: args.iter().map(|a| self.redact(a)).collect(),
            status: output.status,
            stderr: self.redact(&output.stderr),
        }
    }

    /// Replace the token in `text` with a placeholder
    pub fn redact(&self, text: &str) -> String {
        match &self.token {
            Some(token) => text.replace(token.as_str(), TOKEN_PLACEHOLDER),
            None => text.to_string(),
        }
    }

    // =========================================================================
    // Repository queries
    // =========================================================================

    /// Currently checked-out branch, or the commit SHA when HEAD is detached
    pub fn current_branch_or_revision(&self) -> std::result::Result<String, GitCommandError> {
        let branch = self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let branch = branch.stdout.trim();
        if branch == "HEAD" {
            return Ok(self.run(&["rev-parse", "HEAD"])?.stdout.trim().to_string());
        }
        Ok(branch.to_string())
    }

    /// Whether the working tree or index differs from HEAD
    ///
    /// The index is refreshed first so that touched-but-unmodified files are
    /// not reported.
    pub fn has_uncommitted_changes(&self) -> bool {
        self.run_graceful(&["update-index", "-q", "--refresh"]);
        !self.run_graceful(&["diff-index", "--quiet", "HEAD"]).success()
    }

    /// Whether the repository is a shallow clone
    pub fn is_shallow_repo(&self) -> std::result::Result<bool, GitCommandError> {
        let output = self.run(&["rev-parse", "--is-shallow-repository"])?;
        Ok(output.stdout.trim() == "true")
    }

    /// Whether `sha` is reachable from `branch`
    pub fn has_commit(&self, branch: &str, sha: &str) -> bool {
        self.run_graceful(&["merge-base", "--is-ancestor", sha, branch])
            .success()
    }

    /// Resolve a revision to its full SHA
    pub fn rev_parse(&self, revision: &str) -> std::result::Result<String, GitCommandError> {
        Ok(self.run(&["rev-parse", revision])?.stdout.trim().to_string())
    }

    /// Check out `branch_or_revision`
    ///
    /// With `clean_state`, any in-progress am, cherry-pick or rebase is
    /// aborted and the working tree is hard reset first.
    pub fn checkout(&self, branch_or_revision: &str, clean_state: bool) -> bool {
        if clean_state {
            self.run_graceful(&["am", "--abort"]);
            self.run_graceful(&["cherry-pick", "--abort"]);
            self.run_graceful(&["rebase", "--abort"]);
            self.run_graceful(&["reset", "--hard"]);
        }
        self.run_graceful(&["checkout", "-f", branch_or_revision])
            .success()
    }
}
