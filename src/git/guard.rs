//! Scoped restoration of the checked-out branch
//!
//! A [`CheckoutGuard`] records HEAD when created and checks it out again
//! when released or dropped. Because restoration lives in `Drop`, it runs on
//! early returns, `?` propagation, panics and dropped futures alike.

use super::GitClient;
use crate::error::Result;
use tracing::{debug, warn};

/// Restores the previously checked-out branch or revision on release
pub struct CheckoutGuard<'a> {
    git: &'a GitClient,
    previous: String,
    clean_state: bool,
    scratch_branches: Vec<String>,
    released: bool,
}

impl<'a> CheckoutGuard<'a> {
    /// Record the current branch or revision of `git`'s working tree
    pub fn record(git: &'a GitClient) -> Result<Self> {
        let previous = git.current_branch_or_revision()?;
        debug!(previous = %previous, "recorded checkout");
        Ok(Self {
            git,
            previous,
            clean_state: false,
            scratch_branches: Vec::new(),
            released: false,
        })
    }

    /// Abort in-progress operations and hard reset before restoring
    #[must_use]
    pub const fn with_clean_state(mut self) -> Self {
        self.clean_state = true;
        self
    }

    /// Delete `branch` after the checkout has been restored
    pub fn delete_on_release(&mut self, branch: impl Into<String>) {
        self.scratch_branches.push(branch.into());
    }

    /// Branch or revision that will be restored
    pub fn previous(&self) -> &str {
        &self.previous
    }

    /// Check out the recorded branch or revision again
    ///
    /// Safe to call several times. Returns whether the checkout succeeded.
    pub fn restore(&self) -> bool {
        let restored = self.git.checkout(&self.previous, self.clean_state);
        if !restored {
            warn!(previous = %self.previous, "failed to restore previous checkout");
        }
        restored
    }

    /// Restore the checkout and delete scratch branches
    pub fn release(mut self) -> bool {
        self.released = true;
        self.finish()
    }

    fn finish(&self) -> bool {
        let restored = self.restore();
        for branch in &self.scratch_branches {
            // Cannot delete a branch that is still checked out.
            if branch != &self.previous {
                self.git.run_graceful(&["branch", "-D", branch]);
            }
        }
        restored
    }
}

impl Drop for CheckoutGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::RemoteRepo;
    use std::path::Path;
    use std::process::Command;
    use tempfile::TempDir;

    fn run_git(dir: &Path, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(output.status.success(), "git {args:?} failed");
    }

    fn make_repo() -> (TempDir, GitClient) {
        let dir = TempDir::new().unwrap();
        run_git(dir.path(), &["init", "-q", "-b", "main"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["commit", "-q", "--allow-empty", "-m", "initial"]);
        run_git(dir.path(), &["branch", "scratch"]);
        let git = GitClient::new(
            dir.path(),
            RemoteRepo {
                url: "unused".to_string(),
                main_branch: "main".to_string(),
            },
        );
        (dir, git)
    }

    #[test]
    fn test_drop_restores_checkout() {
        let (_dir, git) = make_repo();
        {
            let _guard = CheckoutGuard::record(&git).unwrap();
            git.run(&["checkout", "-q", "scratch"]).unwrap();
            assert_eq!(git.current_branch_or_revision().unwrap(), "scratch");
        }
        assert_eq!(git.current_branch_or_revision().unwrap(), "main");
    }

    #[test]
    fn test_release_deletes_scratch_branches() {
        let (_dir, git) = make_repo();
        let mut guard = CheckoutGuard::record(&git).unwrap();
        guard.delete_on_release("scratch");
        git.run(&["checkout", "-q", "scratch"]).unwrap();

        assert!(guard.release());
        assert_eq!(git.current_branch_or_revision().unwrap(), "main");
        assert!(!git.run_graceful(&["rev-parse", "--verify", "scratch"]).success());
    }

    #[test]
    fn test_restore_after_early_return() {
        fn failing(git: &GitClient) -> Result<()> {
            let _guard = CheckoutGuard::record(git)?;
            git.run(&["checkout", "-q", "--detach"])?;
            git.run(&["checkout", "no-such-branch"])?;
            Ok(())
        }

        let (_dir, git) = make_repo();
        assert!(failing(&git).is_err());
        assert_eq!(git.current_branch_or_revision().unwrap(), "main");
    }
}
