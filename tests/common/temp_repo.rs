//! Real git repositories for end-to-end tests
//!
//! A bare `upstream` repository stands in for GitHub; `work` is the local
//! clone the merge tool operates on. Pull request heads are published the
//! way GitHub does it, as `refs/pull/<n>/head` in upstream.

use pr_land::git::{GitClient, RemoteRepo};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Bare upstream plus a working clone
pub struct TempGitRepo {
    _dir: TempDir,
    upstream: PathBuf,
    work: PathBuf,
}

fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

impl TempGitRepo {
    /// Upstream with a single commit on `main`, and a clone of it
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let upstream = dir.path().join("upstream.git");
        let work = dir.path().join("work");
        fs::create_dir_all(&upstream).unwrap();
        fs::create_dir_all(&work).unwrap();

        run_git(&upstream, &["init", "-q", "--bare", "-b", "main"]);
        run_git(&work, &["init", "-q", "-b", "main"]);
        for (key, value) in [
            ("user.name", "Test User"),
            ("user.email", "test@example.com"),
            ("commit.gpgsign", "false"),
            ("core.editor", "true"),
        ] {
            run_git(&work, &["config", key, value]);
        }

        let repo = Self {
            _dir: dir,
            upstream,
            work,
        };
        repo.commit_file("README.md", "# monorepo\n", "build: initial commit");
        repo.push("main", "main");
        repo
    }

    /// Path of the working clone
    pub fn path(&self) -> &Path {
        &self.work
    }

    /// URL of the upstream repository
    pub fn upstream_url(&self) -> String {
        self.upstream.display().to_string()
    }

    /// Client operating on the working clone, pushing to upstream
    pub fn client(&self) -> GitClient {
        GitClient::new(
            &self.work,
            RemoteRepo {
                url: self.upstream_url(),
                main_branch: "main".to_string(),
            },
        )
    }

    /// Run git in the working clone
    pub fn git(&self, args: &[&str]) -> String {
        run_git(&self.work, args)
    }

    /// Run git in the upstream repository
    pub fn upstream_git(&self, args: &[&str]) -> String {
        run_git(&self.upstream, args)
    }

    /// Write `path` and commit it on the current branch; returns the SHA
    pub fn commit_file(&self, path: &str, contents: &str, message: &str) -> String {
        let full = self.work.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, contents).unwrap();
        self.git(&["add", path]);
        self.git(&["commit", "-q", "-m", message]);
        self.git(&["rev-parse", "HEAD"])
    }

    /// Create `name` from `from` and check it out
    pub fn branch_from(&self, name: &str, from: &str) {
        self.git(&["checkout", "-q", "-b", name, from]);
    }

    /// Check out an existing branch
    pub fn checkout(&self, name: &str) {
        self.git(&["checkout", "-q", name]);
    }

    /// Push local `branch` to upstream `refs/heads/<dest>`
    pub fn push(&self, branch: &str, dest: &str) {
        let url = self.upstream_url();
        self.git(&["push", "-q", "-f", &url, &format!("{branch}:refs/heads/{dest}")]);
    }

    /// Publish local `branch` as the head of pull request `number`
    pub fn create_pull_request_ref(&self, number: u64, branch: &str) {
        let url = self.upstream_url();
        self.git(&["push", "-q", "-f", &url, &format!("{branch}:refs/pull/{number}/head")]);
    }

    /// Subjects of the commits on upstream `branch`, newest first
    pub fn upstream_subjects(&self, branch: &str) -> Vec<String> {
        self.upstream_git(&["log", "--format=%s", branch])
            .lines()
            .map(ToString::to_string)
            .collect()
    }

    /// Full message of the tip commit of upstream `branch`
    pub fn upstream_tip_message(&self, branch: &str) -> String {
        self.upstream_git(&["log", "-1", "--format=%B", branch])
    }

    /// Tip SHA of upstream `branch`
    pub fn upstream_sha(&self, branch: &str) -> String {
        self.upstream_git(&["rev-parse", branch])
    }

    /// Local branches of the working clone
    pub fn local_branches(&self) -> Vec<String> {
        self.git(&["branch", "--format=%(refname:short)"])
            .lines()
            .map(ToString::to_string)
            .collect()
    }

    /// Currently checked-out branch of the working clone
    pub fn current_branch(&self) -> String {
        self.git(&["rev-parse", "--abbrev-ref", "HEAD"])
    }
}
