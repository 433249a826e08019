//! Shared test utilities

#![allow(dead_code)]

mod mock_github;
mod temp_repo;

pub use mock_github::{CreateCommentCall, MergePrCall, MockGitHub};
pub use temp_repo::TempGitRepo;

use chrono::{DateTime, Utc};
use pr_land::config::Config;
use pr_land::error::Result;
use pr_land::prompt::Prompter;
use pr_land::types::{
    CiStatus, MergeableState, PendingPr, PrState, PullRequestData, RemoteRef, RepoConfig,
};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Labels every mergeable test PR carries
pub const READY_LABELS: [&str; 2] = ["action: merge", "cla: yes"];

/// Config used by most tests: static patch/minor labels plus a
/// github-target label for LTS-style PRs
pub const TEST_CONFIG: &str = r#"
[github]
owner = "acme"
name = "monorepo"

[merge]
caretaker_note_label = "merge: caretaker note"
commit_message_fixup_label = "merge: fix commit message"

[[merge.labels]]
pattern = "target: patch"
branches = ["main", "10.1.x"]

[[merge.labels]]
pattern = "target: minor"
branches = ["main"]

[[merge.labels]]
pattern = "target: rc"
branches = ["main", "10.1.x", "10.0.x"]

[[merge.labels]]
pattern = "target: lts"
branches = "github-target"
"#;

/// Repository coordinates matching [`TEST_CONFIG`]
pub fn repo_config() -> RepoConfig {
    RepoConfig {
        owner: "acme".to_string(),
        name: "monorepo".to_string(),
        main_branch: "main".to_string(),
        private: false,
    }
}

/// Parse [`TEST_CONFIG`] with `extra` keys added to the `[merge]` table
pub fn test_config(extra: &str) -> Config {
    Config::from_toml_str(&TEST_CONFIG.replace("[merge]\n", &format!("[merge]\n{extra}\n")))
        .unwrap()
}

/// Open, green PR targeting `base` with the ready labels plus `labels`
pub fn make_pr_data(number: u64, base: &str, labels: &[&str]) -> PullRequestData {
    PullRequestData {
        url: format!("https://github.com/acme/monorepo/pull/{number}"),
        number,
        title: format!("fix(core): change number {number}"),
        is_draft: false,
        state: PrState::Open,
        base_ref_name: base.to_string(),
        labels: READY_LABELS
            .iter()
            .chain(labels.iter())
            .map(|l| (*l).to_string())
            .collect(),
        commit_messages: vec![format!("fix(core): change number {number}")],
        commit_count: 1,
        ci_status: CiStatus::Success,
    }
}

/// Open PR from `head` into `base`, both in the repository at `repo_url`
pub fn make_pending_pr(
    number: u64,
    head: &str,
    base: &str,
    repo_url: &str,
    updated_at: DateTime<Utc>,
) -> PendingPr {
    PendingPr {
        number,
        title: format!("PR {number}"),
        updated_at,
        mergeable: MergeableState::Mergeable,
        head: RemoteRef {
            name: head.to_string(),
            repo_url: repo_url.to_string(),
        },
        base: RemoteRef {
            name: base.to_string(),
            repo_url: repo_url.to_string(),
        },
    }
}

/// Prompter answering from a script, recording every question
pub struct ScriptedPrompter {
    confirms: Mutex<VecDeque<bool>>,
    edit: Option<String>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// Answer confirmations with `answers` in order, then decline
    pub fn new(answers: &[bool]) -> Self {
        Self {
            confirms: Mutex::new(answers.iter().copied().collect()),
            edit: None,
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Confirm everything
    pub fn accepting() -> Self {
        Self::new(&[true; 8])
    }

    /// Replace edited text with `text`
    pub fn with_edit(mut self, text: &str) -> Self {
        self.edit = Some(text.to_string());
        self
    }

    /// Questions asked so far
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
        self.asked.lock().unwrap().push(message.to_string());
        Ok(self.confirms.lock().unwrap().pop_front().unwrap_or(false))
    }

    fn edit(&self, message: &str, _initial: &str) -> Result<Option<String>> {
        self.asked.lock().unwrap().push(message.to_string());
        Ok(self.edit.clone())
    }

    fn is_interactive(&self) -> bool {
        false
    }
}
