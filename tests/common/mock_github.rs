//! Mock GitHub client for testing

use async_trait::async_trait;
use pr_land::error::{Error, Result};
use pr_land::platform::GitHubApi;
use pr_land::types::{ApiMergeOptions, ApiMergeOutcome, PendingPr, PullRequestData, RepoConfig};
use std::collections::HashMap;
use std::sync::Mutex;

/// Call record for `merge_pr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePrCall {
    pub pr_number: u64,
    pub options: ApiMergeOptions,
}

/// Call record for `create_comment`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommentCall {
    pub pr_number: u64,
    pub body: String,
}

/// Hand-written `GitHubApi` mock
///
/// Features:
/// - Configurable responses per PR
/// - Call tracking for verification
/// - Error injection for failure path testing
pub struct MockGitHub {
    config: RepoConfig,
    scopes: Mutex<Vec<String>>,
    pr_responses: Mutex<HashMap<u64, PullRequestData>>,
    merge_responses: Mutex<HashMap<u64, ApiMergeOutcome>>,
    pending_prs: Mutex<Vec<PendingPr>>,
    // Call tracking
    get_pr_calls: Mutex<Vec<u64>>,
    merge_pr_calls: Mutex<Vec<MergePrCall>>,
    create_comment_calls: Mutex<Vec<CreateCommentCall>>,
    close_pr_calls: Mutex<Vec<u64>>,
    // Error injection
    error_on_scopes: Mutex<Option<u16>>,
    error_on_get_pr: Mutex<Option<String>>,
}

impl MockGitHub {
    /// Create a new mock with the given config and full token scopes
    pub fn with_config(config: RepoConfig) -> Self {
        Self {
            config,
            scopes: Mutex::new(vec!["repo".to_string(), "workflow".to_string()]),
            pr_responses: Mutex::new(HashMap::new()),
            merge_responses: Mutex::new(HashMap::new()),
            pending_prs: Mutex::new(Vec::new()),
            get_pr_calls: Mutex::new(Vec::new()),
            merge_pr_calls: Mutex::new(Vec::new()),
            create_comment_calls: Mutex::new(Vec::new()),
            close_pr_calls: Mutex::new(Vec::new()),
            error_on_scopes: Mutex::new(None),
            error_on_get_pr: Mutex::new(None),
        }
    }

    // === Error injection methods ===

    /// Make `oauth_scopes` fail with an HTTP status
    pub fn fail_scopes(&self, status: u16) {
        *self.error_on_scopes.lock().unwrap() = Some(status);
    }

    /// Make `get_pull_request` return an error
    pub fn fail_get_pr(&self, msg: &str) {
        *self.error_on_get_pr.lock().unwrap() = Some(msg.to_string());
    }

    // === Response setup ===

    /// Scopes reported for the token
    pub fn set_scopes(&self, scopes: &[&str]) {
        *self.scopes.lock().unwrap() = scopes.iter().map(|s| (*s).to_string()).collect();
    }

    /// Response for `get_pull_request`
    pub fn set_pr(&self, pr: PullRequestData) {
        self.pr_responses.lock().unwrap().insert(pr.number, pr);
    }

    /// Response for `merge_pr`; unset PRs merge with sha `merged_sha_<n>`
    pub fn set_merge_response(&self, pr_number: u64, outcome: ApiMergeOutcome) {
        self.merge_responses
            .lock()
            .unwrap()
            .insert(pr_number, outcome);
    }

    /// Response for `list_pending_prs`
    pub fn set_pending_prs(&self, prs: Vec<PendingPr>) {
        *self.pending_prs.lock().unwrap() = prs;
    }

    // === Call verification methods ===

    /// Get all PR numbers `get_pull_request` was called with
    pub fn get_pr_calls(&self) -> Vec<u64> {
        self.get_pr_calls.lock().unwrap().clone()
    }

    /// Get all `merge_pr` calls
    pub fn get_merge_pr_calls(&self) -> Vec<MergePrCall> {
        self.merge_pr_calls.lock().unwrap().clone()
    }

    /// Get all `create_comment` calls
    pub fn get_create_comment_calls(&self) -> Vec<CreateCommentCall> {
        self.create_comment_calls.lock().unwrap().clone()
    }

    /// Get all PR numbers `close_pr` was called with
    pub fn get_close_pr_calls(&self) -> Vec<u64> {
        self.close_pr_calls.lock().unwrap().clone()
    }

    /// Assert that `merge_pr` was called for a specific PR
    pub fn assert_merge_called(&self, pr_number: u64) {
        let calls = self.get_merge_pr_calls();
        assert!(
            calls.iter().any(|c| c.pr_number == pr_number),
            "Expected merge_pr({pr_number}) but got: {calls:?}"
        );
    }

    /// Assert that `merge_pr` was NOT called at all
    pub fn assert_merge_not_called(&self) {
        let calls = self.get_merge_pr_calls();
        assert!(
            calls.is_empty(),
            "Expected merge_pr NOT to be called but it was: {calls:?}"
        );
    }
}

#[async_trait]
impl GitHubApi for MockGitHub {
    fn config(&self) -> &RepoConfig {
        &self.config
    }

    async fn oauth_scopes(&self) -> Result<Vec<String>> {
        if let Some(status) = *self.error_on_scopes.lock().unwrap() {
            return Err(Error::GitHubStatus {
                status,
                message: "Bad credentials".to_string(),
            });
        }
        Ok(self.scopes.lock().unwrap().clone())
    }

    async fn get_pull_request(&self, pr_number: u64) -> Result<Option<PullRequestData>> {
        self.get_pr_calls.lock().unwrap().push(pr_number);

        // Check for injected error
        if let Some(msg) = self.error_on_get_pr.lock().unwrap().as_ref() {
            return Err(Error::GitHubApi(msg.clone()));
        }

        Ok(self.pr_responses.lock().unwrap().get(&pr_number).cloned())
    }

    async fn list_pr_commit_messages(&self, pr_number: u64) -> Result<Vec<String>> {
        Ok(self
            .pr_responses
            .lock()
            .unwrap()
            .get(&pr_number)
            .map(|pr| pr.commit_messages.clone())
            .unwrap_or_default())
    }

    async fn merge_pr(&self, pr_number: u64, options: &ApiMergeOptions) -> Result<ApiMergeOutcome> {
        self.merge_pr_calls.lock().unwrap().push(MergePrCall {
            pr_number,
            options: options.clone(),
        });

        Ok(self
            .merge_responses
            .lock()
            .unwrap()
            .get(&pr_number)
            .cloned()
            .unwrap_or_else(|| ApiMergeOutcome::Merged {
                sha: format!("merged_sha_{pr_number}"),
            }))
    }

    async fn create_comment(&self, pr_number: u64, body: &str) -> Result<()> {
        self.create_comment_calls
            .lock()
            .unwrap()
            .push(CreateCommentCall {
                pr_number,
                body: body.to_string(),
            });
        Ok(())
    }

    async fn close_pr(&self, pr_number: u64) -> Result<()> {
        self.close_pr_calls.lock().unwrap().push(pr_number);
        Ok(())
    }

    async fn list_pending_prs(&self) -> Result<Vec<PendingPr>> {
        Ok(self.pending_prs.lock().unwrap().clone())
    }
}
