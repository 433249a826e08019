//! GitHub service implementation
//!
//! GraphQL queries and comments go through octocrab. REST endpoints whose
//! status code carries meaning (merge, close, OAuth scopes) use raw reqwest
//! requests so the status is available before any error conversion.

use crate::error::{Error, Result};
use crate::platform::GitHubApi;
use crate::types::{
    ApiMergeOptions, ApiMergeOutcome, CiStatus, MergeMethod, MergeableState, PendingPr, PrState,
    PullRequestData, RemoteRef, RepoConfig,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const PAGE_SIZE: usize = 100;

const PULL_REQUEST_QUERY: &str = r"
    query PullRequest($owner: String!, $name: String!, $number: Int!) {
        repository(owner: $owner, name: $name) {
            pullRequest(number: $number) {
                url
                number
                title
                isDraft
                state
                baseRefName
                labels(first: 100) { nodes { name } }
                commits(last: 100) {
                    totalCount
                    nodes { commit { message statusCheckRollup { state } } }
                }
            }
        }
    }
";

const PENDING_PRS_QUERY: &str = r"
    query PendingPullRequests($owner: String!, $name: String!, $after: String) {
        repository(owner: $owner, name: $name) {
            pullRequests(first: 100, after: $after, states: OPEN) {
                pageInfo { hasNextPage endCursor }
                nodes {
                    number
                    title
                    updatedAt
                    mergeable
                    headRef { name repository { url } }
                    baseRef { name repository { url } }
                }
            }
        }
    }
";

// GraphQL response types

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

#[derive(Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Deserialize)]
struct RepositoryData<T> {
    repository: Option<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestRepository {
    pull_request: Option<GraphQlPullRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlPullRequest {
    url: String,
    number: u64,
    title: String,
    is_draft: bool,
    state: String,
    base_ref_name: String,
    labels: Nodes<LabelNode>,
    commits: CommitConnection,
}

#[derive(Deserialize)]
struct LabelNode {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitConnection {
    total_count: u64,
    nodes: Vec<CommitNode>,
}

#[derive(Deserialize)]
struct CommitNode {
    commit: CommitInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitInfo {
    message: String,
    status_check_rollup: Option<StatusRollup>,
}

#[derive(Deserialize)]
struct StatusRollup {
    state: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingRepository {
    pull_requests: PendingConnection,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingConnection {
    page_info: PageInfo,
    nodes: Vec<GraphQlPendingPr>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlPendingPr {
    number: u64,
    title: String,
    updated_at: DateTime<Utc>,
    mergeable: MergeableState,
    head_ref: Option<GraphQlRef>,
    base_ref: Option<GraphQlRef>,
}

#[derive(Deserialize)]
struct GraphQlRef {
    name: String,
    repository: GraphQlRefRepository,
}

#[derive(Deserialize)]
struct GraphQlRefRepository {
    url: String,
}

impl From<GraphQlRef> for RemoteRef {
    fn from(r: GraphQlRef) -> Self {
        Self {
            name: r.name,
            repo_url: r.repository.url,
        }
    }
}

impl From<GraphQlPullRequest> for PullRequestData {
    fn from(pr: GraphQlPullRequest) -> Self {
        let state = match pr.state.as_str() {
            "OPEN" => PrState::Open,
            "MERGED" => PrState::Merged,
            _ => PrState::Closed,
        };
        let ci_status = pr
            .commits
            .nodes
            .last()
            .and_then(|n| n.commit.status_check_rollup.as_ref())
            .map_or(CiStatus::Success, |rollup| match rollup.state.as_str() {
                "FAILURE" | "ERROR" => CiStatus::Failure,
                "PENDING" | "EXPECTED" => CiStatus::Pending,
                _ => CiStatus::Success,
            });
        Self {
            url: pr.url,
            number: pr.number,
            title: pr.title,
            is_draft: pr.is_draft,
            state,
            base_ref_name: pr.base_ref_name,
            labels: pr.labels.nodes.into_iter().map(|l| l.name).collect(),
            commit_count: pr.commits.total_count,
            commit_messages: pr.commits.nodes.into_iter().map(|n| n.commit.message).collect(),
            ci_status,
        }
    }
}

// REST request/response types

#[derive(Serialize)]
struct MergeRequest<'a> {
    merge_method: MergeMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit_title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit_message: Option<&'a str>,
}

#[derive(Deserialize)]
struct MergeResponse {
    sha: String,
}

#[derive(Deserialize)]
struct RestCommit {
    commit: RestCommitInfo,
}

#[derive(Deserialize)]
struct RestCommitInfo {
    message: String,
}

/// GitHub service using octocrab and reqwest
pub struct GitHubService {
    client: Octocrab,
    config: RepoConfig,
    /// Token for raw HTTP requests
    token: String,
    /// HTTP client for raw requests
    http_client: Client,
    /// REST API base URL
    api_base: String,
}

impl GitHubService {
    /// Create a service for github.com
    pub fn new(token: &str, config: RepoConfig) -> Result<Self> {
        Self::with_api_base(token, config, DEFAULT_API_BASE)
    }

    /// Create a service talking to a different API host
    pub fn with_api_base(token: &str, config: RepoConfig, api_base: &str) -> Result<Self> {
        let api_base = api_base.trim_end_matches('/').to_string();
        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .base_uri(api_base.as_str())
            .map_err(|e| Error::GitHubApi(e.to_string()))?
            .build()
            .map_err(|e| Error::GitHubApi(e.to_string()))?;

        let http_client = Client::builder()
            .user_agent(concat!("pr-land/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::GitHubApi(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            token: token.to_string(),
            http_client,
            api_base,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{path}", self.api_base))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn pull_path(&self, pr_number: u64) -> String {
        format!(
            "/repos/{}/{}/pulls/{pr_number}",
            self.config.owner, self.config.name
        )
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<GraphQlResponse<T>> {
        self.client
            .graphql(&serde_json::json!({ "query": query, "variables": variables }))
            .await
            .map_err(|e| Error::GitHubApi(format!("GraphQL query failed: {e}")))
    }
}

fn graphql_error(errors: Vec<GraphQlError>) -> Error {
    let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
    Error::GitHubApi(format!("GraphQL error: {}", messages.join(", ")))
}

async fn status_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    Error::GitHubStatus { status, message }
}

#[async_trait]
impl GitHubApi for GitHubService {
    fn config(&self) -> &RepoConfig {
        &self.config
    }

    async fn oauth_scopes(&self) -> Result<Vec<String>> {
        debug!("fetching OAuth scopes");
        let response = self.request(Method::GET, "/rate_limit").send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        let scopes: Vec<String> = response
            .headers()
            .get("x-oauth-scopes")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();
        debug!(?scopes, "fetched OAuth scopes");
        Ok(scopes)
    }

    async fn get_pull_request(&self, pr_number: u64) -> Result<Option<PullRequestData>> {
        debug!(pr_number, "loading pull request");
        let response: GraphQlResponse<RepositoryData<PullRequestRepository>> = self
            .graphql(
                PULL_REQUEST_QUERY,
                serde_json::json!({
                    "owner": self.config.owner,
                    "name": self.config.name,
                    "number": pr_number,
                }),
            )
            .await?;

        let pr = response
            .data
            .and_then(|d| d.repository)
            .and_then(|r| r.pull_request);
        match (pr, response.errors) {
            (Some(pr), _) => {
                let data = PullRequestData::from(pr);
                debug!(pr_number, state = %data.state, "loaded pull request");
                Ok(Some(data))
            }
            (None, Some(errors))
                if !errors
                    .iter()
                    .all(|e| e.error_type.as_deref() == Some("NOT_FOUND")) =>
            {
                Err(graphql_error(errors))
            }
            (None, _) => {
                debug!(pr_number, "pull request not found");
                Ok(None)
            }
        }
    }

    async fn list_pr_commit_messages(&self, pr_number: u64) -> Result<Vec<String>> {
        debug!(pr_number, "listing PR commits");
        let path = format!("{}/commits", self.pull_path(pr_number));
        let mut messages = Vec::new();
        for page in 1.. {
            let commits: Vec<RestCommit> = self
                .request(Method::GET, &path)
                .query(&[("per_page", PAGE_SIZE.to_string()), ("page", page.to_string())])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            let count = commits.len();
            messages.extend(commits.into_iter().map(|c| c.commit.message));
            if count < PAGE_SIZE {
                break;
            }
        }
        debug!(pr_number, count = messages.len(), "listed PR commits");
        Ok(messages)
    }

    async fn merge_pr(&self, pr_number: u64, options: &ApiMergeOptions) -> Result<ApiMergeOutcome> {
        debug!(pr_number, method = %options.method, "merging PR");
        let body = MergeRequest {
            merge_method: options.method,
            commit_title: options.commit_title.as_deref(),
            commit_message: options.commit_message.as_deref(),
        };
        let response = self
            .request(Method::PUT, &format!("{}/merge", self.pull_path(pr_number)))
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let outcome = match status {
            200 => {
                let merged: MergeResponse = response.json().await?;
                ApiMergeOutcome::Merged { sha: merged.sha }
            }
            405 => ApiMergeOutcome::NotMergeable,
            // GitHub answers 404 instead of 403 to hide private repositories.
            403 | 404 => ApiMergeOutcome::PermissionDenied,
            401 | 500.. => return Err(status_error(response).await),
            _ => ApiMergeOutcome::Failed { status },
        };
        debug!(pr_number, ?outcome, "merge request finished");
        Ok(outcome)
    }

    async fn create_comment(&self, pr_number: u64, body: &str) -> Result<()> {
        debug!(pr_number, "creating PR comment");
        self.client
            .issues(&self.config.owner, &self.config.name)
            .create_comment(pr_number, body)
            .await?;
        debug!(pr_number, "created PR comment");
        Ok(())
    }

    async fn close_pr(&self, pr_number: u64) -> Result<()> {
        debug!(pr_number, "closing PR");
        self.request(Method::PATCH, &self.pull_path(pr_number))
            .json(&serde_json::json!({ "state": "closed" }))
            .send()
            .await?
            .error_for_status()?;
        debug!(pr_number, "closed PR");
        Ok(())
    }

    async fn list_pending_prs(&self) -> Result<Vec<PendingPr>> {
        debug!("listing pending PRs");
        let mut prs = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let response: GraphQlResponse<RepositoryData<PendingRepository>> = self
                .graphql(
                    PENDING_PRS_QUERY,
                    serde_json::json!({
                        "owner": self.config.owner,
                        "name": self.config.name,
                        "after": cursor,
                    }),
                )
                .await?;
            if let Some(errors) = response.errors
                && !errors.is_empty()
            {
                return Err(graphql_error(errors));
            }
            let connection = response
                .data
                .and_then(|d| d.repository)
                .ok_or_else(|| Error::GitHubApi("No repository in GraphQL response".to_string()))?
                .pull_requests;

            // PRs whose head or base branch was deleted cannot be fetched.
            prs.extend(connection.nodes.into_iter().filter_map(|pr| {
                Some(PendingPr {
                    number: pr.number,
                    title: pr.title,
                    updated_at: pr.updated_at,
                    mergeable: pr.mergeable,
                    head: pr.head_ref?.into(),
                    base: pr.base_ref?.into(),
                })
            }));

            match connection.page_info {
                PageInfo {
                    has_next_page: true,
                    end_cursor: Some(next),
                } => cursor = Some(next),
                _ => break,
            }
        }
        debug!(count = prs.len(), "listed pending PRs");
        Ok(prs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn repo() -> RepoConfig {
        RepoConfig {
            owner: "acme".to_string(),
            name: "monorepo".to_string(),
            main_branch: "main".to_string(),
            private: false,
        }
    }

    fn service(server: &mockito::ServerGuard) -> GitHubService {
        GitHubService::with_api_base("test-token", repo(), &server.url()).unwrap()
    }

    async fn merge_with_status(status: usize) -> Result<ApiMergeOutcome> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("PUT", "/repos/acme/monorepo/pulls/7/merge")
            .match_body(Matcher::PartialJson(serde_json::json!({"merge_method": "squash"})))
            .with_status(status)
            .with_body(r#"{"sha": "abc123", "merged": true, "message": "ok"}"#)
            .create_async()
            .await;
        service(&server)
            .merge_pr(7, &ApiMergeOptions::new(MergeMethod::Squash))
            .await
    }

    #[tokio::test]
    async fn test_merge_success_returns_sha() {
        let outcome = merge_with_status(200).await.unwrap();
        assert_eq!(outcome, ApiMergeOutcome::Merged { sha: "abc123".to_string() });
    }

    #[tokio::test]
    async fn test_merge_status_mapping() {
        assert_eq!(merge_with_status(405).await.unwrap(), ApiMergeOutcome::NotMergeable);
        assert_eq!(merge_with_status(403).await.unwrap(), ApiMergeOutcome::PermissionDenied);
        assert_eq!(merge_with_status(404).await.unwrap(), ApiMergeOutcome::PermissionDenied);
        assert_eq!(
            merge_with_status(409).await.unwrap(),
            ApiMergeOutcome::Failed { status: 409 }
        );
        assert!(merge_with_status(401).await.unwrap_err().is_unauthorized());
        assert!(merge_with_status(502).await.is_err());
    }

    #[tokio::test]
    async fn test_merge_sends_custom_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/repos/acme/monorepo/pulls/7/merge")
            .match_body(Matcher::Json(serde_json::json!({
                "merge_method": "squash",
                "commit_title": "fix: thing (#7)",
                "commit_message": "body",
            })))
            .with_status(200)
            .with_body(r#"{"sha": "abc123"}"#)
            .create_async()
            .await;
        let options = ApiMergeOptions {
            method: MergeMethod::Squash,
            commit_title: Some("fix: thing (#7)".to_string()),
            commit_message: Some("body".to_string()),
        };
        service(&server).merge_pr(7, &options).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_oauth_scopes_from_header() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rate_limit")
            .with_status(200)
            .with_header("x-oauth-scopes", "repo, workflow, read:org")
            .with_body("{}")
            .create_async()
            .await;
        let scopes = service(&server).oauth_scopes().await.unwrap();
        assert_eq!(scopes, vec!["repo", "workflow", "read:org"]);
    }

    #[tokio::test]
    async fn test_oauth_scopes_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rate_limit")
            .with_status(401)
            .with_body(r#"{"message": "Bad credentials"}"#)
            .create_async()
            .await;
        let err = service(&server).oauth_scopes().await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_list_commit_messages_paginates() {
        let mut server = mockito::Server::new_async().await;
        let full_page: Vec<_> = (0..100)
            .map(|i| serde_json::json!({"commit": {"message": format!("fix: change {i}")}}))
            .collect();
        let _page1 = server
            .mock("GET", "/repos/acme/monorepo/pulls/7/commits")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_body(serde_json::Value::Array(full_page).to_string())
            .create_async()
            .await;
        let _page2 = server
            .mock("GET", "/repos/acme/monorepo/pulls/7/commits")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_body(r#"[{"commit": {"message": "fix: last"}}]"#)
            .create_async()
            .await;

        let messages = service(&server).list_pr_commit_messages(7).await.unwrap();
        assert_eq!(messages.len(), 101);
        assert_eq!(messages[100], "fix: last");
    }

    #[tokio::test]
    async fn test_close_pr_patches_state() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/repos/acme/monorepo/pulls/7")
            .match_body(Matcher::Json(serde_json::json!({"state": "closed"})))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        service(&server).close_pr(7).await.unwrap();
        mock.assert_async().await;
    }

    #[test]
    fn test_pull_request_mapping() {
        let pr: GraphQlPullRequest = serde_json::from_value(serde_json::json!({
            "url": "https://github.com/acme/monorepo/pull/7",
            "number": 7,
            "title": "fix: thing",
            "isDraft": false,
            "state": "OPEN",
            "baseRefName": "main",
            "labels": {"nodes": [{"name": "target: patch"}]},
            "commits": {
                "totalCount": 2,
                "nodes": [
                    {"commit": {"message": "fix: one", "statusCheckRollup": {"state": "SUCCESS"}}},
                    {"commit": {"message": "fix: two", "statusCheckRollup": {"state": "PENDING"}}}
                ]
            }
        }))
        .unwrap();

        let data = PullRequestData::from(pr);
        assert_eq!(data.state, PrState::Open);
        assert_eq!(data.ci_status, CiStatus::Pending);
        assert_eq!(data.commit_count, 2);
        assert_eq!(data.labels, vec!["target: patch"]);
        assert_eq!(data.commit_messages, vec!["fix: one", "fix: two"]);
    }

    #[test]
    fn test_missing_status_rollup_is_success() {
        let pr: GraphQlPullRequest = serde_json::from_value(serde_json::json!({
            "url": "u", "number": 1, "title": "t", "isDraft": true, "state": "MERGED",
            "baseRefName": "main", "labels": {"nodes": []},
            "commits": {"totalCount": 1, "nodes": [{"commit": {"message": "m", "statusCheckRollup": null}}]}
        }))
        .unwrap();
        let data = PullRequestData::from(pr);
        assert_eq!(data.ci_status, CiStatus::Success);
        assert_eq!(data.state, PrState::Merged);
    }
}
