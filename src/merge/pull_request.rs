//! Loading a pull request and checking it may be merged

use crate::commit_message::{ParsedCommitMessage, parse_commit_message};
use crate::config::MergeConfig;
use crate::error::Result;
use crate::merge::PullRequestFailure;
use crate::platform::GitHubApi;
use crate::targeting::{TargetLabel, TargetingError, resolve_branches, resolve_label};
use crate::types::{CiStatus, PrState, PullRequest, PullRequestData};
use tracing::{debug, warn};

/// A validated pull request, or the first reason it cannot be merged
pub type Validation = std::result::Result<PullRequest, PullRequestFailure>;

/// Load pull request `pr_number` and validate it against `config`
///
/// With `force`, non-fatal checks (commit content policy, breaking change
/// labelling, CI status) are skipped. GitHub and registry faults are errors;
/// everything else is a [`PullRequestFailure`].
pub async fn load_and_validate_pull_request(
    config: &MergeConfig,
    github: &dyn GitHubApi,
    pr_number: u64,
    force: bool,
) -> Result<Validation> {
    let Some(data) = github.get_pull_request(pr_number).await? else {
        return Ok(Err(PullRequestFailure::not_found()));
    };

    if !config.merge_ready_label.matches_any(&data.labels) {
        return Ok(Err(PullRequestFailure::not_merge_ready()));
    }
    if !config.cla_signed_label.matches_any(&data.labels) {
        return Ok(Err(PullRequestFailure::cla_unsigned()));
    }

    let target_label = match resolve_label(&config.labels, &data.labels) {
        Ok(label) => label,
        Err(TargetingError::Lookup(e)) => return Err(e),
        Err(e) => return Ok(Err(PullRequestFailure::fatal(e.to_string()))),
    };

    if let Some(failure) = check_pending_state(&data) {
        return Ok(Err(failure));
    }

    if !force {
        let commits: Vec<ParsedCommitMessage> = data
            .commit_messages
            .iter()
            .map(|m| parse_commit_message(m))
            .collect();
        if let Some(failure) = check_changes_allowed_for_target_label(&commits, target_label, config)
            .or_else(|| check_breaking_change_labeling(&commits, &data.labels, config))
            .or_else(|| check_ci_status(data.ci_status))
        {
            return Ok(Err(failure));
        }
    }

    let github_target_branch = data.base_ref_name.clone();
    let target_branches = match resolve_branches(target_label, &github_target_branch).await {
        Ok(branches) => branches,
        Err(TargetingError::Lookup(e)) => return Err(e),
        Err(e) => return Ok(Err(PullRequestFailure::fatal(e.to_string()))),
    };

    let needs_commit_message_fixup = config
        .commit_message_fixup_label
        .as_ref()
        .is_some_and(|p| p.matches_any(&data.labels));
    let has_caretaker_note = config
        .caretaker_note_label
        .as_ref()
        .is_some_and(|p| p.matches_any(&data.labels));

    debug!(
        pr_number,
        ?target_branches,
        github_target_branch = %github_target_branch,
        "validated pull request"
    );
    Ok(Ok(PullRequest {
        url: data.url,
        number: data.number,
        title: data.title,
        labels: data.labels,
        required_base_sha: config.required_base_commits.get(&github_target_branch).cloned(),
        target_branches,
        github_target_branch,
        commit_count: data.commit_count,
        needs_commit_message_fixup,
        has_caretaker_note,
    }))
}

fn check_pending_state(data: &PullRequestData) -> Option<PullRequestFailure> {
    if data.is_draft {
        return Some(PullRequestFailure::is_draft());
    }
    match data.state {
        PrState::Open => None,
        PrState::Closed => Some(PullRequestFailure::is_closed()),
        PrState::Merged => Some(PullRequestFailure::is_merged()),
    }
}

fn check_changes_allowed_for_target_label(
    commits: &[ParsedCommitMessage],
    label: &TargetLabel,
    config: &MergeConfig,
) -> Option<PullRequestFailure> {
    let relevant: Vec<&ParsedCommitMessage> = commits
        .iter()
        .filter(|c| !config.target_label_exempt_scopes.contains(&c.scope))
        .collect();
    let has_breaking_changes = relevant.iter().any(|c| !c.breaking_changes.is_empty());
    let has_deprecations = relevant.iter().any(|c| !c.deprecations.is_empty());
    let has_feature_commits = relevant.iter().any(|c| c.commit_type == "feat");

    match label.name().as_str() {
        "target: major" => None,
        "target: minor" => {
            has_breaking_changes.then(|| PullRequestFailure::has_breaking_changes(label))
        }
        "target: rc" | "target: patch" | "target: lts" => {
            if has_breaking_changes {
                Some(PullRequestFailure::has_breaking_changes(label))
            } else if has_feature_commits {
                Some(PullRequestFailure::has_feature_commits(label))
            } else if has_deprecations {
                Some(PullRequestFailure::has_deprecations(label))
            } else {
                None
            }
        }
        other => {
            warn!(
                "Unable to confirm all commits in the pull request are eligible to be merged \
                 into the target branch: {other}"
            );
            None
        }
    }
}

fn check_breaking_change_labeling(
    commits: &[ParsedCommitMessage],
    labels: &[String],
    config: &MergeConfig,
) -> Option<PullRequestFailure> {
    let has_label = labels.contains(&config.breaking_change_label);
    let has_commit = commits.iter().any(|c| !c.breaking_changes.is_empty());
    match (has_label, has_commit) {
        (false, true) => Some(PullRequestFailure::missing_breaking_change_label()),
        (true, false) => Some(PullRequestFailure::missing_breaking_change_commit()),
        _ => None,
    }
}

fn check_ci_status(status: CiStatus) -> Option<PullRequestFailure> {
    match status {
        CiStatus::Success => None,
        CiStatus::Failure => Some(PullRequestFailure::failing_ci_jobs()),
        CiStatus::Pending => Some(PullRequestFailure::pending_ci_jobs()),
    }
}
