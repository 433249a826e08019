//! Target label resolution
//!
//! A pull request carries exactly one *target label* (e.g. `target: patch`).
//! The label decides which release branches the change lands in. Branch
//! lists are either static, the branch selected in the GitHub UI, or
//! computed by a [`BranchResolver`] (possibly with network lookups).

mod lts;
mod release_train;

pub use lts::NpmLtsCheck;
pub use release_train::{ReleaseTrains, release_train_labels};

use crate::error::Error;
use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised while resolving target labels or branches
#[derive(Debug, Error)]
pub enum TargetingError {
    /// Zero or several target labels, or a label that cannot apply
    #[error("{0}")]
    InvalidTargetLabel(String),

    /// The GitHub target branch is not valid for the label
    #[error("{0}")]
    InvalidTargetBranch(String),

    /// A lookup needed for resolution failed
    #[error(transparent)]
    Lookup(#[from] Error),
}

/// A label matcher: exact string or regular expression
#[derive(Debug, Clone)]
pub enum LabelPattern {
    /// Matches a label equal to the string
    Exact(String),
    /// Matches labels the expression finds a match in
    Regex(Regex),
}

impl LabelPattern {
    /// Parse a pattern as written in the config file
    ///
    /// Strings wrapped in slashes (`/^target: /`) are regular expressions,
    /// everything else matches exactly.
    pub fn parse(raw: &str) -> Result<Self, regex::Error> {
        if raw.len() >= 2 && raw.starts_with('/') && raw.ends_with('/') {
            return Ok(Self::Regex(Regex::new(&raw[1..raw.len() - 1])?));
        }
        Ok(Self::Exact(raw.to_string()))
    }

    /// Whether `label` matches this pattern
    pub fn matches(&self, label: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == label,
            Self::Regex(re) => re.is_match(label),
        }
    }

    /// Whether any of `labels` matches this pattern
    pub fn matches_any<S: AsRef<str>>(&self, labels: &[S]) -> bool {
        labels.iter().any(|l| self.matches(l.as_ref()))
    }
}

impl fmt::Display for LabelPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) => f.write_str(s),
            Self::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl From<&str> for LabelPattern {
    fn from(s: &str) -> Self {
        Self::Exact(s.to_string())
    }
}

/// Computes target branches from the branch selected in the GitHub UI
#[async_trait]
pub trait BranchResolver: fmt::Debug + Send + Sync {
    /// Branches for a PR whose GitHub target is `github_target_branch`
    async fn resolve(&self, github_target_branch: &str) -> Result<Vec<String>, TargetingError>;
}

/// Where a target label sends a pull request
#[derive(Debug, Clone)]
pub enum TargetBranches {
    /// A fixed list of branches
    Static(Vec<String>),
    /// Whatever branch is selected in the GitHub UI
    GithubTarget,
    /// Computed on demand
    Resolver(Arc<dyn BranchResolver>),
}

/// A label pattern mapped to the branches a PR should land in
#[derive(Debug, Clone)]
pub struct TargetLabel {
    /// Pattern identifying the label
    pub pattern: LabelPattern,
    /// Branches selected by the label
    pub branches: TargetBranches,
}

impl TargetLabel {
    /// Label with a fixed branch list
    pub fn fixed(pattern: impl Into<LabelPattern>, branches: &[&str]) -> Self {
        Self {
            pattern: pattern.into(),
            branches: TargetBranches::Static(branches.iter().map(ToString::to_string).collect()),
        }
    }

    /// Display name of the label (its pattern)
    pub fn name(&self) -> String {
        self.pattern.to_string()
    }
}

/// Find the single target label matching the PR's labels
///
/// Each PR label contributes the first configured label it matches. Exactly
/// one contribution is accepted; none or several are rejected.
pub fn resolve_label<'a, S: AsRef<str>>(
    target_labels: &'a [TargetLabel],
    pr_labels: &[S],
) -> Result<&'a TargetLabel, TargetingError> {
    let matches: Vec<&TargetLabel> = pr_labels
        .iter()
        .filter_map(|label| {
            target_labels
                .iter()
                .find(|t| t.pattern.matches(label.as_ref()))
        })
        .collect();

    match matches.as_slice() {
        [single] => {
            debug!(label = %single.name(), "resolved target label");
            Ok(single)
        }
        [] => Err(TargetingError::InvalidTargetLabel(
            "Unable to determine target for the PR as it has no target label.".to_string(),
        )),
        _ => Err(TargetingError::InvalidTargetLabel(
            "Unable to determine target for the PR as it has multiple target labels.".to_string(),
        )),
    }
}

/// Evaluate the branches of `label` for a PR targeting `github_target_branch`
pub async fn resolve_branches(
    label: &TargetLabel,
    github_target_branch: &str,
) -> Result<Vec<String>, TargetingError> {
    let branches = match &label.branches {
        TargetBranches::Static(branches) => branches.clone(),
        TargetBranches::GithubTarget => vec![github_target_branch.to_string()],
        TargetBranches::Resolver(resolver) => resolver.resolve(github_target_branch).await?,
    };
    debug!(label = %label.name(), ?branches, "resolved target branches");
    Ok(branches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_pattern() {
        let pattern = LabelPattern::parse("target: patch").unwrap();
        assert!(pattern.matches("target: patch"));
        assert!(!pattern.matches("target: patch "));
        assert_eq!(pattern.to_string(), "target: patch");
    }

    #[test]
    fn test_parse_regex_pattern() {
        let pattern = LabelPattern::parse("/^merge: (preserve|keep) commits$/").unwrap();
        assert!(pattern.matches("merge: keep commits"));
        assert!(!pattern.matches("merge: squash"));
        assert_eq!(pattern.to_string(), "/^merge: (preserve|keep) commits$/");
    }

    #[test]
    fn test_single_slash_is_exact() {
        assert!(matches!(LabelPattern::parse("/").unwrap(), LabelPattern::Exact(_)));
    }

    #[test]
    fn test_invalid_regex_is_error() {
        assert!(LabelPattern::parse("/(unclosed/").is_err());
    }

    #[tokio::test]
    async fn test_github_target_branches() {
        let label = TargetLabel {
            pattern: "target: lts".into(),
            branches: TargetBranches::GithubTarget,
        };
        let branches = resolve_branches(&label, "9.1.x").await.unwrap();
        assert_eq!(branches, vec!["9.1.x"]);
    }
}
