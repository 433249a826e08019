//! Configuration loading
//!
//! The config file (`.pr-land.toml` at the repository root by default) is
//! deserialized into raw structs first and then validated into [`Config`]:
//! label patterns are compiled and the API-merge toggle is checked. Every
//! problem surfaces as [`Error::Config`].

use crate::error::{Error, Result};
use crate::targeting::{
    LabelPattern, ReleaseTrains, TargetBranches, TargetLabel, release_train_labels,
};
use crate::types::{MergeMethod, RepoConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Default config file name, looked up in the repository root
pub const CONFIG_FILE_NAME: &str = ".pr-land.toml";

/// Default label marking a signed CLA
pub const DEFAULT_CLA_SIGNED_LABEL: &str = "cla: yes";
/// Default label marking a PR as ready to merge
pub const DEFAULT_MERGE_READY_LABEL: &str = "action: merge";
/// Default label for PRs with breaking changes
pub const DEFAULT_BREAKING_CHANGE_LABEL: &str = "flag: breaking change";

/// Keyword selecting the GitHub UI target branch in `branches`
const GITHUB_TARGET_KEYWORD: &str = "github-target";

// =============================================================================
// Raw (deserialized) config
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    github: RepoConfig,
    #[serde(default)]
    merge: RawMergeConfig,
    release_trains: Option<ReleaseTrains>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RawMergeConfig {
    labels: Vec<RawTargetLabel>,
    cla_signed_label: Option<String>,
    merge_ready_label: Option<String>,
    caretaker_note_label: Option<String>,
    commit_message_fixup_label: Option<String>,
    breaking_change_label: Option<String>,
    target_label_exempt_scopes: Vec<String>,
    required_base_commits: HashMap<String, String>,
    github_api_merge: Option<RawApiMerge>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTargetLabel {
    pattern: String,
    branches: RawBranches,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBranches {
    List(Vec<String>),
    Keyword(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawApiMerge {
    Toggle(bool),
    Config(RawApiMergeConfig),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawApiMergeConfig {
    default: MergeMethod,
    #[serde(default)]
    labels: Vec<RawMethodLabel>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMethodLabel {
    pattern: String,
    method: MergeMethod,
}

// =============================================================================
// Validated config
// =============================================================================

/// A label selecting a merge method
#[derive(Debug, Clone)]
pub struct MethodLabel {
    /// Label pattern
    pub pattern: LabelPattern,
    /// Method used when the label is present
    pub method: MergeMethod,
}

/// Settings for merging through the GitHub API
#[derive(Debug, Clone)]
pub struct ApiMergeConfig {
    /// Method used when no label selects one
    pub default: MergeMethod,
    /// Labels overriding the default, first match wins
    pub labels: Vec<MethodLabel>,
}

impl ApiMergeConfig {
    /// Merge method for a PR carrying `pr_labels`
    pub fn method_for<S: AsRef<str>>(&self, pr_labels: &[S]) -> MergeMethod {
        self.labels
            .iter()
            .find(|l| l.pattern.matches_any(pr_labels))
            .map_or(self.default, |l| l.method)
    }
}

/// Merge settings, loaded once and read-only afterwards
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Target labels, configured ones first
    pub labels: Vec<TargetLabel>,
    /// Label required to show the CLA is signed
    pub cla_signed_label: LabelPattern,
    /// Label required to merge
    pub merge_ready_label: LabelPattern,
    /// Label asking for caretaker attention before merging
    pub caretaker_note_label: Option<LabelPattern>,
    /// Label requesting a commit message edit while merging
    pub commit_message_fixup_label: Option<LabelPattern>,
    /// Label marking breaking changes
    pub breaking_change_label: String,
    /// Commit scopes ignored by the target label content policy
    pub target_label_exempt_scopes: Vec<String>,
    /// Commit that PRs into a branch must contain
    pub required_base_commits: HashMap<String, String>,
    /// API merge settings; `None` selects the autosquash strategy
    pub github_api_merge: Option<ApiMergeConfig>,
}

/// Complete validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Repository coordinates
    pub github: RepoConfig,
    /// Merge settings
    pub merge: MergeConfig,
    /// Active release trains, if configured
    pub release_trains: Option<ReleaseTrains>,
}

impl Config {
    /// Load and validate the config file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate config file contents
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawConfig =
            toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
        raw.validate()
    }
}

fn pattern(field: &str, raw: &str) -> Result<LabelPattern> {
    LabelPattern::parse(raw).map_err(|e| Error::Config(format!("{field}: {e}")))
}

fn optional_pattern(field: &str, raw: Option<&str>) -> Result<Option<LabelPattern>> {
    raw.map(|r| pattern(field, r)).transpose()
}

impl RawConfig {
    fn validate(self) -> Result<Config> {
        if self.github.owner.is_empty() || self.github.name.is_empty() {
            return Err(Error::Config(
                "github.owner and github.name must not be empty".to_string(),
            ));
        }
        let merge = self.merge;

        let mut labels = merge
            .labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| {
                let branches = match label.branches {
                    RawBranches::List(list) if list.is_empty() => {
                        return Err(Error::Config(format!(
                            "merge.labels[{i}].branches must not be empty"
                        )));
                    }
                    RawBranches::List(list) => TargetBranches::Static(list),
                    RawBranches::Keyword(k) if k == GITHUB_TARGET_KEYWORD => {
                        TargetBranches::GithubTarget
                    }
                    RawBranches::Keyword(k) => {
                        return Err(Error::Config(format!(
                            "merge.labels[{i}].branches: expected a list or \
                             \"{GITHUB_TARGET_KEYWORD}\", got \"{k}\""
                        )));
                    }
                };
                Ok(TargetLabel {
                    pattern: pattern(&format!("merge.labels[{i}].pattern"), &label.pattern)?,
                    branches,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(trains) = &self.release_trains {
            labels.extend(release_train_labels(trains)?);
        }
        if labels.is_empty() {
            return Err(Error::Config(
                "no target labels configured: add merge.labels or release_trains".to_string(),
            ));
        }

        if let Some((branch, _)) = merge
            .required_base_commits
            .iter()
            .find(|(_, sha)| sha.trim().is_empty())
        {
            return Err(Error::Config(format!(
                "merge.required_base_commits.\"{branch}\" must not be empty"
            )));
        }

        let github_api_merge = match merge.github_api_merge {
            None | Some(RawApiMerge::Toggle(false)) => None,
            Some(RawApiMerge::Toggle(true)) => {
                return Err(Error::Config(
                    "merge.github_api_merge must be false or a table with a default method"
                        .to_string(),
                ));
            }
            Some(RawApiMerge::Config(api)) => Some(ApiMergeConfig {
                default: api.default,
                labels: api
                    .labels
                    .into_iter()
                    .enumerate()
                    .map(|(i, l)| {
                        Ok(MethodLabel {
                            pattern: pattern(
                                &format!("merge.github_api_merge.labels[{i}].pattern"),
                                &l.pattern,
                            )?,
                            method: l.method,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            }),
        };

        Ok(Config {
            github: self.github,
            merge: MergeConfig {
                labels,
                cla_signed_label: pattern(
                    "merge.cla_signed_label",
                    merge.cla_signed_label.as_deref().unwrap_or(DEFAULT_CLA_SIGNED_LABEL),
                )?,
                merge_ready_label: pattern(
                    "merge.merge_ready_label",
                    merge.merge_ready_label.as_deref().unwrap_or(DEFAULT_MERGE_READY_LABEL),
                )?,
                caretaker_note_label: optional_pattern(
                    "merge.caretaker_note_label",
                    merge.caretaker_note_label.as_deref(),
                )?,
                commit_message_fixup_label: optional_pattern(
                    "merge.commit_message_fixup_label",
                    merge.commit_message_fixup_label.as_deref(),
                )?,
                breaking_change_label: merge
                    .breaking_change_label
                    .unwrap_or_else(|| DEFAULT_BREAKING_CHANGE_LABEL.to_string()),
                target_label_exempt_scopes: merge.target_label_exempt_scopes,
                required_base_commits: merge.required_base_commits,
                github_api_merge,
            },
            release_trains: self.release_trains,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [github]
        owner = "acme"
        name = "monorepo"

        [[merge.labels]]
        pattern = "target: patch"
        branches = ["main", "10.1.x"]
    "#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.github.main_branch, "main");
        assert!(!config.github.private);
        assert!(config.merge.cla_signed_label.matches("cla: yes"));
        assert!(config.merge.merge_ready_label.matches("action: merge"));
        assert_eq!(config.merge.breaking_change_label, "flag: breaking change");
        assert!(config.merge.github_api_merge.is_none());
        assert_eq!(config.merge.labels.len(), 1);
    }

    #[test]
    fn test_github_target_keyword() {
        let config = Config::from_toml_str(
            r#"
            [github]
            owner = "acme"
            name = "monorepo"

            [[merge.labels]]
            pattern = "/^target: (lts|automation)$/"
            branches = "github-target"
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.merge.labels[0].branches,
            TargetBranches::GithubTarget
        ));
        assert!(config.merge.labels[0].pattern.matches("target: lts"));
    }

    #[test]
    fn test_unknown_branches_keyword_rejected() {
        let err = Config::from_toml_str(
            r#"
            [github]
            owner = "acme"
            name = "monorepo"

            [[merge.labels]]
            pattern = "target: lts"
            branches = "somewhere"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("somewhere")));
    }

    #[test]
    fn test_api_merge_table() {
        let config = Config::from_toml_str(&format!(
            r#"{MINIMAL}
            [merge.github_api_merge]
            default = "squash"

            [[merge.github_api_merge.labels]]
            pattern = "merge: preserve commits"
            method = "rebase"
            "#
        ))
        .unwrap();
        let api = config.merge.github_api_merge.unwrap();
        assert_eq!(api.method_for(&["merge: preserve commits"]), MergeMethod::Rebase);
        assert_eq!(api.method_for(&["target: patch"]), MergeMethod::Squash);
    }

    #[test]
    fn test_api_merge_false_selects_autosquash() {
        let config = Config::from_toml_str(&MINIMAL.replace(
            "[[merge.labels]]",
            "[merge]\n        github_api_merge = false\n\n        [[merge.labels]]",
        ))
        .unwrap();
        assert!(config.merge.github_api_merge.is_none());
    }

    #[test]
    fn test_api_merge_true_rejected() {
        let err = Config::from_toml_str(&MINIMAL.replace(
            "[[merge.labels]]",
            "[merge]\n        github_api_merge = true\n\n        [[merge.labels]]",
        ))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_no_labels_rejected() {
        let err = Config::from_toml_str(
            r#"
            [github]
            owner = "acme"
            name = "monorepo"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no target labels"));
    }

    #[test]
    fn test_release_trains_add_default_labels() {
        let config = Config::from_toml_str(&format!(
            r#"{MINIMAL}
            [release_trains]
            next = "main"
            latest = "10.1.x"
            "#
        ))
        .unwrap();
        let names: Vec<String> = config.merge.labels.iter().map(TargetLabel::name).collect();
        assert_eq!(
            names,
            vec![
                "target: patch",
                "target: major",
                "target: minor",
                "target: patch",
                "target: rc",
                "target: lts"
            ]
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Config::from_toml_str(&format!("{MINIMAL}\n[merge.extra]\nx = 1\n")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_regex_reported_with_field() {
        let err = Config::from_toml_str(&MINIMAL.replace("\"target: patch\"", "\"/(/\"")).unwrap_err();
        assert!(err.to_string().contains("merge.labels[0].pattern"));
    }
}
