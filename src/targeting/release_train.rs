//! Default `target: *` labels derived from the active release trains

use super::{BranchResolver, NpmLtsCheck, TargetBranches, TargetLabel, TargetingError};
use crate::error;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Release branches currently in flight
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseTrains {
    /// Branch for the next release (usually the main branch)
    pub next: String,
    /// Whether the next release is a major version
    #[serde(default)]
    pub next_is_major: bool,
    /// Branch of the latest published release (e.g. `17.1.x`)
    pub latest: String,
    /// Feature-freeze or release-candidate branch, if any
    #[serde(default)]
    pub release_candidate: Option<String>,
    /// npm package used to look up LTS releases
    #[serde(default)]
    pub npm_package: Option<String>,
    /// npm registry base URL
    #[serde(default = "default_registry")]
    pub npm_registry: String,
}

fn default_registry() -> String {
    "https://registry.npmjs.org".to_string()
}

/// Parse `N.M.x` into `(N, M)`
pub(crate) fn parse_version_branch(branch: &str) -> Option<(u64, u64)> {
    let (major, minor) = branch.strip_suffix(".x")?.split_once('.')?;
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !numeric(major) || !numeric(minor) {
        return None;
    }
    Some((major.parse().ok()?, minor.parse().ok()?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrainTarget {
    Major,
    Minor,
    Patch,
    ReleaseCandidate,
    Lts,
}

#[derive(Debug)]
struct TrainResolver {
    target: TrainTarget,
    trains: ReleaseTrains,
    lts: Option<NpmLtsCheck>,
}

#[async_trait]
impl BranchResolver for TrainResolver {
    async fn resolve(&self, github_target_branch: &str) -> Result<Vec<String>, TargetingError> {
        let trains = &self.trains;
        match self.target {
            TrainTarget::Major => {
                if !trains.next_is_major {
                    return Err(TargetingError::InvalidTargetLabel(
                        "Unable to merge pull request. The \"next\" branch will be released as \
                         a minor version."
                            .to_string(),
                    ));
                }
                Ok(vec![trains.next.clone()])
            }
            TrainTarget::Minor => Ok(vec![trains.next.clone()]),
            TrainTarget::Patch => {
                if github_target_branch == trains.latest {
                    return Ok(vec![trains.latest.clone()]);
                }
                let mut branches = vec![trains.next.clone(), trains.latest.clone()];
                branches.extend(trains.release_candidate.clone());
                Ok(branches)
            }
            TrainTarget::ReleaseCandidate => {
                let Some(rc) = &trains.release_candidate else {
                    return Err(TargetingError::InvalidTargetLabel(
                        "No active feature-freeze/release-candidate branch. Unable to merge pull \
                         request using \"target: rc\" label."
                            .to_string(),
                    ));
                };
                if github_target_branch == rc {
                    return Ok(vec![rc.clone()]);
                }
                Ok(vec![trains.next.clone(), rc.clone()])
            }
            TrainTarget::Lts => self.resolve_lts(github_target_branch).await,
        }
    }
}

impl TrainResolver {
    async fn resolve_lts(&self, github_target_branch: &str) -> Result<Vec<String>, TargetingError> {
        if parse_version_branch(github_target_branch).is_none() {
            return Err(TargetingError::InvalidTargetBranch(format!(
                "PR cannot be merged as it does not target a long-term support branch: \
                 \"{github_target_branch}\""
            )));
        }
        if github_target_branch == self.trains.latest {
            return Err(TargetingError::InvalidTargetBranch(
                "PR cannot be merged with \"target: lts\" into patch branch. Consider changing \
                 the label to \"target: patch\" if this is intentional."
                    .to_string(),
            ));
        }
        if self.trains.release_candidate.as_deref() == Some(github_target_branch) {
            return Err(TargetingError::InvalidTargetBranch(
                "PR cannot be merged with \"target: lts\" into feature-freeze/release-candidate \
                 branch. Consider changing the label to \"target: rc\" if this is intentional."
                    .to_string(),
            ));
        }
        let Some(lts) = &self.lts else {
            return Err(TargetingError::InvalidTargetBranch(
                "Unable to verify long-term support branches: no npm package configured."
                    .to_string(),
            ));
        };
        lts.assert_active_lts_branch(github_target_branch).await?;
        Ok(vec![github_target_branch.to_string()])
    }
}

/// The `target: major|minor|patch|rc|lts` labels for `trains`
pub fn release_train_labels(trains: &ReleaseTrains) -> error::Result<Vec<TargetLabel>> {
    let lts = trains
        .npm_package
        .as_deref()
        .map(|package| NpmLtsCheck::new(&trains.npm_registry, package))
        .transpose()?;

    let labels = [
        ("target: major", TrainTarget::Major),
        ("target: minor", TrainTarget::Minor),
        ("target: patch", TrainTarget::Patch),
        ("target: rc", TrainTarget::ReleaseCandidate),
        ("target: lts", TrainTarget::Lts),
    ];

    Ok(labels
        .into_iter()
        .map(|(name, target)| TargetLabel {
            pattern: name.into(),
            branches: TargetBranches::Resolver(Arc::new(TrainResolver {
                target,
                trains: trains.clone(),
                lts: lts.clone(),
            })),
        })
        .collect())
}
