//! Long-term support branch checks against the npm registry

use super::TargetingError;
use super::release_train::parse_version_branch;
use crate::error::{self, Error};
use chrono::{DateTime, Months, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Months a major version stays in long-term support after its release.
const LTS_DURATION_MONTHS: u32 = 18;

#[derive(Debug, Deserialize)]
struct PackageInfo {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    time: HashMap<String, String>,
}

/// Verifies that a version branch is an active LTS branch of an npm package
#[derive(Debug, Clone)]
pub struct NpmLtsCheck {
    client: Client,
    registry: String,
    package: String,
}

impl NpmLtsCheck {
    /// Create a checker for `package` on `registry`
    pub fn new(registry: &str, package: &str) -> error::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("pr-land/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Registry(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            registry: registry.trim_end_matches('/').to_string(),
            package: package.to_string(),
        })
    }

    async fn fetch_package_info(&self) -> error::Result<PackageInfo> {
        let url = format!("{}/{}", self.registry, self.package);
        debug!(url = %url, "fetching npm package info");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Registry(format!("failed to fetch {url}: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Registry(format!(
                "failed to fetch {url}: status {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| Error::Registry(format!("failed to parse package info: {e}")))
    }

    /// Fail unless `branch` is the active LTS branch of its major version
    pub async fn assert_active_lts_branch(&self, branch: &str) -> Result<(), TargetingError> {
        self.assert_active_lts_branch_at(branch, Utc::now()).await
    }

    /// Like [`assert_active_lts_branch`](Self::assert_active_lts_branch) with an explicit clock
    pub async fn assert_active_lts_branch_at(
        &self,
        branch: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TargetingError> {
        let Some((major, _)) = parse_version_branch(branch) else {
            return Err(TargetingError::InvalidTargetBranch(format!(
                "\"{branch}\" is not a version branch."
            )));
        };
        let info = self.fetch_package_info().await?;

        let Some(lts_version) = info.dist_tags.get(&format!("v{major}-lts")) else {
            return Err(TargetingError::InvalidTargetBranch(format!(
                "No LTS version tagged for v{major} in NPM."
            )));
        };
        let expected_branch = lts_branch_name(lts_version);
        if expected_branch.as_deref() != Some(branch) {
            return Err(TargetingError::InvalidTargetBranch(format!(
                "Not using last-minor branch for v{major} LTS version. PR should be updated to \
                 target: {}",
                expected_branch.unwrap_or_else(|| lts_version.clone())
            )));
        }

        let released = info
            .time
            .get(&format!("{major}.0.0"))
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .ok_or_else(|| {
                TargetingError::InvalidTargetBranch(format!(
                    "No release date found for v{major}.0.0 in NPM."
                ))
            })?;
        let lts_end = released
            .with_timezone(&Utc)
            .checked_add_months(Months::new(LTS_DURATION_MONTHS))
            .ok_or_else(|| Error::Internal("LTS end date out of range".to_string()))?;

        if now > lts_end {
            return Err(TargetingError::InvalidTargetBranch(format!(
                "Long-term support ended for v{major} on {}.",
                lts_end.format("%Y-%m-%d")
            )));
        }
        debug!(branch, %lts_end, "branch is an active LTS branch");
        Ok(())
    }
}

/// `10.2.4` -> `10.2.x`
fn lts_branch_name(version: &str) -> Option<String> {
    let mut parts = version.split('.');
    let major = parts.next()?;
    let minor = parts.next()?;
    Some(format!("{major}.{minor}.x"))
}
