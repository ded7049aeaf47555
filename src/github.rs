//! GitHub release API types and the latest-release query

use serde::Deserialize;

use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};
use crate::logging::log_info;
use crate::utils::{describe_http_error, get_with_retry, RetryPolicy};

/// GitHub release metadata
#[derive(Deserialize, Debug, Clone)]
pub struct GithubRelease {
    pub tag_name: String,
    pub html_url: String,
    pub assets: Vec<GithubAsset>,
}

/// GitHub release asset
#[derive(Deserialize, Debug, Clone)]
pub struct GithubAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// The pieces of the latest release the updater needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: String,
    pub changelog_url: String,
    pub download_url: String,
}

/// Where the latest release comes from.
pub trait ReleaseSource {
    fn latest_release(&self) -> Result<Release>;
}

impl GithubRelease {
    /// Find an asset named exactly `asset_name`, ignoring case.
    pub fn find_asset(&self, asset_name: &str) -> Option<&GithubAsset> {
        self.assets
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(asset_name))
    }

    pub fn into_release(self, asset_name: &str) -> Result<Release> {
        let asset = self
            .find_asset(asset_name)
            .ok_or_else(|| UpdateError::AssetNotFound {
                asset: asset_name.to_string(),
                release: self.tag_name.clone(),
            })?;

        Ok(Release {
            download_url: asset.browser_download_url.clone(),
            version: self.tag_name,
            changelog_url: self.html_url,
        })
    }
}

/// Pick the most recent release from a releases-list body.
pub fn parse_latest_release(url: &str, body: &str, asset_name: &str) -> Result<Release> {
    let releases: Vec<GithubRelease> =
        serde_json::from_str(body).map_err(|e| UpdateError::InvalidResponse {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let latest = releases
        .into_iter()
        .next()
        .ok_or_else(|| UpdateError::InvalidResponse {
            url: url.to_string(),
            reason: "no releases published".to_string(),
        })?;

    latest.into_release(asset_name)
}

/// Queries the GitHub releases list endpoint.
pub struct GithubClient {
    agent: ureq::Agent,
    releases_url: String,
    asset_name: String,
    retry: RetryPolicy,
}

impl GithubClient {
    pub fn new(agent: ureq::Agent, config: &UpdaterConfig) -> Self {
        Self {
            agent,
            releases_url: config.releases_url.clone(),
            asset_name: config.asset_name.clone(),
            retry: RetryPolicy::from_config(config),
        }
    }
}

impl ReleaseSource for GithubClient {
    fn latest_release(&self) -> Result<Release> {
        let url = &self.releases_url;
        log_info(&format!("Querying releases: {}", url));

        let response =
            get_with_retry(&self.agent, url, &self.retry).map_err(|e| UpdateError::Network {
                url: url.clone(),
                reason: describe_http_error(&e),
            })?;
        let body = response.into_string().map_err(|e| UpdateError::Network {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let release = parse_latest_release(url, &body, &self.asset_name)?;
        log_info(&format!(
            "Latest release: {} ({})",
            release.version, release.changelog_url
        ));
        Ok(release)
    }
}
