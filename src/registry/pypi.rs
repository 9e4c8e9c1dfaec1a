//! PyPI JSON API adapter
//!
//! Fetches package release information from a PyPI-compatible index.
//! API endpoint: {index}/{normalized-name}/json

use crate::domain::{normalize, Version};
use crate::error::RegistryError;
use crate::registry::{HttpClient, RegistryAdapter};
use crate::update::VersionInfo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// PyPI API base URL
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/pypi";

/// Environment variable that overrides the index URL
pub const INDEX_URL_ENV: &str = "REQCHECK_INDEX_URL";

/// PyPI adapter
pub struct PyPIAdapter {
    client: HttpClient,
    index_url: String,
}

/// PyPI package metadata response
#[derive(Debug, Deserialize)]
struct PyPIResponse {
    /// Release files keyed by version
    releases: HashMap<String, Vec<ReleaseFile>>,
}

/// A single uploaded distribution file
#[derive(Debug, Deserialize)]
struct ReleaseFile {
    upload_time_iso_8601: Option<String>,
    #[serde(default)]
    yanked: bool,
}

impl PyPIAdapter {
    /// Create a new PyPI adapter against the public index
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            index_url: DEFAULT_INDEX_URL.to_string(),
        }
    }

    /// Use a different PyPI-compatible JSON index
    pub fn with_index_url(mut self, url: impl Into<String>) -> Self {
        self.index_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    /// Build the URL for a package
    fn build_url(&self, package: &str) -> String {
        format!("{}/{}/json", self.index_url, normalize(package))
    }
}

/// Earliest upload time across non-yanked files, None when nothing usable
fn release_date(files: &[ReleaseFile]) -> Option<DateTime<Utc>> {
    if files.is_empty() || files.iter().all(|f| f.yanked) {
        return None;
    }
    files
        .iter()
        .filter(|f| !f.yanked)
        .filter_map(|f| f.upload_time_iso_8601.as_deref())
        .filter_map(|t| t.parse::<DateTime<Utc>>().ok())
        .min()
}

#[async_trait]
impl RegistryAdapter for PyPIAdapter {
    fn registry_name(&self) -> &'static str {
        "PyPI"
    }

    async fn fetch_versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError> {
        let url = self.build_url(package);
        let response: PyPIResponse = self
            .client
            .get_json(&url, package, self.registry_name())
            .await?;

        let listed = response.releases.len();
        let mut versions: Vec<VersionInfo> = response
            .releases
            .into_iter()
            .filter_map(|(raw, files)| {
                let released_at = release_date(&files)?;
                let version = Version::parse(&raw)?;
                Some(VersionInfo::new(version, released_at))
            })
            .collect();

        versions.sort();
        debug!(package, listed, usable = versions.len(), "fetched releases");

        Ok(versions)
    }
}
