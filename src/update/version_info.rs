//! Release information from the package index

use crate::domain::Version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published release with its upload date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: Version,
    /// Earliest upload time of the release's files
    pub released_at: DateTime<Utc>,
}

impl VersionInfo {
    pub fn new(version: Version, released_at: DateTime<Utc>) -> Self {
        Self {
            version,
            released_at,
        }
    }

    /// Parse a version string, returning None if it is not PEP 440
    pub fn parse(version: &str, released_at: DateTime<Utc>) -> Option<Self> {
        Version::parse(version).map(|v| Self::new(v, released_at))
    }

    pub fn is_prerelease(&self) -> bool {
        self.version.is_prerelease()
    }

    /// Returns true if released at or before `cutoff`
    pub fn released_before(&self, cutoff: DateTime<Utc>) -> bool {
        self.released_at <= cutoff
    }
}

impl Ord for VersionInfo {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.version
            .cmp(&other.version)
            .then(self.released_at.cmp(&other.released_at))
    }
}

impl PartialOrd for VersionInfo {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
