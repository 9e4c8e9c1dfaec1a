//! Project configuration from `reqcheck.toml`
//!
//! The file is optional. CLI flags layer over it: lists append and booleans
//! are OR-ed.

use crate::error::ConfigError;
use crate::lint::LintConfig;
use crate::registry::{DEFAULT_INDEX_URL, INDEX_URL_ENV};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File looked up in the target directory when `--config` is absent
pub const CONFIG_FILE_NAME: &str = "reqcheck.toml";

const DAY_SECS: u64 = 24 * 60 * 60;

/// Parse duration string in format: Nd (days), Nw (weeks), Nm (months)
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration {
        value: s.to_string(),
    };

    let trimmed = s.trim();
    let (num_str, days_per_unit) = if let Some(n) = trimmed.strip_suffix('d') {
        (n, 1)
    } else if let Some(n) = trimmed.strip_suffix('w') {
        (n, 7)
    } else if let Some(n) = trimmed.strip_suffix('m') {
        // months are 30 days
        (n, 30)
    } else {
        return Err(invalid());
    };

    let num: u64 = num_str.parse().map_err(|_| invalid())?;
    num.checked_mul(days_per_unit * DAY_SECS)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}

/// Contents of `reqcheck.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Manifests to use instead of detection, relative to the target
    pub files: Vec<PathBuf>,
    /// PyPI-compatible JSON index
    pub index_url: Option<String>,
    pub exclude: Vec<String>,
    pub only: Vec<String>,
    pub include_pinned: bool,
    /// Minimum release age, e.g. "2w"
    pub age: Option<String>,
    pub lint: LintConfig,
}

impl Config {
    /// Parse config text; `path` is only used for error messages
    pub fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::parse_error(path, e.message()))
    }

    /// Read a config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if path.is_dir() {
            return Err(ConfigError::InvalidPath {
                path: path.to_path_buf(),
                message: "expected a file, found a directory".to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(path, &content)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `explicit` if given, otherwise `reqcheck.toml` next to the target
    ///
    /// A missing implicit file yields the defaults.
    pub fn load(explicit: Option<&Path>, target: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let dir = if target.is_file() {
            target.parent().unwrap_or(Path::new("."))
        } else {
            target
        };
        let implicit = dir.join(CONFIG_FILE_NAME);
        if implicit.is_file() {
            Self::from_file(&implicit)
        } else {
            Ok(Self::default())
        }
    }

    /// Minimum release age from the `age` key
    pub fn min_age(&self) -> Result<Option<Duration>, ConfigError> {
        self.age.as_deref().map(parse_duration).transpose()
    }

    /// Index URL: `REQCHECK_INDEX_URL` first, then the config key, then PyPI
    pub fn index_url(&self) -> String {
        std::env::var(INDEX_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.index_url.clone())
            .unwrap_or_else(|| DEFAULT_INDEX_URL.to_string())
    }
}
