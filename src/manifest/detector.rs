//! Manifest file detection
//!
//! Features:
//! - Detects requirements.txt, requirements-*.txt and requirements_*.txt
//! - Detects every *.txt inside a requirements/ directory
//! - Detects constraints.txt and flags it as a constraint file

use crate::error::ManifestError;
use std::path::{Path, PathBuf};

/// Information about a detected manifest file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ManifestInfo {
    /// Path to the manifest file
    pub path: PathBuf,
    /// Whether entries constrain versions instead of adding requirements
    pub is_constraint: bool,
}

impl ManifestInfo {
    /// Create a new ManifestInfo
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_constraint: false,
        }
    }

    /// Mark this manifest as a constraint file
    pub fn with_constraint(mut self, is_constraint: bool) -> Self {
        self.is_constraint = is_constraint;
        self
    }

    /// Build from a path, flagging `constraints*.txt` by name
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_constraint = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("constraints"))
            .unwrap_or(false);
        Self::new(path).with_constraint(is_constraint)
    }
}

fn is_requirements_name(name: &str) -> bool {
    if name == "requirements.txt" {
        return true;
    }
    ["requirements-", "requirements_"].iter().any(|prefix| {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(".txt"))
            .map(|middle| !middle.is_empty())
            .unwrap_or(false)
    })
}

fn txt_files(dir: &Path, filter: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(&filter)
                .unwrap_or(false)
        })
        .collect()
}

/// Detect all manifest files in the given directory
///
/// The result is sorted by path and free of duplicates.
pub fn detect_manifests(dir: &Path) -> Vec<ManifestInfo> {
    let mut manifests: Vec<ManifestInfo> = txt_files(dir, is_requirements_name)
        .into_iter()
        .map(ManifestInfo::new)
        .collect();

    manifests.extend(
        txt_files(&dir.join("requirements"), |n| n.ends_with(".txt"))
            .into_iter()
            .map(ManifestInfo::from_path),
    );

    let constraints = dir.join("constraints.txt");
    if constraints.is_file() {
        manifests.push(ManifestInfo::new(constraints).with_constraint(true));
    }

    manifests.sort();
    manifests.dedup_by(|a, b| a.path == b.path);
    manifests
}

/// Resolve a CLI target into the manifests to process
///
/// A file is used as-is. For a directory, `files` replaces detection when
/// non-empty.
pub fn resolve_manifests(
    target: &Path,
    files: &[PathBuf],
) -> Result<Vec<ManifestInfo>, ManifestError> {
    if target.is_file() {
        return Ok(vec![ManifestInfo::from_path(target)]);
    }
    if !target.is_dir() {
        return Err(ManifestError::not_found(target));
    }

    let manifests = if files.is_empty() {
        detect_manifests(target)
    } else {
        files
            .iter()
            .map(|f| ManifestInfo::from_path(target.join(f)))
            .collect()
    };

    if manifests.is_empty() {
        return Err(ManifestError::NoManifests {
            path: target.to_path_buf(),
        });
    }
    Ok(manifests)
}
