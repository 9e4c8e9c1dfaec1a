//! Update result summary types
//!
//! Provides structures for tracking update results at file and overall levels.

use super::UpdateResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Update result for a single manifest file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestUpdateResult {
    /// Path to the manifest file
    pub path: PathBuf,
    /// Whether the file was reached through `-c`
    pub is_constraint: bool,
    /// Individual requirement update results
    pub results: Vec<UpdateResult>,
    /// Whether the file would change
    pub modified: bool,
}

impl ManifestUpdateResult {
    /// Creates a new ManifestUpdateResult
    pub fn new(path: impl Into<PathBuf>, is_constraint: bool) -> Self {
        Self {
            path: path.into(),
            is_constraint,
            results: Vec::new(),
            modified: false,
        }
    }

    /// Adds an update result
    pub fn add_result(&mut self, result: UpdateResult) {
        if result.is_update() {
            self.modified = true;
        }
        self.results.push(result);
    }

    /// Returns the number of updates
    pub fn update_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_update()).count()
    }

    /// Returns the number of skips
    pub fn skip_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_skip()).count()
    }

    /// Returns all updates
    pub fn updates(&self) -> impl Iterator<Item = &UpdateResult> {
        self.results.iter().filter(|r| r.is_update())
    }

    /// Returns all skips
    pub fn skips(&self) -> impl Iterator<Item = &UpdateResult> {
        self.results.iter().filter(|r| r.is_skip())
    }

    /// Returns true if any requirements were updated
    pub fn has_updates(&self) -> bool {
        self.update_count() > 0
    }
}

/// Overall summary of all update operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSummary {
    /// Results for each manifest file processed
    pub manifests: Vec<ManifestUpdateResult>,
    /// Whether this was a dry run
    pub dry_run: bool,
}

impl UpdateSummary {
    /// Creates a new UpdateSummary
    pub fn new(dry_run: bool) -> Self {
        Self {
            manifests: Vec::new(),
            dry_run,
        }
    }

    /// Adds a manifest result
    pub fn add_manifest(&mut self, manifest: ManifestUpdateResult) {
        self.manifests.push(manifest);
    }

    pub fn files_processed(&self) -> usize {
        self.manifests.len()
    }

    pub fn files_modified(&self) -> usize {
        self.manifests.iter().filter(|m| m.modified).count()
    }

    pub fn total_updates(&self) -> usize {
        self.manifests.iter().map(|m| m.update_count()).sum()
    }

    pub fn total_skips(&self) -> usize {
        self.manifests.iter().map(|m| m.skip_count()).sum()
    }

    pub fn total_requirements(&self) -> usize {
        self.manifests.iter().map(|m| m.results.len()).sum()
    }

    /// Returns true if any files were modified
    pub fn has_changes(&self) -> bool {
        self.files_modified() > 0
    }

    /// Returns all updates across all manifests
    pub fn all_updates(&self) -> impl Iterator<Item = &UpdateResult> {
        self.manifests.iter().flat_map(|m| m.updates())
    }
}

impl Default for UpdateSummary {
    fn default() -> Self {
        Self::new(false)
    }
}
