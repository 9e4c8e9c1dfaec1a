//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON serialization of update results
//! - Structured file-by-file update/skip information

use crate::domain::{ManifestUpdateResult, UpdateResult, UpdateSummary};
use crate::orchestrator::OrchestratorResult;
use crate::output::{OutputFormatter, VersionChangeType, Verbosity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbose output includes skipped requirements
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

/// JSON representation of the full result
#[derive(Serialize)]
struct JsonOutput {
    /// Whether this was a dry-run
    dry_run: bool,
    /// Summary statistics
    summary: JsonSummary,
    /// Per-manifest results
    manifests: Vec<JsonManifest>,
    /// Errors encountered
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

/// JSON representation of summary statistics
#[derive(Serialize)]
struct JsonSummary {
    files: usize,
    modified: usize,
    updates: usize,
    skips: usize,
}

impl JsonSummary {
    fn from_summary(summary: &UpdateSummary) -> Self {
        Self {
            files: summary.files_processed(),
            modified: summary.files_modified(),
            updates: summary.total_updates(),
            skips: summary.total_skips(),
        }
    }
}

/// JSON representation of a manifest result
#[derive(Serialize)]
struct JsonManifest {
    path: String,
    constraint_file: bool,
    updates: Vec<JsonUpdate>,
    /// Only in verbose mode
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skips: Vec<JsonSkip>,
}

#[derive(Serialize)]
struct JsonUpdate {
    name: String,
    line: usize,
    /// Constraint before the rewrite
    from: String,
    /// Constraint after the rewrite
    to: String,
    /// Release the anchor now names
    version: String,
    change: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    released_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct JsonSkip {
    name: String,
    line: usize,
    constraint: String,
    reason: &'static str,
    detail: String,
}

impl JsonFormatter {
    /// Convert manifest result to JSON representation
    fn manifest_to_json(&self, manifest: &ManifestUpdateResult) -> JsonManifest {
        let updates = manifest
            .updates()
            .filter_map(|result| match result {
                UpdateResult::Update {
                    requirement,
                    new_version,
                    new_constraint,
                    released_at,
                    ..
                } => Some(JsonUpdate {
                    name: requirement.name.raw.clone(),
                    line: requirement.source.line,
                    from: requirement.constraint(),
                    to: new_constraint.to_string(),
                    version: new_version.clone(),
                    change: VersionChangeType::of(result).label(),
                    released_at: *released_at,
                }),
                UpdateResult::Skip { .. } => None,
            })
            .collect();

        let skips = if self.verbosity == Verbosity::Verbose {
            manifest
                .skips()
                .filter_map(|result| match result {
                    UpdateResult::Skip {
                        requirement,
                        reason,
                    } => Some(JsonSkip {
                        name: requirement.name.raw.clone(),
                        line: requirement.source.line,
                        constraint: requirement.constraint(),
                        reason: reason.code(),
                        detail: reason.to_string(),
                    }),
                    UpdateResult::Update { .. } => None,
                })
                .collect()
        } else {
            Vec::new()
        };

        JsonManifest {
            path: manifest.path.display().to_string(),
            constraint_file: manifest.is_constraint,
            updates,
            skips,
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonOutput {
            dry_run: result.summary.dry_run,
            summary: JsonSummary::from_summary(&result.summary),
            manifests: result
                .summary
                .manifests
                .iter()
                .map(|m| self.manifest_to_json(m))
                .collect(),
            errors: result.errors.iter().map(|e| e.to_string()).collect(),
        };

        let json = serde_json::to_string_pretty(&output).map_err(std::io::Error::other)?;
        writeln!(writer, "{}", json)
    }

    fn format_summary(
        &self,
        summary: &UpdateSummary,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&JsonSummary::from_summary(summary))
            .map_err(std::io::Error::other)?;
        writeln!(writer, "{}", json)
    }
}
