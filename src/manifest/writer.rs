//! Manifest file writing and update operations
//!
//! This module provides:
//! - ManifestWriter for applying constraint updates to requirements files
//! - Dry-run mode support (no actual file modifications)
//! - Byte-for-byte preservation of everything except the rewritten version
//! - Per-update failure handling with graceful continuation

use crate::domain::{ManifestUpdateResult, Requirement, Specifier, UpdateResult};
use crate::error::ManifestError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writer for manifest files that applies constraint updates
pub struct ManifestWriter {
    /// Whether to run in dry-run mode (no file modifications)
    dry_run: bool,
}

/// A physical line before and after an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedLine {
    /// 1-based physical line number
    pub line: usize,
    pub before: String,
    pub after: String,
}

/// Result of applying updates to a manifest file
#[derive(Debug)]
pub struct WriteResult {
    /// Path to the manifest file
    pub path: PathBuf,
    /// Number of updates successfully applied
    pub updates_applied: usize,
    /// Number of updates that failed
    pub updates_failed: usize,
    /// Whether the file was actually modified
    pub file_modified: bool,
    /// Errors encountered during update
    pub errors: Vec<String>,
    /// Content after all updates, also computed in dry-run mode
    pub new_content: Option<String>,
    /// Lines that differ from the original
    pub changed_lines: Vec<ChangedLine>,
}

impl WriteResult {
    /// Create a new WriteResult
    fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            updates_applied: 0,
            updates_failed: 0,
            file_modified: false,
            errors: Vec::new(),
            new_content: None,
            changed_lines: Vec::new(),
        }
    }

    /// Returns true if any updates were successfully applied
    pub fn has_updates(&self) -> bool {
        self.updates_applied > 0
    }

    /// Returns true if any errors occurred
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl ManifestWriter {
    /// Create a new ManifestWriter
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Create a ManifestWriter in dry-run mode
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }

    /// Check if this writer is in dry-run mode
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Apply updates from a ManifestUpdateResult to the actual file
    pub fn apply_updates(
        &self,
        manifest_result: &ManifestUpdateResult,
    ) -> Result<WriteResult, ManifestError> {
        let path = &manifest_result.path;
        let mut result = WriteResult::new(path);

        let content = read_manifest(path)?;
        let mut lines: Vec<String> = content.split_inclusive('\n').map(String::from).collect();
        let original = lines.clone();

        for update in manifest_result.updates() {
            if let UpdateResult::Update {
                requirement,
                new_anchor,
                ..
            } = update
            {
                match rewrite_requirement(&mut lines, requirement, new_anchor) {
                    Ok(()) => result.updates_applied += 1,
                    Err(message) => {
                        result.updates_failed += 1;
                        let err = ManifestError::update_failed(
                            path,
                            requirement.name.raw.clone(),
                            message,
                        );
                        result.errors.push(err.to_string());
                    }
                }
            }
        }

        result.changed_lines = original
            .iter()
            .zip(&lines)
            .enumerate()
            .filter(|(_, (before, after))| before != after)
            .map(|(i, (before, after))| ChangedLine {
                line: i + 1,
                before: trim_eol(before).to_string(),
                after: trim_eol(after).to_string(),
            })
            .collect();

        let new_content = lines.concat();

        // Write back to file if not in dry-run mode and there were changes
        if result.updates_applied > 0 && !self.dry_run && new_content != content {
            write_manifest(path, &new_content)?;
            result.file_modified = true;
            info!(path = %path.display(), updates = result.updates_applied, "wrote manifest");
        } else {
            debug!(path = %path.display(), dry_run = self.dry_run, "manifest not written");
        }
        result.new_content = Some(new_content);

        Ok(result)
    }

    /// Apply updates to multiple manifest files
    pub fn apply_all_updates(&self, manifests: &[ManifestUpdateResult]) -> Vec<WriteResult> {
        manifests
            .iter()
            .filter_map(|manifest| {
                // Only process manifests that have updates
                if !manifest.has_updates() {
                    return None;
                }

                match self.apply_updates(manifest) {
                    Ok(result) => Some(result),
                    Err(e) => {
                        let mut result = WriteResult::new(&manifest.path);
                        result
                            .errors
                            .push(format!("Failed to process manifest: {}", e));
                        Some(result)
                    }
                }
            })
            .collect()
    }
}

fn trim_eol(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Characters that may continue a version token
fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '*' | '+' | '_' | '-' | '!')
}

/// Find `needle` as a whole clause in `haystack` starting at `from`
fn find_clause(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let mut start = from;
    while let Some(offset) = haystack.get(start..)?.find(needle) {
        let at = start + offset;
        let before_ok = !haystack[..at].ends_with(['=', '<', '>', '!', '~']);
        let after_ok = !haystack[at + needle.len()..]
            .chars()
            .next()
            .map(is_version_char)
            .unwrap_or(false);
        if before_ok && after_ok {
            return Some(at);
        }
        start = at + needle.len();
    }
    None
}

/// Replace the anchor clause of `requirement` inside its physical lines
fn rewrite_requirement(
    lines: &mut [String],
    requirement: &Requirement,
    new_anchor: &Specifier,
) -> Result<(), String> {
    let anchor = requirement
        .specifiers
        .anchor_index()
        .and_then(|i| requirement.specifiers.0.get(i))
        .ok_or_else(|| "requirement has no anchor clause".to_string())?;

    let old_raw = anchor.raw.as_str();
    let new_raw = old_raw.replacen(&anchor.version_text, &new_anchor.version_text, 1);

    let first = requirement.source.line.saturating_sub(1);
    let last = requirement.source.end_line.max(requirement.source.line);
    if first >= lines.len() {
        return Err(format!("line {} is past the end of the file", first + 1));
    }

    for index in first..last.min(lines.len()) {
        let line = &lines[index];
        let from = if index == first {
            match line.find(requirement.name.raw.as_str()) {
                Some(at) => at + requirement.name.raw.len(),
                None => return Err(format!("package name not found on line {}", index + 1)),
            }
        } else {
            0
        };

        if let Some(at) = find_clause(line, old_raw, from) {
            let mut updated = String::with_capacity(line.len() + new_raw.len());
            updated.push_str(&line[..at]);
            updated.push_str(&new_raw);
            updated.push_str(&line[at + old_raw.len()..]);
            lines[index] = updated;
            return Ok(());
        }
    }

    Err(format!("'{}' not found", old_raw))
}

/// Read a manifest file content safely
pub fn read_manifest(path: &Path) -> Result<String, ManifestError> {
    fs::read_to_string(path).map_err(|e| ManifestError::read_error(path, e))
}

/// Write content to a manifest file
pub fn write_manifest(path: &Path, content: &str) -> Result<(), ManifestError> {
    fs::write(path, content).map_err(|e| ManifestError::write_error(path, e))
}
