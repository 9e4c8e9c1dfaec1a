//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Human-readable update result display with colors
//! - Version change type indication (major/minor/patch)
//! - Skipped package display with reasons
//! - Summary with detailed breakdown

use crate::domain::{ManifestUpdateResult, UpdateResult, UpdateSummary, Version};
use crate::orchestrator::OrchestratorResult;
use crate::output::{OutputFormatter, Verbosity};
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use std::collections::BTreeMap;
use std::io::Write;

/// Version change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChangeType {
    /// First release segment (or epoch) changed
    Major,
    /// Second release segment changed
    Minor,
    /// Anything smaller
    Patch,
    /// No comparable versions
    Unknown,
}

impl VersionChangeType {
    /// Determine the change type between two versions
    pub fn between(old: &Version, new: &Version) -> Self {
        if old.epoch != new.epoch || old.segment(0) != new.segment(0) {
            VersionChangeType::Major
        } else if old.segment(1) != new.segment(1) {
            VersionChangeType::Minor
        } else {
            VersionChangeType::Patch
        }
    }

    /// Change type of an update, comparing the old and new anchors
    pub fn of(result: &UpdateResult) -> Self {
        match result {
            UpdateResult::Update {
                requirement,
                new_anchor,
                ..
            } => {
                let old = requirement.anchor().and_then(|a| a.version.as_ref());
                match (old, new_anchor.version.as_ref()) {
                    (Some(old), Some(new)) => Self::between(old, new),
                    _ => VersionChangeType::Unknown,
                }
            }
            UpdateResult::Skip { .. } => VersionChangeType::Unknown,
        }
    }

    fn paint(&self, label: &str) -> ColoredString {
        match self {
            VersionChangeType::Major => label.red().bold(),
            VersionChangeType::Minor => label.yellow(),
            VersionChangeType::Patch => label.green(),
            VersionChangeType::Unknown => label.dimmed(),
        }
    }

    /// Get the plain label
    pub fn label(&self) -> &'static str {
        match self {
            VersionChangeType::Major => "major",
            VersionChangeType::Minor => "minor",
            VersionChangeType::Patch => "patch",
            VersionChangeType::Unknown => "?",
        }
    }
}

/// Text formatter for human-readable output
pub struct TextFormatter {
    /// Verbosity level
    verbosity: Verbosity,
    /// Whether this is a dry-run
    dry_run: bool,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity, dry_run: bool) -> Self {
        Self::with_color(verbosity, dry_run, true)
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, dry_run: bool, color: bool) -> Self {
        Self {
            verbosity,
            dry_run,
            color,
        }
    }

    /// Apply a style only when colors are enabled
    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Get the dry-run prefix if applicable
    fn dry_run_prefix(&self) -> String {
        if self.dry_run {
            format!("{} ", self.paint("(dry-run)", |s| s.cyan()))
        } else {
            String::new()
        }
    }

    /// Calculate the maximum package name length for alignment
    fn max_name_length<'a>(&self, results: impl Iterator<Item = &'a UpdateResult>) -> usize {
        results
            .map(|r| r.package_name().len())
            .max()
            .unwrap_or(0)
            .max(20)
    }

    /// Format a single update line
    fn format_update_line(
        &self,
        result: &UpdateResult,
        max_name_len: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let UpdateResult::Update {
            requirement,
            new_constraint,
            released_at,
            ..
        } = result
        else {
            return Ok(());
        };

        let change_type = VersionChangeType::of(result);
        let label = if self.color {
            change_type.paint(change_type.label()).to_string()
        } else {
            change_type.label().to_string()
        };
        let arrow = if self.color { "→" } else { "->" };
        let date = format_date(*released_at);

        writeln!(
            writer,
            "  {:width$} {} {} {} [{}]{}",
            requirement.name.raw,
            self.paint(&requirement.constraint(), |s| s.dimmed()),
            self.paint(arrow, |s| s.dimmed()),
            self.paint(&new_constraint.to_string(), |s| s.bright_white().bold()),
            label,
            self.paint(&date, |s| s.dimmed()),
            width = max_name_len
        )
    }

    /// Format a single skip line
    fn format_skip_line(
        &self,
        result: &UpdateResult,
        max_name_len: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let UpdateResult::Skip {
            requirement,
            reason,
        } = result
        else {
            return Ok(());
        };

        let name = format!("{:width$}", requirement.name.raw, width = max_name_len);
        writeln!(
            writer,
            "  {} {}",
            self.paint(&name, |s| s.dimmed()),
            self.paint(&format!("({})", reason), |s| s.dimmed())
        )
    }

    /// Format one manifest with its updates and, when verbose, its skips
    fn format_manifest(
        &self,
        manifest: &ManifestUpdateResult,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let update_count = manifest.update_count();
        let skip_count = manifest.skip_count();
        let verbose = self.verbosity == Verbosity::Verbose;

        // Skip empty manifests
        if update_count == 0 && (!verbose || skip_count == 0) {
            return Ok(());
        }

        let kind = if manifest.is_constraint {
            format!(" {}", self.paint("(constraints)", |s| s.dimmed()))
        } else {
            String::new()
        };
        writeln!(
            writer,
            "{}{}{} — {} {}, {} {}",
            self.dry_run_prefix(),
            self.paint(&manifest.path.display().to_string(), |s| s.bold()),
            kind,
            self.paint(&update_count.to_string(), |s| s.green()),
            if update_count == 1 { "update" } else { "updates" },
            self.paint(&skip_count.to_string(), |s| s.dimmed()),
            if skip_count == 1 { "skip" } else { "skips" }
        )?;

        let max_name_len = self.max_name_length(manifest.updates());
        for result in manifest.updates() {
            self.format_update_line(result, max_name_len, writer)?;
        }

        if verbose && skip_count > 0 {
            writeln!(writer)?;
            writeln!(writer, "  {}", self.paint("Skipped:", |s| s.dimmed()))?;
            let skip_max_len = self.max_name_length(manifest.skips());
            for result in manifest.skips() {
                self.format_skip_line(result, skip_max_len, writer)?;
            }
        }

        writeln!(writer)?;
        Ok(())
    }

    /// Count updates by change type
    fn count_by_change_type(&self, summary: &UpdateSummary) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for result in summary.all_updates() {
            *counts.entry(VersionChangeType::of(result).label()).or_insert(0) += 1;
        }
        counts
    }

    /// Count skips by reason, most frequent first
    fn count_by_skip_reason(&self, summary: &UpdateSummary) -> Vec<(&'static str, usize)> {
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for manifest in &summary.manifests {
            for result in manifest.skips() {
                if let UpdateResult::Skip { reason, .. } = result {
                    *counts.entry(reason.code()).or_insert(0) += 1;
                }
            }
        }

        let mut result: Vec<_> = counts.into_iter().collect();
        result.sort_by(|a, b| b.1.cmp(&a.1));
        result
    }
}

fn format_date(released_at: Option<DateTime<Utc>>) -> String {
    released_at
        .map(|d| format!(" ({})", d.format("%Y/%m/%d %H:%M")))
        .unwrap_or_default()
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()> {
        // In quiet mode, only show summary
        if self.verbosity == Verbosity::Quiet {
            return self.format_summary(&result.summary, writer);
        }

        for manifest in &result.summary.manifests {
            self.format_manifest(manifest, writer)?;
        }

        if !result.errors.is_empty() {
            writeln!(writer, "{}:", self.paint("Errors", |s| s.red().bold()))?;
            let bullet = if self.color { "✗".red().to_string() } else { "-".to_string() };
            for error in &result.errors {
                writeln!(writer, "  {} {}", bullet, error)?;
            }
            writeln!(writer)?;
        }

        self.format_summary(&result.summary, writer)
    }

    fn format_summary(
        &self,
        summary: &UpdateSummary,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let prefix = self.dry_run_prefix();
        let updates = summary.total_updates();
        let skips = summary.total_skips();

        if self.verbosity == Verbosity::Quiet {
            if updates > 0 {
                let count = self.paint(&updates.to_string(), |s| s.green());
                writeln!(writer, "{}{} updated", prefix, count)?;
            } else {
                writeln!(writer, "{}{}", prefix, self.paint("No updates", |s| s.dimmed()))?;
            }
            return Ok(());
        }

        writeln!(writer, "{}{}:", prefix, self.paint("Summary", |s| s.bold()))?;

        if updates > 0 {
            let counts = self.count_by_change_type(summary);
            let parts: Vec<String> = ["major", "minor", "patch", "?"]
                .iter()
                .filter_map(|label| counts.get(label).map(|n| (label, n)))
                .map(|(label, n)| {
                    let label = if *label == "?" { "other" } else { label };
                    format!("{} {}", n, label)
                })
                .collect();
            writeln!(
                writer,
                "  {} package(s) updated ({})",
                self.paint(&updates.to_string(), |s| s.green()),
                parts.join(", ")
            )?;
        } else {
            writeln!(writer, "  {}", self.paint("No packages updated", |s| s.dimmed()))?;
        }

        if skips > 0 {
            write!(
                writer,
                "  {} package(s) skipped",
                self.paint(&skips.to_string(), |s| s.dimmed())
            )?;
            if self.verbosity == Verbosity::Verbose {
                let parts: Vec<String> = self
                    .count_by_skip_reason(summary)
                    .iter()
                    .map(|(reason, count)| format!("{} {}", count, reason))
                    .collect();
                if !parts.is_empty() {
                    write!(writer, " ({})", self.paint(&parts.join(", "), |s| s.dimmed()))?;
                }
            }
            writeln!(writer)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PackageName, Requirement, SkipReason, SourceLocation, Specifier, SpecifierSet};
    use crate::orchestrator::OrchestratorError;
    use chrono::TimeZone;

    fn requirement(name: &str, spec: &str) -> Requirement {
        Requirement::new(
            PackageName::parse(name).unwrap(),
            SpecifierSet::parse(spec).unwrap(),
            SourceLocation::new("requirements.txt", 1, 1),
        )
    }

    fn bump(name: &str, spec: &str, to: &str) -> UpdateResult {
        let req = requirement(name, spec);
        let index = req.specifiers.anchor_index().unwrap();
        let op = req.specifiers.0[index].op;
        let released = Utc.with_ymd_and_hms(2024, 9, 11, 2, 20, 0).unwrap();
        UpdateResult::update(
            req,
            index,
            Specifier::new(op, Version::parse(to).unwrap()),
            Some(released),
        )
    }

    fn sample_result(dry_run: bool) -> OrchestratorResult {
        let mut summary = UpdateSummary::new(dry_run);
        let mut manifest = ManifestUpdateResult::new("requirements.txt", false);
        manifest.add_result(bump("pytz", ">=2024.1", "2024.2"));
        manifest.add_result(bump("requests", ">=2.31.0,<4", "3.0.1"));
        manifest.add_result(UpdateResult::skip(
            requirement("six", "==1.16.0"),
            SkipReason::Pinned,
        ));
        summary.add_manifest(manifest);
        OrchestratorResult {
            summary,
            write_results: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn render(formatter: &TextFormatter, result: &OrchestratorResult) -> String {
        let mut out = Vec::new();
        formatter.format(result, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_version_change_type() {
        assert_eq!(VersionChangeType::between(&v("1.2.3"), &v("2.0.0")), VersionChangeType::Major);
        assert_eq!(VersionChangeType::between(&v("1.2.3"), &v("1.3.0")), VersionChangeType::Minor);
        assert_eq!(VersionChangeType::between(&v("1.2.3"), &v("1.2.4")), VersionChangeType::Patch);
        assert_eq!(VersionChangeType::between(&v("2024.1"), &v("2024.2")), VersionChangeType::Minor);
        assert_eq!(VersionChangeType::between(&v("1.0"), &v("1!1.0")), VersionChangeType::Major);
    }

    #[test]
    fn test_version_change_type_of_result() {
        assert_eq!(
            VersionChangeType::of(&bump("pytz", ">=2024.1", "2024.2")),
            VersionChangeType::Minor
        );
        let skip = UpdateResult::skip(requirement("six", "==1.16.0"), SkipReason::Pinned);
        assert_eq!(VersionChangeType::of(&skip), VersionChangeType::Unknown);
    }

    #[test]
    fn test_text_plain_output() {
        let formatter = TextFormatter::with_color(Verbosity::Normal, false, false);
        let text = render(&formatter, &sample_result(false));
        assert!(text.contains("requirements.txt — 2 updates, 1 skip"));
        assert!(text.contains(">=2024.1 -> >=2024.2 [minor] (2024/09/11 02:20)"));
        assert!(text.contains(">=2.31.0,<4 -> >=3.0.1,<4 [major]"));
        assert!(text.contains("2 package(s) updated (1 major, 1 minor)"));
        assert!(text.contains("1 package(s) skipped"));
        assert!(!text.contains("Skipped:"));
    }

    #[test]
    fn test_text_verbose_lists_skips() {
        let formatter = TextFormatter::with_color(Verbosity::Verbose, false, false);
        let text = render(&formatter, &sample_result(false));
        assert!(text.contains("Skipped:"));
        assert!(text.contains("(pinned version)"));
        assert!(text.contains("1 pinned"));
    }

    #[test]
    fn test_text_quiet() {
        let formatter = TextFormatter::with_color(Verbosity::Quiet, true, false);
        assert_eq!(render(&formatter, &sample_result(true)), "(dry-run) 2 updated\n");

        let empty = OrchestratorResult {
            summary: UpdateSummary::new(false),
            write_results: Vec::new(),
            errors: Vec::new(),
        };
        assert_eq!(render(&formatter, &empty), "(dry-run) No updates\n");
    }

    #[test]
    fn test_text_dry_run_prefix() {
        let formatter = TextFormatter::with_color(Verbosity::Normal, true, false);
        let text = render(&formatter, &sample_result(true));
        assert!(text.contains("(dry-run) requirements.txt"));
        assert!(text.contains("(dry-run) Summary:"));
    }

    #[test]
    fn test_text_errors_section() {
        let mut result = sample_result(false);
        result.errors.push(OrchestratorError::RegistryError {
            package: "ghost".to_string(),
            message: "package not found".to_string(),
        });
        let formatter = TextFormatter::with_color(Verbosity::Normal, false, false);
        let text = render(&formatter, &result);
        assert!(text.contains("Errors:\n  - Failed to fetch ghost: package not found"));
    }

    #[test]
    fn test_text_no_updates() {
        let mut summary = UpdateSummary::new(false);
        let mut manifest = ManifestUpdateResult::new("constraints.txt", true);
        manifest.add_result(UpdateResult::skip_already_latest(requirement("pytz", ">=2024.2")));
        summary.add_manifest(manifest);
        let result = OrchestratorResult {
            summary,
            write_results: Vec::new(),
            errors: Vec::new(),
        };

        let normal = TextFormatter::with_color(Verbosity::Normal, false, false);
        let text = render(&normal, &result);
        assert!(!text.contains("constraints.txt"));
        assert!(text.contains("No packages updated"));

        let verbose = TextFormatter::with_color(Verbosity::Verbose, false, false);
        assert!(render(&verbose, &result).contains("constraints.txt (constraints) — 0 updates, 1 skip"));
    }
}
