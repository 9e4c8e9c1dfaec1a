//! Diff output formatter for showing changes
//!
//! Renders the rewritten physical lines of each file as unified-diff hunks.

use crate::domain::UpdateSummary;
use crate::manifest::WriteResult;
use crate::orchestrator::OrchestratorResult;
use crate::output::OutputFormatter;
use std::io::Write;

/// Diff formatter for showing constraint changes
pub struct DiffFormatter {
    /// Whether this is a dry-run
    dry_run: bool,
}

impl DiffFormatter {
    /// Create a new diff formatter
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    fn verb(&self) -> &'static str {
        if self.dry_run {
            "would be updated"
        } else {
            "updated"
        }
    }

    fn write_file(&self, result: &WriteResult, writer: &mut dyn Write) -> std::io::Result<()> {
        writeln!(writer, "--- a/{}", result.path.display())?;
        writeln!(writer, "+++ b/{}", result.path.display())?;
        for changed in &result.changed_lines {
            writeln!(writer, "@@ -{0} +{0} @@", changed.line)?;
            writeln!(writer, "-{}", changed.before)?;
            writeln!(writer, "+{}", changed.after)?;
        }
        writeln!(writer)
    }
}

impl OutputFormatter for DiffFormatter {
    fn format(&self, result: &OrchestratorResult, writer: &mut dyn Write) -> std::io::Result<()> {
        for write_result in result
            .write_results
            .iter()
            .filter(|w| !w.changed_lines.is_empty())
        {
            self.write_file(write_result, writer)?;
        }

        for error in &result.errors {
            writeln!(writer, "# error: {}", error)?;
        }

        self.format_summary(&result.summary, writer)
    }

    fn format_summary(
        &self,
        summary: &UpdateSummary,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        writeln!(
            writer,
            "# {} package(s) {}",
            summary.total_updates(),
            self.verb()
        )
    }
}
