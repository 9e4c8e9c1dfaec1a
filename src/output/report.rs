//! Renderers for `check` and `list`

use crate::commands::{CheckReport, ListedDeclaration};
use crate::domain::{Diagnostic, Severity};
use crate::output::{OutputConfig, OutputFormat, Verbosity};
use colored::Colorize;
use std::io::Write;

fn write_json<T: serde::Serialize + ?Sized>(value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    writeln!(writer, "{}", json)
}

fn severity_label(severity: Severity, color: bool) -> String {
    let label = severity.to_string();
    if !color {
        return label;
    }
    match severity {
        Severity::Error => label.red().bold().to_string(),
        Severity::Warning => label.yellow().to_string(),
        Severity::Info => label.cyan().to_string(),
    }
}

fn write_diagnostic(
    diagnostic: &Diagnostic,
    color: bool,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{}:{}: {}[{}] {}",
        diagnostic.path.display(),
        diagnostic.line,
        severity_label(diagnostic.severity, color),
        diagnostic.rule,
        diagnostic.message
    )
}

/// Write the outcome of `check`
pub fn write_check(
    report: &CheckReport,
    config: &OutputConfig,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    if config.format == OutputFormat::Json {
        return write_json(report, writer);
    }

    for diagnostic in &report.diagnostics {
        write_diagnostic(diagnostic, config.color, writer)?;
    }

    let summary = &report.summary;
    if report.diagnostics.is_empty() {
        let line = format!("{} file(s) checked, no problems found", report.files.len());
        if config.color {
            writeln!(writer, "{}", line.green())
        } else {
            writeln!(writer, "{}", line)
        }
    } else {
        writeln!(
            writer,
            "{} file(s) checked: {} error(s), {} warning(s)",
            report.files.len(),
            summary.errors,
            summary.warnings
        )
    }
}

/// Write the declarations found by `list`
pub fn write_list(
    declarations: &[ListedDeclaration],
    config: &OutputConfig,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    if config.format == OutputFormat::Json {
        return write_json(declarations, writer);
    }

    let width = declarations.iter().map(|d| d.name.len()).max().unwrap_or(0);
    for declaration in declarations {
        let constraint = if declaration.constraint.is_empty() {
            "*"
        } else {
            declaration.constraint.as_str()
        };
        if config.verbosity == Verbosity::Verbose {
            writeln!(
                writer,
                "{:width$} {}  ({}:{})",
                declaration.name,
                constraint,
                declaration.path.display(),
                declaration.line,
                width = width
            )?;
        } else {
            writeln!(writer, "{:width$} {}", declaration.name, constraint, width = width)?;
        }
    }
    Ok(())
}
