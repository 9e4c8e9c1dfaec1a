//! Lint findings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Identifies the rule that produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCode {
    InvalidLine,
    InvalidName,
    InvalidVersion,
    UnknownOption,
    IncludeNotFound,
    IncludeCycle,
    Duplicate,
    ConflictingDuplicate,
    Unsatisfiable,
    ConstraintConflict,
    Unpinned,
    DirectReference,
}

impl RuleCode {
    /// Kebab-case rule identifier
    pub fn code(&self) -> &'static str {
        match self {
            RuleCode::InvalidLine => "invalid-line",
            RuleCode::InvalidName => "invalid-name",
            RuleCode::InvalidVersion => "invalid-version",
            RuleCode::UnknownOption => "unknown-option",
            RuleCode::IncludeNotFound => "include-not-found",
            RuleCode::IncludeCycle => "include-cycle",
            RuleCode::Duplicate => "duplicate",
            RuleCode::ConflictingDuplicate => "conflicting-duplicate",
            RuleCode::Unsatisfiable => "unsatisfiable",
            RuleCode::ConstraintConflict => "constraint-conflict",
            RuleCode::Unpinned => "unpinned",
            RuleCode::DirectReference => "direct-reference",
        }
    }

    /// Severity when no configuration overrides it
    pub fn default_severity(&self) -> Severity {
        match self {
            RuleCode::Duplicate | RuleCode::Unpinned | RuleCode::DirectReference => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for RuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single finding tied to a manifest line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub line: usize,
    pub severity: Severity,
    pub rule: RuleCode,
    pub message: String,
}

impl Diagnostic {
    /// Creates a diagnostic with the rule's default severity
    pub fn new(
        path: impl Into<PathBuf>,
        line: usize,
        rule: RuleCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            line,
            severity: rule.default_severity(),
            rule,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}[{}] {}",
            self.path.display(),
            self.line,
            self.severity,
            self.rule,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_default_severity() {
        assert_eq!(RuleCode::Duplicate.default_severity(), Severity::Warning);
        assert_eq!(
            RuleCode::ConflictingDuplicate.default_severity(),
            Severity::Error
        );
        assert_eq!(RuleCode::InvalidLine.default_severity(), Severity::Error);
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::new(
            "requirements.txt",
            3,
            RuleCode::InvalidVersion,
            "invalid version '>=abc'",
        );
        assert_eq!(
            d.to_string(),
            "requirements.txt:3: error[invalid-version] invalid version '>=abc'"
        );
    }

    #[test]
    fn test_serde_rule_code_matches_code() {
        for rule in [
            RuleCode::InvalidLine,
            RuleCode::IncludeCycle,
            RuleCode::ConflictingDuplicate,
            RuleCode::DirectReference,
        ] {
            let json = serde_json::to_string(&rule).unwrap();
            assert_eq!(json, format!("\"{}\"", rule.code()));
        }
    }
}
