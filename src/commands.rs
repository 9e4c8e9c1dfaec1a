//! `check` and `list`: the commands that never touch the network

use crate::config::Config;
use crate::domain::Diagnostic;
use crate::error::ManifestError;
use crate::lint::{LintSummary, Linter};
use crate::manifest::{resolve_manifests, unique_files, Loader, ManifestSet};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of `check`
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    /// Every file examined, roots and includes
    pub files: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: LintSummary,
}

impl CheckReport {
    pub fn has_errors(&self) -> bool {
        self.summary.has_errors()
    }
}

/// One row of `list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedDeclaration {
    pub name: String,
    pub constraint: String,
    pub path: PathBuf,
    pub line: usize,
}

fn load_sets(target: &Path, config: &Config) -> Result<Vec<ManifestSet>, ManifestError> {
    let manifests = resolve_manifests(target, &config.files)?;
    Loader::new().load_all(&manifests)
}

/// Validate every manifest under `target`
pub fn check(target: &Path, config: &Config) -> Result<CheckReport, ManifestError> {
    let sets = load_sets(target, config)?;
    let files = unique_files(&sets)
        .into_iter()
        .map(|f| f.path.clone())
        .collect();
    let diagnostics = Linter::new(config.lint).lint_all(&sets);
    let summary = LintSummary::from_diagnostics(&diagnostics);
    Ok(CheckReport {
        files,
        diagnostics,
        summary,
    })
}

/// Every requirement declaration under `target`, in load order
///
/// Constraint-file entries are included; each file is listed once.
pub fn list(target: &Path, config: &Config) -> Result<Vec<ListedDeclaration>, ManifestError> {
    let sets = load_sets(target, config)?;
    let listed = unique_files(&sets)
        .into_iter()
        .flat_map(|file| file.requirements())
        .map(|req| {
            let declaration = req.declaration();
            ListedDeclaration {
                name: declaration.name,
                constraint: declaration.constraint,
                path: req.source.path.clone(),
                line: req.source.line,
            }
        })
        .collect();
    Ok(listed)
}
