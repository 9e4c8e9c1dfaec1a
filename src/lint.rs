//! Manifest validation for the `check` command
//!
//! Runs three passes over a loaded manifest set:
//! - line errors and include problems
//! - per-declaration rules
//! - cross-declaration rules on requirements grouped by normalized name

use crate::domain::{Diagnostic, Requirement, RuleCode, Severity};
use crate::manifest::{Entry, ManifestSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Optional rules and severity handling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintConfig {
    /// Warn on requirements without `==` / `===`
    pub require_pins: bool,
    /// Warn on `name @ url`, bare URL and path lines
    pub forbid_direct_references: bool,
    /// Report every warning as an error
    pub warnings_as_errors: bool,
}

/// Count of findings per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LintSummary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl LintSummary {
    pub fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        diagnostics
            .iter()
            .fold(Self::default(), |mut acc, d| {
                match d.severity {
                    Severity::Error => acc.errors += 1,
                    Severity::Warning => acc.warnings += 1,
                    Severity::Info => acc.infos += 1,
                }
                acc
            })
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

pub struct Linter {
    config: LintConfig,
}

impl Linter {
    pub fn new(config: LintConfig) -> Self {
        Self { config }
    }

    /// Lint one manifest set
    pub fn lint(&self, set: &ManifestSet) -> Vec<Diagnostic> {
        let mut diagnostics = set.problems.clone();

        for file in &set.files {
            diagnostics.extend(
                file.errors
                    .iter()
                    .map(|e| Diagnostic::new(&file.path, e.line, e.rule, e.message.clone())),
            );

            for entry in &file.entries {
                match entry {
                    Entry::Requirement(req) => {
                        diagnostics.extend(self.check_requirement(req, file.is_constraint))
                    }
                    Entry::Direct { target, line } if self.config.forbid_direct_references => {
                        diagnostics.push(Diagnostic::new(
                            &file.path,
                            *line,
                            RuleCode::DirectReference,
                            format!("direct reference '{}'", target),
                        ))
                    }
                    _ => {}
                }
            }
        }

        let requirements: Vec<&Requirement> = set.requirements().collect();
        let constraints: Vec<&Requirement> = set.constraints().collect();
        diagnostics.extend(check_duplicates(&requirements));
        diagnostics.extend(check_constraints(&requirements, &constraints));

        self.finish(diagnostics)
    }

    /// Lint several sets, reporting findings in shared files once
    pub fn lint_all(&self, sets: &[ManifestSet]) -> Vec<Diagnostic> {
        let diagnostics = sets.iter().flat_map(|set| self.lint(set)).collect();
        self.finish(diagnostics)
    }

    fn check_requirement(&self, req: &Requirement, is_constraint: bool) -> Vec<Diagnostic> {
        let mut found = Vec::new();
        let path = &req.source.path;
        let line = req.source.line;

        if !req.specifiers.is_satisfiable() {
            found.push(Diagnostic::new(
                path,
                line,
                RuleCode::Unsatisfiable,
                format!(
                    "'{}' constraint '{}' admits no version",
                    req.name,
                    req.constraint()
                ),
            ));
        }

        if req.is_direct_reference() {
            if self.config.forbid_direct_references {
                found.push(Diagnostic::new(
                    path,
                    line,
                    RuleCode::DirectReference,
                    format!("'{}' is a direct reference", req.name),
                ));
            }
        } else if self.config.require_pins && !is_constraint && !req.is_pinned() {
            found.push(Diagnostic::new(
                path,
                line,
                RuleCode::Unpinned,
                format!("'{}' is not pinned with ==", req.name),
            ));
        }

        found
    }

    fn finish(&self, mut diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
        if self.config.warnings_as_errors {
            for d in &mut diagnostics {
                if d.severity == Severity::Warning {
                    d.severity = Severity::Error;
                }
            }
        }
        diagnostics.sort_by(|a, b| {
            (&a.path, a.line, a.rule.code(), &a.message)
                .cmp(&(&b.path, b.line, b.rule.code(), &b.message))
        });
        diagnostics.dedup();
        diagnostics
    }
}

/// Comparison key for a declaration's constraint
fn constraint_key(req: &Requirement) -> Vec<String> {
    match req.url {
        Some(ref url) => vec![format!("@{}", url)],
        None => req.specifiers.canonical_keys(),
    }
}

fn describe(req: &Requirement) -> String {
    match req.url {
        Some(ref url) => format!("@ {}", url),
        None if req.specifiers.is_empty() => "(any version)".to_string(),
        None => req.constraint(),
    }
}

fn group_by_name<'a>(reqs: &[&'a Requirement]) -> HashMap<&'a str, Vec<&'a Requirement>> {
    let mut groups: HashMap<&str, Vec<&Requirement>> = HashMap::new();
    for req in reqs {
        groups.entry(req.name.normalized.as_str()).or_default().push(req);
    }
    groups
}

fn check_duplicates(requirements: &[&Requirement]) -> Vec<Diagnostic> {
    let mut found = Vec::new();

    for group in group_by_name(requirements).values() {
        for (i, later) in group.iter().enumerate().skip(1) {
            let Some(first) = group[..i].iter().find(|r| r.markers_overlap(later)) else {
                continue;
            };

            let diagnostic = if constraint_key(first) == constraint_key(later) {
                Diagnostic::new(
                    &later.source.path,
                    later.source.line,
                    RuleCode::Duplicate,
                    format!("'{}' is already declared at {}", later.name, first.source),
                )
            } else {
                Diagnostic::new(
                    &later.source.path,
                    later.source.line,
                    RuleCode::ConflictingDuplicate,
                    format!(
                        "'{}' declared as '{}' conflicts with '{}' at {}",
                        later.name,
                        describe(later),
                        describe(first),
                        first.source
                    ),
                )
            };
            found.push(diagnostic);
        }
    }

    found
}

fn check_constraints(requirements: &[&Requirement], constraints: &[&Requirement]) -> Vec<Diagnostic> {
    let by_name = group_by_name(constraints);
    let mut found = Vec::new();

    for req in requirements {
        if !req.specifiers.is_satisfiable() {
            continue;
        }
        let Some(matching) = by_name.get(req.name.normalized.as_str()) else {
            continue;
        };
        for constraint in matching {
            if !constraint.markers_overlap(req) || !constraint.specifiers.is_satisfiable() {
                continue;
            }
            if !req.specifiers.intersect(&constraint.specifiers).is_satisfiable() {
                found.push(Diagnostic::new(
                    &req.source.path,
                    req.source.line,
                    RuleCode::ConstraintConflict,
                    format!(
                        "'{}{}' cannot satisfy constraint '{}' at {}",
                        req.name,
                        req.constraint(),
                        constraint.constraint(),
                        constraint.source
                    ),
                ));
            }
        }
    }

    found
}
