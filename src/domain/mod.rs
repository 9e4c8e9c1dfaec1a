//! Core domain models for reqcheck
//!
//! This module contains the fundamental types used throughout the application:
//! - Package names and their normalized form
//! - PEP 440 versions and specifier sets
//! - Requirement declarations with their source location
//! - Lint diagnostics
//! - Update decision results and summaries

mod diagnostic;
mod name;
mod requirement;
mod specifier;
mod summary;
mod update_result;
mod version;

pub use diagnostic::{Diagnostic, RuleCode, Severity};
pub use name::{normalize, PackageName};
pub use requirement::{Declaration, Requirement, SourceLocation};
pub use specifier::{Operator, Specifier, SpecifierSet};
pub use summary::{ManifestUpdateResult, UpdateSummary};
pub use update_result::{SkipReason, UpdateResult};
pub use version::{PreKind, Version};
