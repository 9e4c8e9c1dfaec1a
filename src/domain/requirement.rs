//! Requirement declarations parsed from a manifest

use super::{PackageName, Specifier, SpecifierSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where a declaration was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Manifest file path
    pub path: PathBuf,
    /// First physical line (1-based)
    pub line: usize,
    /// Last physical line when the declaration uses `\` continuations
    pub end_line: usize,
}

impl SourceLocation {
    pub fn new(path: impl Into<PathBuf>, line: usize, end_line: usize) -> Self {
        Self {
            path: path.into(),
            line,
            end_line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

/// A single `name [extras] constraint [; marker]` declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: PackageName,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    pub specifiers: SpecifierSet,
    /// Direct reference target for `name @ url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Environment marker after `;`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    /// `--hash=algo:digest` values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashes: Vec<String>,
    pub source: SourceLocation,
}

impl Requirement {
    /// Creates a requirement with no extras, marker or hashes
    pub fn new(name: PackageName, specifiers: SpecifierSet, source: SourceLocation) -> Self {
        Self {
            name,
            extras: Vec::new(),
            specifiers,
            url: None,
            marker: None,
            hashes: Vec::new(),
            source,
        }
    }

    /// Canonical constraint string, empty when unconstrained
    pub fn constraint(&self) -> String {
        self.specifiers.to_string()
    }

    /// The `{name, constraint}` pair
    pub fn declaration(&self) -> Declaration {
        Declaration {
            name: self.name.raw.clone(),
            constraint: self.constraint(),
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.specifiers.is_pinned()
    }

    pub fn is_direct_reference(&self) -> bool {
        self.url.is_some()
    }

    /// The clause `update` rewrites, if any
    pub fn anchor(&self) -> Option<&Specifier> {
        self.specifiers
            .anchor_index()
            .and_then(|i| self.specifiers.0.get(i))
    }

    /// Marker with whitespace collapsed, used to compare markers
    pub fn normalized_marker(&self) -> Option<String> {
        self.marker
            .as_ref()
            .map(|m| m.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Returns true if the two declarations can apply in the same environment
    pub fn markers_overlap(&self, other: &Requirement) -> bool {
        match (self.normalized_marker(), other.normalized_marker()) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        if let Some(ref url) = self.url {
            write!(f, " @ {}", url)?;
        } else {
            write!(f, "{}", self.specifiers)?;
        }
        if let Some(ref marker) = self.marker {
            write!(f, "; {}", marker)?;
        }
        Ok(())
    }
}

/// Package name and version constraint as written in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub constraint: String,
}
