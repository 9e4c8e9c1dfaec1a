//! Package name validation and normalization
//!
//! Names follow PEP 508 (validity) and PEP 503 (normalization).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9]|[A-Za-z0-9][A-Za-z0-9._-]*[A-Za-z0-9])$").unwrap()
});
static SEPARATOR_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_.]+").unwrap());

/// A validated package name with its normalized form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageName {
    /// The name as written in the manifest
    pub raw: String,
    /// Lowercased name with separator runs collapsed to `-`
    pub normalized: String,
}

impl PackageName {
    /// Parse a package name, returning None if it is not a valid PEP 508 name
    pub fn parse(raw: &str) -> Option<Self> {
        if !NAME_RE.is_match(raw) {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            normalized: normalize(raw),
        })
    }

    /// Returns true if both names refer to the same package
    pub fn same_package(&self, other: &PackageName) -> bool {
        self.normalized == other.normalized
    }
}

/// Normalize a name the way package indexes compare them
pub fn normalize(name: &str) -> String {
    SEPARATOR_RUN_RE
        .replace_all(&name.to_ascii_lowercase(), "-")
        .into_owned()
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
