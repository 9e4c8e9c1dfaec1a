//! Update filter configuration
//!
//! This module provides the UpdateFilter struct that encapsulates
//! all filter options for update judgment. Package names compare in
//! normalized form, so `--exclude Flask_Login` matches `flask-login`.

use crate::domain::normalize;
use std::time::Duration;

/// Filter configuration for update judgment
#[derive(Debug, Clone, Default)]
pub struct UpdateFilter {
    /// Packages to exclude from updates (normalized)
    pub exclude: Vec<String>,
    /// If non-empty, only update these packages (normalized)
    pub only: Vec<String>,
    /// Include pinned versions in updates
    pub include_pinned: bool,
    /// Minimum age for versions to be considered
    pub min_age: Option<Duration>,
}

impl UpdateFilter {
    /// Create a new UpdateFilter with default settings (process all)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set packages to exclude
    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude.iter().map(|n| normalize(n)).collect();
        self
    }

    /// Set packages to include (only list)
    pub fn with_only(mut self, only: Vec<String>) -> Self {
        self.only = only.iter().map(|n| normalize(n)).collect();
        self
    }

    /// Set whether to include pinned versions
    pub fn with_include_pinned(mut self, include: bool) -> Self {
        self.include_pinned = include;
        self
    }

    /// Set minimum age for versions
    pub fn with_min_age(mut self, age: Duration) -> Self {
        self.min_age = Some(age);
        self
    }

    /// Check if a package should be processed based on filters
    pub fn should_process_package(&self, name: &str) -> bool {
        let name = normalize(name);
        // --only takes precedence over --exclude
        if !self.only.is_empty() {
            return self.only.contains(&name);
        }
        !self.exclude.contains(&name)
    }
}
