//! Update decision result types

use super::{Requirement, Specifier, SpecifierSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason why a requirement update was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Constraint is an exact pin (`==` / `===`)
    Pinned,
    /// The anchor already names the latest eligible release
    AlreadyLatest,
    /// Package was excluded via --exclude
    Excluded,
    /// Package not in --only list
    NotInOnlyList,
    /// Failed to fetch version info from the index
    FetchFailed(String),
    /// No release passed the pre-release and age filters
    NoSuitableVersion,
    /// `name @ url` declaration
    DirectReference,
    /// No version constraint to rewrite
    Unconstrained,
    /// Only upper bounds or exclusions, nothing to move forward
    NoAnchor,
    /// An upper bound or exclusion rules out the latest release
    ConstraintBlocked(String),
}

impl SkipReason {
    /// Stable snake_case identifier
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::Pinned => "pinned",
            SkipReason::AlreadyLatest => "already_latest",
            SkipReason::Excluded => "excluded",
            SkipReason::NotInOnlyList => "not_in_only_list",
            SkipReason::FetchFailed(_) => "fetch_failed",
            SkipReason::NoSuitableVersion => "no_suitable_version",
            SkipReason::DirectReference => "direct_reference",
            SkipReason::Unconstrained => "unconstrained",
            SkipReason::NoAnchor => "no_anchor",
            SkipReason::ConstraintBlocked(_) => "constraint_blocked",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Pinned => write!(f, "pinned version"),
            SkipReason::AlreadyLatest => write!(f, "already at latest"),
            SkipReason::Excluded => write!(f, "excluded by --exclude"),
            SkipReason::NotInOnlyList => write!(f, "not in --only list"),
            SkipReason::FetchFailed(msg) => write!(f, "fetch failed: {}", msg),
            SkipReason::NoSuitableVersion => write!(f, "no suitable version"),
            SkipReason::DirectReference => write!(f, "direct reference"),
            SkipReason::Unconstrained => write!(f, "no version constraint"),
            SkipReason::NoAnchor => write!(f, "no lower bound to update"),
            SkipReason::ConstraintBlocked(latest) => {
                write!(f, "constraint excludes latest {}", latest)
            }
        }
    }
}

/// Result of an update decision for a single requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateResult {
    /// Requirement will be rewritten
    Update {
        requirement: Requirement,
        /// The release the anchor now names
        new_version: String,
        /// The clause that replaces the old anchor
        new_anchor: Specifier,
        /// The full constraint after the rewrite
        new_constraint: SpecifierSet,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        released_at: Option<DateTime<Utc>>,
    },
    /// Requirement update was skipped
    Skip {
        requirement: Requirement,
        reason: SkipReason,
    },
}

impl UpdateResult {
    /// Creates an Update result replacing the clause at `anchor`
    pub fn update(
        requirement: Requirement,
        anchor: usize,
        new_anchor: Specifier,
        released_at: Option<DateTime<Utc>>,
    ) -> Self {
        let new_constraint = requirement
            .specifiers
            .with_replaced(anchor, new_anchor.clone());
        UpdateResult::Update {
            new_version: new_anchor.version_text.clone(),
            requirement,
            new_anchor,
            new_constraint,
            released_at,
        }
    }

    /// Creates a Skip result
    pub fn skip(requirement: Requirement, reason: SkipReason) -> Self {
        UpdateResult::Skip {
            requirement,
            reason,
        }
    }

    pub fn skip_already_latest(requirement: Requirement) -> Self {
        Self::skip(requirement, SkipReason::AlreadyLatest)
    }

    /// Returns true if this is an update result
    pub fn is_update(&self) -> bool {
        matches!(self, UpdateResult::Update { .. })
    }

    /// Returns true if this is a skip result
    pub fn is_skip(&self) -> bool {
        matches!(self, UpdateResult::Skip { .. })
    }

    pub fn requirement(&self) -> &Requirement {
        match self {
            UpdateResult::Update { requirement, .. } => requirement,
            UpdateResult::Skip { requirement, .. } => requirement,
        }
    }

    pub fn package_name(&self) -> &str {
        &self.requirement().name.raw
    }
}

impl fmt::Display for UpdateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateResult::Update {
                requirement,
                new_constraint,
                ..
            } => write!(
                f,
                "{}: {} → {}",
                requirement.name,
                requirement.constraint(),
                new_constraint
            ),
            UpdateResult::Skip {
                requirement,
                reason,
            } => write!(f, "{}: skipped ({})", requirement.name, reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Operator, PackageName, SourceLocation, Version};

    fn sample_requirement() -> Requirement {
        Requirement::new(
            PackageName::parse("requests").unwrap(),
            SpecifierSet::parse(">=2.28.0,<3").unwrap(),
            SourceLocation::new("requirements.txt", 2, 2),
        )
    }

    fn bump() -> Specifier {
        Specifier::new(Operator::GreaterEqual, Version::parse("2.31.0").unwrap())
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(format!("{}", SkipReason::Pinned), "pinned version");
        assert_eq!(format!("{}", SkipReason::AlreadyLatest), "already at latest");
        assert_eq!(format!("{}", SkipReason::Excluded), "excluded by --exclude");
        assert_eq!(
            format!("{}", SkipReason::FetchFailed("timeout".to_string())),
            "fetch failed: timeout"
        );
        assert_eq!(
            format!("{}", SkipReason::ConstraintBlocked("3.1".to_string())),
            "constraint excludes latest 3.1"
        );
    }

    #[test]
    fn test_skip_reason_code_matches_serde() {
        for reason in [
            SkipReason::Pinned,
            SkipReason::NoAnchor,
            SkipReason::NotInOnlyList,
            SkipReason::DirectReference,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.code()));
        }
        assert_eq!(SkipReason::FetchFailed("x".to_string()).code(), "fetch_failed");
    }

    #[test]
    fn test_update_builds_new_constraint() {
        let result = UpdateResult::update(sample_requirement(), 0, bump(), None);
        assert!(result.is_update());
        if let UpdateResult::Update {
            new_version,
            new_constraint,
            ..
        } = &result
        {
            assert_eq!(new_version, "2.31.0");
            assert_eq!(new_constraint.to_string(), ">=2.31.0,<3");
        }
        assert_eq!(result.to_string(), "requests: >=2.28.0,<3 → >=2.31.0,<3");
    }

    #[test]
    fn test_skip() {
        let result = UpdateResult::skip(sample_requirement(), SkipReason::Pinned);
        assert!(result.is_skip());
        assert_eq!(result.package_name(), "requests");
        assert_eq!(result.to_string(), "requests: skipped (pinned version)");
    }

    #[test]
    fn test_serde_tagged() {
        let result = UpdateResult::skip_already_latest(sample_requirement());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "skip");
        assert_eq!(json["reason"], "already_latest");
    }
}
