//! Update judgment logic for requirements
//!
//! This module provides:
//! - Update filter configuration from CLI args and config
//! - Release info from the package index with upload date
//! - Update judgment engine that decides whether to rewrite or skip

mod filter;
mod version_info;

pub use filter::UpdateFilter;
pub use version_info::VersionInfo;

use crate::domain::{Operator, Requirement, SkipReason, Specifier, UpdateResult, Version};
use chrono::{DateTime, Utc};

/// Update judgment engine that decides whether to update a requirement
pub struct UpdateJudge {
    /// Filter configuration
    filter: UpdateFilter,
    /// Current time for age calculations
    now: DateTime<Utc>,
}

impl UpdateJudge {
    /// Create a new UpdateJudge with the given filter
    pub fn new(filter: UpdateFilter) -> Self {
        Self {
            filter,
            now: Utc::now(),
        }
    }

    /// Create a new UpdateJudge with a custom current time (for testing)
    pub fn with_time(filter: UpdateFilter, now: DateTime<Utc>) -> Self {
        Self { filter, now }
    }

    /// Reasons that do not depend on index data
    ///
    /// Returns Some(SkipReason) if the requirement should be skipped without
    /// fetching anything.
    pub fn should_skip(&self, requirement: &Requirement) -> Option<SkipReason> {
        if !self.filter.should_process_package(&requirement.name.raw) {
            if !self.filter.only.is_empty() {
                return Some(SkipReason::NotInOnlyList);
            } else {
                return Some(SkipReason::Excluded);
            }
        }

        if requirement.is_pinned() && !self.filter.include_pinned {
            return Some(SkipReason::Pinned);
        }

        if requirement.is_direct_reference() {
            return Some(SkipReason::DirectReference);
        }

        if requirement.specifiers.is_empty() {
            return Some(SkipReason::Unconstrained);
        }

        if requirement.specifiers.anchor_index().is_none() {
            return Some(SkipReason::NoAnchor);
        }

        None
    }

    /// Oldest release time still eligible under the age filter
    fn cutoff(&self) -> Option<DateTime<Utc>> {
        let min_age = self.filter.min_age?;
        let cutoff = chrono::Duration::from_std(min_age)
            .ok()
            .and_then(|age| self.now.checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Some(cutoff)
    }

    /// Judge whether to update a requirement given available releases
    pub fn judge(&self, requirement: &Requirement, available: &[VersionInfo]) -> UpdateResult {
        if let Some(reason) = self.should_skip(requirement) {
            return UpdateResult::skip(requirement.clone(), reason);
        }

        let specifiers = &requirement.specifiers;
        let Some((index, anchor, current)) = specifiers.anchor_index().and_then(|i| {
            let anchor = specifiers.0.get(i)?;
            Some((i, anchor, anchor.version.clone()?))
        }) else {
            return UpdateResult::skip(requirement.clone(), SkipReason::NoAnchor);
        };

        // Pre-releases only when the anchor itself names one
        let allow_pre = current.is_prerelease();
        let cutoff = self.cutoff();
        let latest = available
            .iter()
            .filter(|v| allow_pre || !v.is_prerelease())
            .filter(|v| cutoff.map_or(true, |c| v.released_before(c)))
            .max();

        let Some(latest) = latest else {
            return UpdateResult::skip(requirement.clone(), SkipReason::NoSuitableVersion);
        };

        if current >= latest.version {
            return UpdateResult::skip_already_latest(requirement.clone());
        }

        let target = anchor_version(anchor, &current, &latest.version);
        if target <= current {
            return UpdateResult::skip_already_latest(requirement.clone());
        }

        let new_anchor = Specifier::new(anchor.op, target);
        let rewritten = specifiers.with_replaced(index, new_anchor.clone());
        if !rewritten.contains(&latest.version) {
            return UpdateResult::skip(
                requirement.clone(),
                SkipReason::ConstraintBlocked(latest.version.to_string()),
            );
        }

        UpdateResult::update(
            requirement.clone(),
            index,
            new_anchor,
            Some(latest.released_at),
        )
    }
}

/// The version a rewritten anchor names
///
/// `~=` keeps as many release segments as it had, so `~=1.4` moves to
/// `~=2.3` rather than `~=2.3.1`.
fn anchor_version(anchor: &Specifier, current: &Version, latest: &Version) -> Version {
    let latest = latest.without_local();
    if anchor.op != Operator::Compatible || latest.release.len() == current.release.len() {
        return latest;
    }
    let segments = (0..current.release.len())
        .map(|i| latest.segment(i))
        .collect();
    Version::from_release(latest.epoch, segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PackageName, SourceLocation, SpecifierSet};
    use chrono::TimeZone;
    use std::time::Duration;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn requirement(name: &str, spec: &str) -> Requirement {
        Requirement::new(
            PackageName::parse(name).unwrap(),
            SpecifierSet::parse(spec).unwrap(),
            SourceLocation::new("requirements.txt", 1, 1),
        )
    }

    fn release(version: &str, days_ago: i64) -> VersionInfo {
        VersionInfo::parse(version, fixed_time() - chrono::Duration::days(days_ago)).unwrap()
    }

    fn judge() -> UpdateJudge {
        UpdateJudge::with_time(UpdateFilter::new(), fixed_time())
    }

    fn skip_reason(result: UpdateResult) -> SkipReason {
        match result {
            UpdateResult::Skip { reason, .. } => reason,
            other => panic!("expected skip, got {}", other),
        }
    }

    fn new_constraint(result: UpdateResult) -> String {
        match result {
            UpdateResult::Update { new_constraint, .. } => new_constraint.to_string(),
            other => panic!("expected update, got {}", other),
        }
    }

    fn releases() -> Vec<VersionInfo> {
        vec![
            release("2023.3", 300),
            release("2024.1", 120),
            release("2024.2", 10),
            release("2025.1rc1", 2),
        ]
    }

    #[test]
    fn test_judge_simple_update() {
        let result = judge().judge(&requirement("pytz", ">=2024.1"), &releases());
        assert!(result.is_update());
        if let UpdateResult::Update {
            new_version,
            released_at,
            ..
        } = &result
        {
            assert_eq!(new_version, "2024.2");
            assert_eq!(*released_at, Some(fixed_time() - chrono::Duration::days(10)));
        }
        assert_eq!(new_constraint(result), ">=2024.2");
    }

    #[test]
    fn test_judge_already_latest() {
        let result = judge().judge(&requirement("pytz", ">=2024.2"), &releases());
        assert_eq!(skip_reason(result), SkipReason::AlreadyLatest);
    }

    #[test]
    fn test_judge_never_downgrades() {
        let result = judge().judge(&requirement("pytz", ">=2030.1"), &releases());
        assert_eq!(skip_reason(result), SkipReason::AlreadyLatest);
    }

    #[test]
    fn test_judge_skip_pinned() {
        let result = judge().judge(&requirement("pytz", "==2024.1"), &releases());
        assert_eq!(skip_reason(result), SkipReason::Pinned);
    }

    #[test]
    fn test_judge_include_pinned() {
        let judge = UpdateJudge::with_time(UpdateFilter::new().with_include_pinned(true), fixed_time());
        let result = judge.judge(&requirement("pytz", "==2024.1"), &releases());
        assert_eq!(new_constraint(result), "==2024.2");
    }

    #[test]
    fn test_judge_exclude_and_only() {
        let excluded = UpdateJudge::with_time(
            UpdateFilter::new().with_exclude(vec!["PYTZ".to_string()]),
            fixed_time(),
        );
        let result = excluded.judge(&requirement("pytz", ">=2024.1"), &releases());
        assert_eq!(skip_reason(result), SkipReason::Excluded);

        let only = UpdateJudge::with_time(
            UpdateFilter::new().with_only(vec!["requests".to_string()]),
            fixed_time(),
        );
        let result = only.judge(&requirement("pytz", ">=2024.1"), &releases());
        assert_eq!(skip_reason(result), SkipReason::NotInOnlyList);
    }

    #[test]
    fn test_judge_direct_reference_and_unconstrained() {
        let mut direct = requirement("mylib", "");
        direct.url = Some("https://example.com/mylib.zip".to_string());
        assert_eq!(
            skip_reason(judge().judge(&direct, &releases())),
            SkipReason::DirectReference
        );
        assert_eq!(
            skip_reason(judge().judge(&requirement("pytz", ""), &releases())),
            SkipReason::Unconstrained
        );
    }

    #[test]
    fn test_judge_no_anchor() {
        let result = judge().judge(&requirement("pytz", "<2025,!=2024.1"), &releases());
        assert_eq!(skip_reason(result), SkipReason::NoAnchor);
    }

    #[test]
    fn test_judge_prerelease_only_when_anchor_is_prerelease() {
        let result = judge().judge(&requirement("pytz", ">=2024.2rc1"), &releases());
        assert_eq!(new_constraint(result), ">=2025.1rc1");
    }

    #[test]
    fn test_judge_min_age() {
        let judge = UpdateJudge::with_time(
            UpdateFilter::new().with_min_age(Duration::from_secs(30 * 86400)),
            fixed_time(),
        );
        let result = judge.judge(&requirement("pytz", ">=2023.3"), &releases());
        assert_eq!(new_constraint(result), ">=2024.1");
    }

    #[test]
    fn test_judge_no_suitable_version() {
        let judge = UpdateJudge::with_time(
            UpdateFilter::new().with_min_age(Duration::from_secs(1000 * 86400)),
            fixed_time(),
        );
        let result = judge.judge(&requirement("pytz", ">=2023.3"), &releases());
        assert_eq!(skip_reason(result), SkipReason::NoSuitableVersion);

        let result = judge.judge(&requirement("pytz", ">=2023.3"), &[]);
        assert_eq!(skip_reason(result), SkipReason::NoSuitableVersion);
    }

    #[test]
    fn test_judge_keeps_other_clauses() {
        let versions = vec![release("2.28.0", 100), release("2.32.3", 10)];
        let result = judge().judge(&requirement("requests", ">=2.28.0,<3,!=2.29.0"), &versions);
        assert_eq!(new_constraint(result), ">=2.32.3,<3,!=2.29.0");
    }

    #[test]
    fn test_judge_upper_bound_blocks() {
        let versions = vec![release("2.31.0", 100), release("3.1", 10)];
        let result = judge().judge(&requirement("requests", ">=2.31.0,<3"), &versions);
        assert_eq!(
            skip_reason(result),
            SkipReason::ConstraintBlocked("3.1".to_string())
        );
    }

    #[test]
    fn test_judge_compatible_keeps_segment_count() {
        let versions = vec![release("1.4.2", 100), release("2.3.1", 10)];
        let result = judge().judge(&requirement("django", "~=1.4"), &versions);
        assert_eq!(new_constraint(result), "~=2.3");

        let result = judge().judge(&requirement("django", "~=1.4.2"), &versions);
        assert_eq!(new_constraint(result), "~=2.3.1");
    }

    #[test]
    fn test_judge_compatible_same_series_is_latest() {
        let versions = vec![release("1.4", 100), release("1.4.5", 10)];
        let result = judge().judge(&requirement("django", "~=1.4"), &versions);
        assert_eq!(skip_reason(result), SkipReason::AlreadyLatest);
    }

    #[test]
    fn test_anchor_version_pads_short_release() {
        let anchor = Specifier::parse("~=1.4.2").unwrap();
        let current = Version::parse("1.4.2").unwrap();
        let latest = Version::parse("3").unwrap();
        assert_eq!(anchor_version(&anchor, &current, &latest).to_string(), "3.0.0");
    }
}
