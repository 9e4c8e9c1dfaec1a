//! Version specifiers and specifier sets
//!
//! Handles PEP 440 clauses:
//! - Exact: `==1.2.3`, wildcard `==1.2.*`
//! - Exclusion: `!=1.2.3`, `!=1.2.*`
//! - Compatible release: `~=1.2`
//! - Ordered comparison: `>=1.0`, `>1.0`, `<=2.0`, `<2.0`
//! - Arbitrary equality: `===foobar`
//! - Comma-separated sets: `>=1.0,<2.0`

use super::version::Version;
use crate::error::SpecifierError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Comparison operator of a single clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    ArbitraryEqual,
    Compatible,
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Less,
    Greater,
}

impl Operator {
    /// Operators ordered so that longer tokens are tried first
    const ALL: [Operator; 8] = [
        Operator::ArbitraryEqual,
        Operator::Compatible,
        Operator::Equal,
        Operator::NotEqual,
        Operator::LessEqual,
        Operator::GreaterEqual,
        Operator::Less,
        Operator::Greater,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::ArbitraryEqual => "===",
            Operator::Compatible => "~=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::Greater => ">",
        }
    }

    /// Split a leading operator token off `text`
    pub fn split_prefix(text: &str) -> Option<(Operator, &str)> {
        Operator::ALL
            .iter()
            .find_map(|op| text.strip_prefix(op.as_str()).map(|rest| (*op, rest)))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `<op><version>` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub op: Operator,
    /// Version text after the operator, without a trailing `.*`
    pub version_text: String,
    /// Whether the clause ends in `.*`
    pub wildcard: bool,
    /// Parsed version (None only for `===` with a non-PEP 440 token)
    pub version: Option<Version>,
    /// The clause exactly as written in the manifest
    pub raw: String,
}

impl Specifier {
    /// Parse one clause such as `>= 1.0` or `==2.*`
    pub fn parse(text: &str) -> Result<Self, SpecifierError> {
        let raw = text.trim();
        let (op, rest) =
            Operator::split_prefix(raw).ok_or_else(|| SpecifierError::missing_operator(raw))?;
        let rest = rest.trim();

        if rest.is_empty() || rest.contains(char::is_whitespace) {
            return Err(SpecifierError::invalid_version(raw));
        }

        if op == Operator::ArbitraryEqual {
            return Ok(Self {
                op,
                version_text: rest.to_string(),
                wildcard: false,
                version: Version::parse(rest),
                raw: raw.to_string(),
            });
        }

        let (base, wildcard) = match rest.strip_suffix(".*") {
            Some(base) => (base, true),
            None => (rest, false),
        };

        if wildcard && !matches!(op, Operator::Equal | Operator::NotEqual) {
            return Err(SpecifierError::WildcardNotAllowed {
                text: raw.to_string(),
            });
        }

        let version = Version::parse(base).ok_or_else(|| SpecifierError::invalid_version(raw))?;

        if wildcard && (version.is_prerelease() || version.is_postrelease() || version.local.is_some())
        {
            return Err(SpecifierError::invalid_version(raw));
        }

        if version.local.is_some() && !matches!(op, Operator::Equal | Operator::NotEqual) {
            return Err(SpecifierError::LocalNotAllowed {
                text: raw.to_string(),
            });
        }

        if op == Operator::Compatible && version.release.len() < 2 {
            return Err(SpecifierError::CompatibleTooShort {
                text: raw.to_string(),
            });
        }

        Ok(Self {
            op,
            version_text: base.to_string(),
            wildcard,
            version: Some(version),
            raw: raw.to_string(),
        })
    }

    /// Build a clause from components
    pub fn new(op: Operator, version: Version) -> Self {
        let text = version.to_string();
        Self {
            op,
            raw: format!("{}{}", op, text),
            version_text: text,
            wildcard: false,
            version: Some(version),
        }
    }

    /// Returns true if `candidate` satisfies this clause
    pub fn contains(&self, candidate: &Version) -> bool {
        let spec = match (&self.version, self.op) {
            (_, Operator::ArbitraryEqual) => {
                return candidate.to_string().eq_ignore_ascii_case(&self.version_text)
            }
            (Some(v), _) => v,
            (None, _) => return false,
        };

        match self.op {
            Operator::Equal => self.equals(spec, candidate),
            Operator::NotEqual => !self.equals(spec, candidate),
            Operator::LessEqual => candidate.without_local() <= *spec,
            Operator::GreaterEqual => candidate.without_local() >= *spec,
            Operator::Less => {
                let c = candidate.without_local();
                c < *spec && !(c.is_prerelease() && !spec.is_prerelease() && c.same_release(spec))
            }
            Operator::Greater => {
                let c = candidate.without_local();
                c > *spec
                    && !(c.is_postrelease() && !spec.is_postrelease() && c.same_release(spec))
            }
            Operator::Compatible => {
                let prefix = &spec.release[..spec.release.len().saturating_sub(1)];
                candidate.without_local() >= *spec && prefix_matches(spec.epoch, prefix, candidate)
            }
            Operator::ArbitraryEqual => false,
        }
    }

    fn equals(&self, spec: &Version, candidate: &Version) -> bool {
        if self.wildcard {
            prefix_matches(spec.epoch, &spec.release, candidate)
        } else if spec.local.is_none() {
            candidate.without_local() == *spec
        } else {
            candidate == spec
        }
    }

    /// Returns true for `==X` (no wildcard) and `===X`
    pub fn is_exact(&self) -> bool {
        matches!(self.op, Operator::ArbitraryEqual)
            || (self.op == Operator::Equal && !self.wildcard)
    }

    /// Key used to decide whether two clauses say the same thing
    pub fn canonical_key(&self) -> String {
        match (&self.version, self.op) {
            (_, Operator::ArbitraryEqual) => {
                format!("{}{}", self.op, self.version_text.to_ascii_lowercase())
            }
            (Some(v), Operator::Compatible) => format!("{}{}", self.op, v),
            (Some(v), _) if self.wildcard => format!("{}{}.*", self.op, v),
            (Some(v), _) => {
                let mut trimmed = v.clone();
                while trimmed.release.len() > 1 && trimmed.release.last() == Some(&0) {
                    trimmed.release.pop();
                }
                format!("{}{}", self.op, trimmed)
            }
            (None, _) => self.to_string(),
        }
    }
}

fn prefix_matches(epoch: u64, prefix: &[u64], candidate: &Version) -> bool {
    candidate.epoch == epoch
        && prefix
            .iter()
            .enumerate()
            .all(|(i, seg)| candidate.segment(i) == *seg)
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version_text)?;
        if self.wildcard {
            f.write_str(".*")?;
        }
        Ok(())
    }
}

impl Serialize for Specifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Specifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Specifier::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Lower or upper end of a version interval
#[derive(Clone)]
struct Bound {
    version: Version,
    inclusive: bool,
}

impl Bound {
    fn new(version: Version, inclusive: bool) -> Self {
        Self { version, inclusive }
    }
}

fn tighten_lower(current: &mut Option<Bound>, candidate: Bound) {
    let replace = match current {
        None => true,
        Some(cur) => {
            candidate.version > cur.version
                || (candidate.version == cur.version && !candidate.inclusive)
        }
    };
    if replace {
        *current = Some(candidate);
    }
}

fn tighten_upper(current: &mut Option<Bound>, candidate: Bound) {
    let replace = match current {
        None => true,
        Some(cur) => {
            candidate.version < cur.version
                || (candidate.version == cur.version && !candidate.inclusive)
        }
    };
    if replace {
        *current = Some(candidate);
    }
}

/// Smallest version carrying the given release prefix
fn prefix_floor(epoch: u64, prefix: &[u64]) -> Version {
    let mut v = Version::from_release(epoch, prefix.to_vec());
    v.dev = Some(0);
    v
}

/// Smallest version past every version carrying the given release prefix
fn prefix_ceiling(epoch: u64, prefix: &[u64]) -> Version {
    let mut release = prefix.to_vec();
    if let Some(last) = release.last_mut() {
        *last += 1;
    }
    prefix_floor(epoch, &release)
}

/// A comma-separated list of clauses, all of which must hold
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecifierSet(pub Vec<Specifier>);

impl SpecifierSet {
    /// Parse a comma-separated clause list; an empty string is an empty set
    pub fn parse(text: &str) -> Result<Self, SpecifierError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let mut specs = Vec::new();
        for clause in trimmed.split(',') {
            if clause.trim().is_empty() {
                return Err(SpecifierError::EmptyClause {
                    text: trimmed.to_string(),
                });
            }
            specs.push(Specifier::parse(clause)?);
        }
        Ok(Self(specs))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Specifier> {
        self.0.iter()
    }

    /// Returns true if `candidate` satisfies every clause
    pub fn contains(&self, candidate: &Version) -> bool {
        self.0.iter().all(|s| s.contains(candidate))
    }

    /// A single exact clause
    pub fn is_pinned(&self) -> bool {
        self.0.len() == 1 && self.0[0].is_exact()
    }

    /// Combine two sets into one that requires both
    pub fn intersect(&self, other: &SpecifierSet) -> SpecifierSet {
        let mut specs = self.0.clone();
        specs.extend(other.0.iter().cloned());
        SpecifierSet(specs)
    }

    /// Sorted clause keys; equal keys mean equivalent sets
    pub fn canonical_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.0.iter().map(Specifier::canonical_key).collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Index of the clause an update rewrites
    pub fn anchor_index(&self) -> Option<usize> {
        self.0.iter().position(|s| match s.op {
            Operator::Equal => !s.wildcard,
            Operator::GreaterEqual | Operator::Compatible => true,
            Operator::ArbitraryEqual => s.version.is_some(),
            _ => false,
        })
    }

    /// Copy of this set with the clause at `index` replaced
    pub fn with_replaced(&self, index: usize, spec: Specifier) -> SpecifierSet {
        let mut specs = self.0.clone();
        if let Some(slot) = specs.get_mut(index) {
            *slot = spec;
        }
        SpecifierSet(specs)
    }

    /// Returns false when interval analysis proves that no version matches
    pub fn is_satisfiable(&self) -> bool {
        let mut lower: Option<Bound> = None;
        let mut upper: Option<Bound> = None;
        let mut arbitrary: Option<String> = None;
        // Exact pins keep their local label; the bounds drop it
        let mut exact: Vec<&Version> = Vec::new();

        for spec in &self.0 {
            if spec.op == Operator::ArbitraryEqual {
                let text = spec.version_text.to_ascii_lowercase();
                match arbitrary {
                    Some(ref seen) if *seen != text => return false,
                    _ => arbitrary = Some(text),
                }
            }

            let Some(ref v) = spec.version else {
                continue;
            };

            match spec.op {
                Operator::GreaterEqual => tighten_lower(&mut lower, Bound::new(v.clone(), true)),
                Operator::Greater => tighten_lower(&mut lower, Bound::new(v.clone(), false)),
                Operator::LessEqual => tighten_upper(&mut upper, Bound::new(v.clone(), true)),
                Operator::Less => tighten_upper(&mut upper, Bound::new(v.clone(), false)),
                Operator::Equal | Operator::ArbitraryEqual if spec.wildcard => {
                    tighten_lower(&mut lower, Bound::new(prefix_floor(v.epoch, &v.release), true));
                    tighten_upper(
                        &mut upper,
                        Bound::new(prefix_ceiling(v.epoch, &v.release), false),
                    );
                }
                Operator::Equal | Operator::ArbitraryEqual => {
                    exact.push(v);
                    let release = v.without_local();
                    tighten_lower(&mut lower, Bound::new(release.clone(), true));
                    tighten_upper(&mut upper, Bound::new(release, true));
                }
                Operator::Compatible => {
                    tighten_lower(&mut lower, Bound::new(v.clone(), true));
                    let prefix = &v.release[..v.release.len().saturating_sub(1)];
                    tighten_upper(&mut upper, Bound::new(prefix_ceiling(v.epoch, prefix), false));
                }
                Operator::NotEqual => {}
            }
        }

        match (lower, upper) {
            (Some(lo), Some(hi)) => {
                if lo.version > hi.version {
                    false
                } else if lo.version == hi.version {
                    lo.inclusive
                        && hi.inclusive
                        && (self.contains(&lo.version)
                            || exact.iter().any(|candidate| self.contains(candidate)))
                } else {
                    true
                }
            }
            _ => true,
        }
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}

impl Serialize for SpecifierSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SpecifierSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SpecifierSet::parse(&raw).map_err(serde::de::Error::custom)
    }
}
