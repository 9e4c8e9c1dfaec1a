//! PEP 440 version parsing and ordering
//!
//! Handles the public version scheme:
//! - Epoch: `1!2.0`
//! - Release: `1.2.3`
//! - Pre-release: `1.0a1`, `1.0b2`, `1.0rc1` (and the spellings `alpha`, `beta`, `c`, `pre`, `preview`)
//! - Post-release: `1.0.post1`, `1.0-1`
//! - Development release: `1.0.dev3`
//! - Local label: `1.0+ubuntu.1`

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^v?",
        r"(?:(?P<epoch>\d+)!)?",
        r"(?P<release>\d+(?:\.\d+)*)",
        r"(?:[-_.]?(?P<pre_l>alpha|a|beta|b|preview|pre|c|rc)[-_.]?(?P<pre_n>\d+)?)?",
        r"(?:-(?P<post_n1>\d+)|[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n2>\d+)?)?",
        r"(?:[-_.]?(?P<dev_l>dev)[-_.]?(?P<dev_n>\d+)?)?",
        r"(?:\+(?P<local>[a-z0-9]+(?:[-_.][a-z0-9]+)*))?$",
    ))
    .unwrap()
});

/// Pre-release phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreKind {
    Alpha,
    Beta,
    Rc,
}

impl PreKind {
    fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "a" | "alpha" => PreKind::Alpha,
            "b" | "beta" => PreKind::Beta,
            _ => PreKind::Rc,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            PreKind::Alpha => "a",
            PreKind::Beta => "b",
            PreKind::Rc => "rc",
        }
    }
}

/// A parsed PEP 440 version
#[derive(Debug, Clone)]
pub struct Version {
    pub epoch: u64,
    pub release: Vec<u64>,
    pub pre: Option<(PreKind, u64)>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
    pub local: Option<String>,
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PreKind, u64),
    Final,
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum DevKey {
    Dev(u64),
    None,
}

impl Version {
    /// Parse a version string, returning None if it is not PEP 440 compliant
    pub fn parse(input: &str) -> Option<Self> {
        let caps = VERSION_RE.captures(input.trim())?;

        let epoch = match caps.name("epoch") {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };

        let release = caps
            .name("release")?
            .as_str()
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;

        let pre = match caps.name("pre_l") {
            Some(label) => {
                let n = match caps.name("pre_n") {
                    Some(m) => m.as_str().parse().ok()?,
                    None => 0,
                };
                Some((PreKind::from_label(label.as_str()), n))
            }
            None => None,
        };

        let post = if let Some(m) = caps.name("post_n1") {
            Some(m.as_str().parse().ok()?)
        } else if caps.name("post_l").is_some() {
            match caps.name("post_n2") {
                Some(m) => Some(m.as_str().parse().ok()?),
                None => Some(0),
            }
        } else {
            None
        };

        let dev = if caps.name("dev_l").is_some() {
            match caps.name("dev_n") {
                Some(m) => Some(m.as_str().parse().ok()?),
                None => Some(0),
            }
        } else {
            None
        };

        let local = caps
            .name("local")
            .map(|m| m.as_str().to_ascii_lowercase().replace(['-', '_'], "."));

        Some(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    /// Build a final release version from its segments
    pub fn from_release(epoch: u64, release: Vec<u64>) -> Self {
        Self {
            epoch,
            release,
            pre: None,
            post: None,
            dev: None,
            local: None,
        }
    }

    /// Returns true for pre-releases and development releases
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// Returns true for post-releases
    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    /// Release segment at `index`, treating missing segments as zero
    pub fn segment(&self, index: usize) -> u64 {
        self.release.get(index).copied().unwrap_or(0)
    }

    /// Returns true if epoch and release (ignoring trailing zeros) match
    pub fn same_release(&self, other: &Version) -> bool {
        self.epoch == other.epoch && compare_release(&self.release, &other.release).is_eq()
    }

    /// Drop the local label
    pub fn without_local(&self) -> Version {
        Version {
            local: None,
            ..self.clone()
        }
    }

    fn pre_key(&self) -> PreKey {
        match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => PreKey::DevOnly,
            (Some((kind, n)), _, _) => PreKey::Pre(kind, n),
            _ => PreKey::Final,
        }
    }

    fn dev_key(&self) -> DevKey {
        match self.dev {
            Some(n) => DevKey::Dev(n),
            None => DevKey::None,
        }
    }
}

/// Compare release segments with implicit trailing zeros
pub(crate) fn compare_release(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn compare_local(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let mut left = a.split('.');
            let mut right = b.split('.');
            loop {
                match (left.next(), right.next()) {
                    (None, None) => return Ordering::Equal,
                    (None, Some(_)) => return Ordering::Less,
                    (Some(_), None) => return Ordering::Greater,
                    (Some(x), Some(y)) => {
                        // numeric segments sort after alphanumeric ones
                        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                            (Ok(nx), Ok(ny)) => nx.cmp(&ny),
                            (Ok(_), Err(_)) => Ordering::Greater,
                            (Err(_), Ok(_)) => Ordering::Less,
                            (Err(_), Err(_)) => x.cmp(y),
                        };
                        if ord != Ordering::Equal {
                            return ord;
                        }
                    }
                }
            }
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_release(&self.release, &other.release))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
            .then_with(|| compare_local(&self.local, &other.local))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", release.join("."))?;
        if let Some((kind, n)) = self.pre {
            write!(f, "{}{}", kind.as_str(), n)?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{}", n)?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{}", n)?;
        }
        if let Some(ref local) = self.local {
            write!(f, "+{}", local)?;
        }
        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid version '{}'", raw)))
    }
}
