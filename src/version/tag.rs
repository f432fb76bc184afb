//! Release version numbers parsed from git tags.
//!
//! A release tag is an optional leading `v` followed by dot-separated groups
//! of digits (`v2.4.0`, `10.1`, `3`). Anything else (`nightly`, `v1.2-rc1`,
//! `1..2`) is not a release and is ignored by the resolver.
//!
//! Versions of different length compare as if the shorter one were padded
//! with zeros, so `1.2` and `1.2.0` are equal and `1.2.0.1` is newer than
//! `1.2`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static RELEASE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)*$").expect("release tag pattern is valid"));

/// Ordered tuple of non-negative integers, e.g. `2.4.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionTag {
    parts: Vec<u64>,
}

impl VersionTag {
    /// Parse a tag name, returning `None` when it is not a release tag.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let trimmed = tag.trim();
        let digits = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if !RELEASE_TAG.is_match(digits) {
            return None;
        }

        let parts = digits.split('.').map(str::parse::<u64>).collect::<Result<Vec<_>, _>>().ok()?;
        Some(Self {
            parts,
        })
    }

    /// Build a version directly from its components.
    ///
    /// An empty slice is treated as `0`.
    #[must_use]
    pub fn from_parts(parts: &[u64]) -> Self {
        let parts = if parts.is_empty() { vec![0] } else { parts.to_vec() };
        Self {
            parts,
        }
    }

    #[must_use]
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    /// Whether `self` is strictly newer than `current`.
    #[must_use]
    pub fn is_newer_than(&self, current: &Self) -> bool {
        self > current
    }
}

/// Highest release version among `tags`, ignoring non-release names.
pub fn latest_version<I, S>(tags: I) -> Option<VersionTag>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter().filter_map(|t| VersionTag::parse(t.as_ref())).max()
}

impl Ord for VersionTag {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                non_eq => return non_eq,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for VersionTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionTag {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionTag {}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.parts.iter().map(u64::to_string).collect();
        f.write_str(&rendered.join("."))
    }
}

impl FromStr for VersionTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("'{s}' is not a release version"))
    }
}

impl TryFrom<String> for VersionTag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionTag> for String {
    fn from(value: VersionTag) -> Self {
        value.to_string()
    }
}
