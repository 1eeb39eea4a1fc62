// ABOUTME: Dotted server version parsing and comparison.
// ABOUTME: Versions compare segment-wise after zero-padding to equal length.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionCompareError {
    #[error("version string is empty")]
    Empty,

    #[error("invalid version segment '{segment}' in '{version}'")]
    InvalidSegment { version: String, segment: String },
}

/// A four-part server build version, e.g. `1.21.113.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
}

impl ServerVersion {
    pub const fn new(major: u32, minor: u32, patch: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }

    /// Parse a strict `major.minor.patch.build` string.
    pub fn parse(value: &str) -> Result<Self, VersionCompareError> {
        let segments = parse_segments(value)?;
        match segments.as_slice() {
            [major, minor, patch, build] => Ok(Self::new(*major, *minor, *patch, *build)),
            _ => Err(VersionCompareError::InvalidSegment {
                version: value.to_string(),
                segment: format!("expected 4 segments, found {}", segments.len()),
            }),
        }
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

impl FromStr for ServerVersion {
    type Err = VersionCompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ServerVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServerVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn parse_segments(value: &str) -> Result<Vec<u32>, VersionCompareError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(VersionCompareError::Empty);
    }

    trimmed
        .split('.')
        .map(|segment| {
            segment
                .parse::<u32>()
                .map_err(|_| VersionCompareError::InvalidSegment {
                    version: value.to_string(),
                    segment: segment.to_string(),
                })
        })
        .collect()
}

/// Compare two dotted version strings of any length.
///
/// The shorter version is padded with zeros, so `1.2` equals `1.2.0`.
pub fn try_compare_versions(a: &str, b: &str) -> Result<Ordering, VersionCompareError> {
    let mut left = parse_segments(a)?;
    let mut right = parse_segments(b)?;

    let len = left.len().max(right.len());
    left.resize(len, 0);
    right.resize(len, 0);

    Ok(left.cmp(&right))
}

/// Compare two dotted version strings, treating malformed input as equal.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match try_compare_versions(a, b) {
        Ok(ordering) => ordering,
        Err(e) => {
            tracing::warn!("version comparison failed ({a} vs {b}): {e}");
            Ordering::Equal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_padding_makes_short_versions_equal() {
        assert_eq!(compare_versions("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.2.0.0", "1.2"), Ordering::Equal);
    }

    #[test]
    fn segments_compare_numerically() {
        assert_eq!(compare_versions("1.21.113.1", "1.21.90.3"), Ordering::Greater);
        assert_eq!(compare_versions("1.9", "1.10"), Ordering::Less);
    }

    #[test]
    fn malformed_versions_compare_equal() {
        assert_eq!(compare_versions("1.x.3", "1.2.3"), Ordering::Equal);
        assert_eq!(compare_versions("", "1.2.3"), Ordering::Equal);
        assert!(try_compare_versions("1.x.3", "1.2.3").is_err());
    }

    #[test]
    fn parse_requires_four_segments() {
        let version = ServerVersion::parse("1.21.113.1").unwrap();
        assert_eq!(version, ServerVersion::new(1, 21, 113, 1));
        assert_eq!(version.to_string(), "1.21.113.1");
        assert!(ServerVersion::parse("1.21.113").is_err());
        assert!(ServerVersion::parse("1.21.-1.0").is_err());
    }
}
