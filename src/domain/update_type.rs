//! Semantic version update classification

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Semver parts extracted from a version string
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SemverParts {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemverParts {
    /// Extracts major/minor/patch from the numeric segments of `version`
    ///
    /// A leading `v` is ignored and missing parts default to zero. Returns
    /// None when no segment is numeric.
    pub fn parse(version: &str) -> Option<Self> {
        let version = version.trim();
        let version = version
            .strip_prefix('v')
            .or_else(|| version.strip_prefix('V'))
            .unwrap_or(version);

        let numbers: Vec<u64> = version
            .split(['.', '-', '+'])
            .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|s| s.parse().ok())
            .collect();

        if numbers.is_empty() {
            return None;
        }

        Some(Self {
            major: numbers[0],
            minor: numbers.get(1).copied().unwrap_or(0),
            patch: numbers.get(2).copied().unwrap_or(0),
        })
    }
}

/// Kind of version bump between two versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpdateType {
    Major,
    Minor,
    Patch,
}

impl UpdateType {
    /// Returns the short name used in group rules
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Major => "major",
            UpdateType::Minor => "minor",
            UpdateType::Patch => "patch",
        }
    }

    /// Returns the long form used by ignore conditions
    pub fn semver_label(&self) -> &'static str {
        match self {
            UpdateType::Major => "version-update:semver-major",
            UpdateType::Minor => "version-update:semver-minor",
            UpdateType::Patch => "version-update:semver-patch",
        }
    }

    /// Parses either the short or the `version-update:semver-*` form
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        let short = label
            .strip_prefix("version-update:semver-")
            .unwrap_or(&label);
        match short {
            "major" => Some(UpdateType::Major),
            "minor" => Some(UpdateType::Minor),
            "patch" => Some(UpdateType::Patch),
            _ => None,
        }
    }

    /// Classifies the move from `previous` to `current`
    ///
    /// Returns None when either version has no numeric segment or the
    /// versions do not differ in major, minor or patch.
    pub fn classify(previous: &str, current: &str) -> Option<Self> {
        let from = SemverParts::parse(previous)?;
        let to = SemverParts::parse(current)?;

        if to.major != from.major {
            Some(UpdateType::Major)
        } else if to.minor != from.minor {
            Some(UpdateType::Minor)
        } else if to.patch != from.patch {
            Some(UpdateType::Patch)
        } else {
            None
        }
    }

    /// Classifies only upgrades (a later major, minor or patch)
    pub fn classify_upgrade(current: &str, latest: &str) -> Option<Self> {
        let from = SemverParts::parse(current)?;
        let to = SemverParts::parse(latest)?;

        if to.major > from.major {
            Some(UpdateType::Major)
        } else if to.minor > from.minor {
            Some(UpdateType::Minor)
        } else if to.patch > from.patch {
            Some(UpdateType::Patch)
        } else {
            None
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for UpdateType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UpdateType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        UpdateType::from_label(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown update type '{}'", label)))
    }
}
