//! Security advisories attached to a job

use crate::domain::{Dependency, Version, VersionRequirement};
use crate::error::JobError;
use serde::Deserialize;

/// Advisory as written in the job definition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct RawSecurityAdvisory {
    pub dependency_name: String,
    #[serde(default)]
    pub affected_versions: Vec<String>,
    #[serde(default)]
    pub patched_versions: Vec<String>,
    #[serde(default)]
    pub unaffected_versions: Vec<String>,
}

/// A vulnerability affecting some versions of one dependency
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityAdvisory {
    pub dependency_name: String,
    pub affected_versions: Vec<VersionRequirement>,
    pub patched_versions: Vec<VersionRequirement>,
    pub unaffected_versions: Vec<VersionRequirement>,
}

impl SecurityAdvisory {
    /// Creates an advisory from requirement strings
    pub fn new(
        dependency_name: impl Into<String>,
        affected_versions: &[&str],
        patched_versions: &[&str],
        unaffected_versions: &[&str],
    ) -> Result<Self, JobError> {
        Ok(Self {
            dependency_name: dependency_name.into(),
            affected_versions: parse_all(affected_versions.iter().copied())?,
            patched_versions: parse_all(patched_versions.iter().copied())?,
            unaffected_versions: parse_all(unaffected_versions.iter().copied())?,
        })
    }

    pub(crate) fn from_raw(raw: RawSecurityAdvisory) -> Result<Self, JobError> {
        Ok(Self {
            dependency_name: raw.dependency_name,
            affected_versions: parse_all(raw.affected_versions.iter().map(String::as_str))?,
            patched_versions: parse_all(raw.patched_versions.iter().map(String::as_str))?,
            unaffected_versions: parse_all(raw.unaffected_versions.iter().map(String::as_str))?,
        })
    }

    /// Returns true if this advisory concerns `name` (case-insensitive)
    pub fn applies_to(&self, name: &str) -> bool {
        self.dependency_name.eq_ignore_ascii_case(name)
    }

    /// Returns true if `version` is vulnerable
    ///
    /// Safe ranges (patched or unaffected) win. Otherwise, when affected ranges
    /// are listed they decide; with only safe ranges, anything outside them is
    /// vulnerable.
    pub fn is_vulnerable(&self, version: &Version) -> bool {
        let safe = self
            .patched_versions
            .iter()
            .chain(self.unaffected_versions.iter());
        if safe.clone().any(|r| r.is_satisfied_by(version)) {
            return false;
        }

        if self.affected_versions.iter().any(|r| r.is_satisfied_by(version)) {
            return true;
        }

        if !self.affected_versions.is_empty() {
            return false;
        }

        safe.count() > 0
    }

    /// Returns true if the dependency's (new) version is no longer vulnerable
    pub fn is_fixed_by(&self, dependency: &Dependency) -> bool {
        if !self.applies_to(&dependency.name) {
            return false;
        }
        match dependency.version.as_deref() {
            Some(version) if Version::is_correct(version) => {
                Version::parse(version).is_some_and(|v| !self.is_vulnerable(&v))
            }
            _ => false,
        }
    }
}

fn parse_all<'a>(
    requirements: impl Iterator<Item = &'a str>,
) -> Result<Vec<VersionRequirement>, JobError> {
    requirements.map(VersionRequirement::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PackageManager;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_patched_only() {
        let advisory = SecurityAdvisory::new("rails", &[], &["~> 1.11.0"], &[]).unwrap();
        assert!(advisory.is_vulnerable(&v("1.8.0")));
        assert!(!advisory.is_vulnerable(&v("1.11.2")));
    }

    #[test]
    fn test_affected_range_decides() {
        let advisory = SecurityAdvisory::new("rails", &["> 1.8.0"], &[], &[]).unwrap();
        assert!(!advisory.is_vulnerable(&v("1.8.0")));
        assert!(advisory.is_vulnerable(&v("1.9.0")));
    }

    #[test]
    fn test_safe_range_wins_over_affected() {
        let advisory =
            SecurityAdvisory::new("rails", &["< 2.0.0"], &["~> 1.9.3"], &[]).unwrap();
        assert!(!advisory.is_vulnerable(&v("1.9.4")));
        assert!(advisory.is_vulnerable(&v("1.9.2")));
    }

    #[test]
    fn test_no_ranges_is_not_vulnerable() {
        let advisory = SecurityAdvisory::new("rails", &[], &[], &[]).unwrap();
        assert!(!advisory.is_vulnerable(&v("1.0.0")));
    }

    #[test]
    fn test_fixed_by() {
        let advisory = SecurityAdvisory::new("Rails", &["< 1.11.0"], &[], &[]).unwrap();
        let fixed = Dependency::new("rails", Some("1.11.0"), PackageManager::Bundler);
        let still_bad = Dependency::new("rails", Some("1.10.0"), PackageManager::Bundler);
        let git = Dependency::new(
            "rails",
            Some("a1b2c3d4e5f6a7b8c9d0a1b2c3d4e5f6a7b8c9d0"),
            PackageManager::Bundler,
        );
        let other = Dependency::new("rack", Some("9.0.0"), PackageManager::Bundler);
        assert!(advisory.is_fixed_by(&fixed));
        assert!(!advisory.is_fixed_by(&still_bad));
        assert!(!advisory.is_fixed_by(&git));
        assert!(!advisory.is_fixed_by(&other));
    }

    #[test]
    fn test_invalid_requirement_rejected() {
        assert!(SecurityAdvisory::new("rails", &[">>> 1"], &[], &[]).is_err());
    }
}
