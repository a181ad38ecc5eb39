//! Dependency group definitions
//!
//! A group definition is immutable once decoded; which dependencies belong to
//! a group is recorded separately by [`super::DependencyGroupEngine`].

use crate::domain::{Dependency, UpdateType};
use crate::error::JobError;
use crate::job::wildcard::wildcard_match;
use crate::job::DependencyType;
use serde::Deserialize;
use std::fmt;

/// Which kind of run a group applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppliesTo {
    #[default]
    VersionUpdates,
    SecurityUpdates,
}

impl AppliesTo {
    /// Returns the configuration value
    pub fn as_str(&self) -> &'static str {
        match self {
            AppliesTo::VersionUpdates => "version-updates",
            AppliesTo::SecurityUpdates => "security-updates",
        }
    }

    fn parse(value: &str) -> Result<Self, JobError> {
        match value {
            "version-updates" => Ok(AppliesTo::VersionUpdates),
            "security-updates" => Ok(AppliesTo::SecurityUpdates),
            other => Err(JobError::InvalidRuleValue {
                field: "dependency-groups.applies-to".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct RawGroupRules {
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub dependency_type: Option<String>,
    #[serde(default)]
    pub update_types: Vec<String>,
}

/// Group as written in the job definition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct RawDependencyGroup {
    pub name: String,
    #[serde(default)]
    pub rules: RawGroupRules,
    #[serde(default)]
    pub applies_to: Option<String>,
}

/// Match rules of a group; every configured kind must accept a dependency
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupRules {
    pub patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Only `Production` or `Development`
    pub dependency_type: Option<DependencyType>,
    pub update_types: Vec<UpdateType>,
}

impl GroupRules {
    /// Number of configured rule entries, used to break specificity ties
    pub fn rule_count(&self) -> usize {
        self.patterns.len()
            + self.exclude_patterns.len()
            + usize::from(self.dependency_type.is_some())
            + self.update_types.len()
    }
}

/// A named set of dependencies updated together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGroup {
    pub name: String,
    pub applies_to: AppliesTo,
    pub rules: GroupRules,
}

impl DependencyGroup {
    /// Creates a version-update group without rules
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            applies_to: AppliesTo::VersionUpdates,
            rules: GroupRules::default(),
        }
    }

    /// Sets the name patterns (builder pattern)
    pub fn with_patterns(mut self, patterns: &[&str]) -> Self {
        self.rules.patterns = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Sets the exclude patterns (builder pattern)
    pub fn with_exclude_patterns(mut self, patterns: &[&str]) -> Self {
        self.rules.exclude_patterns = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Sets the dependency type rule (builder pattern)
    pub fn with_dependency_type(mut self, dependency_type: DependencyType) -> Self {
        self.rules.dependency_type = Some(dependency_type);
        self
    }

    /// Sets the update types rule (builder pattern)
    pub fn with_update_types(mut self, update_types: &[UpdateType]) -> Self {
        self.rules.update_types = update_types.to_vec();
        self
    }

    /// Makes this a security-update group (builder pattern)
    pub fn for_security_updates(mut self) -> Self {
        self.applies_to = AppliesTo::SecurityUpdates;
        self
    }

    pub(crate) fn from_raw(raw: RawDependencyGroup) -> Result<Self, JobError> {
        let applies_to = raw
            .applies_to
            .as_deref()
            .map(AppliesTo::parse)
            .transpose()?
            .unwrap_or_default();

        let dependency_type = match raw.rules.dependency_type.as_deref() {
            None => None,
            Some(value) => match DependencyType::parse("dependency-groups.rules.dependency-type", value)? {
                t @ (DependencyType::Production | DependencyType::Development) => Some(t),
                _ => {
                    return Err(JobError::InvalidRuleValue {
                        field: "dependency-groups.rules.dependency-type".to_string(),
                        value: value.to_string(),
                    })
                }
            },
        };

        let update_types = raw
            .rules
            .update_types
            .iter()
            .map(|label| {
                UpdateType::from_label(label).ok_or_else(|| JobError::InvalidRuleValue {
                    field: "dependency-groups.rules.update-types".to_string(),
                    value: label.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: raw.name,
            applies_to,
            rules: GroupRules {
                patterns: raw.rules.patterns,
                exclude_patterns: raw.rules.exclude_patterns,
                dependency_type,
                update_types,
            },
        })
    }

    /// Returns true if any rule is configured
    pub fn has_rules(&self) -> bool {
        self.rules.rule_count() > 0
    }

    /// Returns true if the group's rules accept `dependency`
    ///
    /// Exclude patterns veto. Update types are only checked when the
    /// dependency already carries a previous version to classify against.
    pub fn matches(&self, dependency: &Dependency) -> bool {
        if self.is_excluded(&dependency.name) {
            return false;
        }
        self.matches_pattern(&dependency.name)
            && self.matches_dependency_type(dependency)
            && self.matches_known_update_type(dependency)
    }

    /// Returns true if moving `dependency` to `latest_version` stays within the group's update types
    pub fn accepts_update(&self, dependency: &Dependency, latest_version: &str) -> bool {
        if self.rules.update_types.is_empty() {
            return true;
        }
        dependency
            .version
            .as_deref()
            .and_then(|current| UpdateType::classify_upgrade(current, latest_version))
            .is_some_and(|update_type| self.rules.update_types.contains(&update_type))
    }

    /// Returns the patterns that match `name`
    pub fn matching_patterns<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rules
            .patterns
            .iter()
            .map(String::as_str)
            .filter(move |p| wildcard_match(p, name))
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.rules
            .exclude_patterns
            .iter()
            .any(|p| wildcard_match(p, name))
    }

    fn matches_pattern(&self, name: &str) -> bool {
        self.rules.patterns.is_empty() || self.matching_patterns(name).next().is_some()
    }

    fn matches_dependency_type(&self, dependency: &Dependency) -> bool {
        match self.rules.dependency_type {
            Some(DependencyType::Production) => dependency.production,
            Some(DependencyType::Development) => !dependency.production,
            _ => true,
        }
    }

    fn matches_known_update_type(&self, dependency: &Dependency) -> bool {
        if self.rules.update_types.is_empty() {
            return true;
        }
        match dependency.update_type() {
            Some(update_type) => self.rules.update_types.contains(&update_type),
            None => true,
        }
    }
}

impl fmt::Display for DependencyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (applies-to: {})", self.name, self.applies_to.as_str())?;
        if !self.rules.patterns.is_empty() {
            write!(f, " patterns: [{}]", self.rules.patterns.join(", "))?;
        }
        if !self.rules.exclude_patterns.is_empty() {
            write!(f, " exclude-patterns: [{}]", self.rules.exclude_patterns.join(", "))?;
        }
        if let Some(dependency_type) = self.rules.dependency_type {
            write!(f, " dependency-type: {}", dependency_type)?;
        }
        if !self.rules.update_types.is_empty() {
            let labels: Vec<&str> = self.rules.update_types.iter().map(|t| t.semver_label()).collect();
            write!(f, " update-types: [{}]", labels.join(", "))?;
        }
        Ok(())
    }
}
