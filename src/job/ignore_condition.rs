//! Ignore conditions: versions a job must never propose

use crate::domain::{Dependency, SemverParts, UpdateType, VersionRequirement};
use crate::error::JobError;
use serde::Deserialize;

/// Requirement that ignores every version
pub const ALL_VERSIONS: &str = ">= 0";

/// Prefix of the source tag for conditions created by chat commands
const COMMAND_SOURCE_PREFIX: &str = "@dependabot ignore";

/// Ignore condition as written in the job definition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct RawIgnoreCondition {
    pub dependency_name: String,
    #[serde(default)]
    pub version_requirement: Option<String>,
    #[serde(default)]
    pub update_types: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// One ignore rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreCondition {
    /// Dependency name pattern (`*` wildcards)
    pub dependency_name: String,
    /// Ignored version range
    pub version_requirement: Option<String>,
    /// Ignored semver bumps
    pub update_types: Vec<UpdateType>,
    /// Where the rule came from (config file path or chat command)
    pub source: Option<String>,
}

impl IgnoreCondition {
    /// Creates a condition ignoring every version of `dependency_name`
    pub fn new(dependency_name: impl Into<String>) -> Self {
        Self {
            dependency_name: dependency_name.into(),
            version_requirement: None,
            update_types: Vec::new(),
            source: None,
        }
    }

    /// Sets the ignored version range (builder pattern)
    pub fn with_version_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.version_requirement = Some(requirement.into());
        self
    }

    /// Sets the ignored update types (builder pattern)
    pub fn with_update_types(mut self, update_types: &[UpdateType]) -> Self {
        self.update_types = update_types.to_vec();
        self
    }

    /// Sets the source tag (builder pattern)
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub(crate) fn from_raw(raw: RawIgnoreCondition) -> Result<Self, JobError> {
        if let Some(requirement) = &raw.version_requirement {
            VersionRequirement::parse(requirement)?;
        }
        let update_types = raw
            .update_types
            .iter()
            .map(|label| {
                UpdateType::from_label(label).ok_or_else(|| JobError::InvalidRuleValue {
                    field: "ignore-conditions.update-types".to_string(),
                    value: label.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dependency_name: raw.dependency_name,
            version_requirement: raw.version_requirement,
            update_types,
            source: raw.source,
        })
    }

    /// Returns true if the rule was created by a chat command rather than config
    pub fn is_from_command(&self) -> bool {
        self.source
            .as_deref()
            .is_some_and(|s| s.starts_with(COMMAND_SOURCE_PREFIX))
    }

    /// Returns the version requirements this rule ignores for `dependency`
    ///
    /// Security-only runs only honour explicit version ranges. A rule with
    /// neither a range nor update types ignores every version.
    pub fn ignored_versions(&self, dependency: &Dependency, security_updates_only: bool) -> Vec<String> {
        let versions: Vec<String> = self.version_requirement.iter().cloned().collect();
        if security_updates_only {
            return versions;
        }
        if versions.is_empty() && self.update_types.is_empty() {
            return vec![ALL_VERSIONS.to_string()];
        }

        let mut ignored = self.versions_by_type(dependency);
        ignored.extend(versions);
        ignored
    }

    fn versions_by_type(&self, dependency: &Dependency) -> Vec<String> {
        let Some(parts) = dependency.version.as_deref().and_then(SemverParts::parse) else {
            return Vec::new();
        };

        self.update_types
            .iter()
            .map(|update_type| match update_type {
                UpdateType::Major => format!(">= {}.a", parts.major + 1),
                UpdateType::Minor => format!(
                    ">= {}.{}.a, < {}",
                    parts.major,
                    parts.minor + 1,
                    parts.major + 1
                ),
                UpdateType::Patch => format!(
                    "> {}.{}.{}, < {}.{}",
                    parts.major,
                    parts.minor,
                    parts.patch,
                    parts.major,
                    parts.minor + 1
                ),
            })
            .collect()
    }
}
