//! Allow rules: which dependencies a job may update

use crate::domain::Dependency;
use crate::error::JobError;
use serde::Deserialize;
use std::fmt;

/// Dependency type selector used by allow rules and group rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyType {
    /// Any dependency
    All,
    /// Declared in a manifest
    Direct,
    /// Only reachable transitively
    Indirect,
    /// Production dependency
    Production,
    /// Development dependency
    Development,
}

impl DependencyType {
    /// Parses a rule value
    pub fn parse(field: &str, value: &str) -> Result<Self, JobError> {
        match value {
            "all" => Ok(DependencyType::All),
            "direct" => Ok(DependencyType::Direct),
            "indirect" => Ok(DependencyType::Indirect),
            "production" => Ok(DependencyType::Production),
            "development" => Ok(DependencyType::Development),
            other => Err(JobError::InvalidRuleValue {
                field: field.to_string(),
                value: other.to_string(),
            }),
        }
    }

    /// Returns the rule value
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::All => "all",
            DependencyType::Direct => "direct",
            DependencyType::Indirect => "indirect",
            DependencyType::Production => "production",
            DependencyType::Development => "development",
        }
    }

    /// Types that only make sense for manifest-declared dependencies
    fn is_top_level_type(&self) -> bool {
        matches!(
            self,
            DependencyType::Direct | DependencyType::Production | DependencyType::Development
        )
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether an allow rule covers every update or only security fixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllowedUpdateType {
    #[default]
    All,
    Security,
}

/// Allow rule as written in the job definition
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct RawAllowedUpdate {
    #[serde(default)]
    pub dependency_name: Option<String>,
    #[serde(default)]
    pub dependency_type: Option<String>,
    #[serde(default)]
    pub update_type: Option<String>,
}

/// One allow rule; unset fields match everything
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllowedUpdate {
    pub dependency_name: Option<String>,
    pub dependency_type: Option<DependencyType>,
    pub update_type: AllowedUpdateType,
}

impl AllowedUpdate {
    /// Creates a rule that allows everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dependency name pattern (builder pattern)
    pub fn with_name(mut self, pattern: impl Into<String>) -> Self {
        self.dependency_name = Some(pattern.into());
        self
    }

    /// Sets the dependency type (builder pattern)
    pub fn with_dependency_type(mut self, dependency_type: DependencyType) -> Self {
        self.dependency_type = Some(dependency_type);
        self
    }

    /// Restricts the rule to security updates (builder pattern)
    pub fn security_only(mut self) -> Self {
        self.update_type = AllowedUpdateType::Security;
        self
    }

    pub(crate) fn from_raw(raw: RawAllowedUpdate) -> Result<Self, JobError> {
        let dependency_type = raw
            .dependency_type
            .as_deref()
            .map(|v| DependencyType::parse("allowed-updates.dependency-type", v))
            .transpose()?;
        let update_type = match raw.update_type.as_deref() {
            None | Some("all") => AllowedUpdateType::All,
            Some("security") => AllowedUpdateType::Security,
            Some(other) => {
                return Err(JobError::InvalidRuleValue {
                    field: "allowed-updates.update-type".to_string(),
                    value: other.to_string(),
                })
            }
        };
        Ok(Self {
            dependency_name: raw.dependency_name,
            dependency_type,
            update_type,
        })
    }

    /// Evaluates the rule against `dependency`
    ///
    /// `name_matches` compares the rule's pattern with the dependency name
    /// and `is_vulnerable` reports advisory status; both come from the job.
    pub fn permits(
        &self,
        dependency: &Dependency,
        security_updates_only: bool,
        name_matches: impl Fn(&str, &str) -> bool,
        is_vulnerable: impl Fn(&Dependency) -> bool,
    ) -> bool {
        let security_update = self.update_type == AllowedUpdateType::Security || security_updates_only;
        if security_update && !is_vulnerable(dependency) {
            return false;
        }

        if let Some(pattern) = &self.dependency_name {
            if !name_matches(pattern, &dependency.name) {
                return false;
            }
        }

        let dependency_type = self.dependency_type.unwrap_or(DependencyType::All);
        if dependency_type == DependencyType::Indirect && dependency.is_top_level() {
            return false;
        }
        if !security_updates_only && !dependency.is_top_level() && dependency_type.is_top_level_type()
        {
            return false;
        }
        if dependency.production && dependency_type == DependencyType::Development {
            return false;
        }
        if !dependency.production && dependency_type == DependencyType::Production {
            return false;
        }

        true
    }
}
