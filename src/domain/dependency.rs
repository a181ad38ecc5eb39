//! Dependency information structures
//!
//! Dependencies are produced by the parser and update-checker collaborators.
//! The engine only reads them and stamps directory and attribution metadata.

use super::{PackageManager, UpdateType, Version};
use crate::attribution::Attribution;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Requirement groups that mark a dependency as development-only
const DEVELOPMENT_GROUPS: &[&str] = &[
    "dev-dependencies",
    "devDependencies",
    "development",
    "test",
    "dev",
];

/// One manifest entry declaring a dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// Manifest file the requirement lives in
    pub file: String,
    /// Requirement string, absent for lockfile-only entries
    #[serde(default)]
    pub requirement: Option<String>,
    /// Manifest section, e.g. `dependencies` or `workspace.dependencies`
    #[serde(default)]
    pub groups: Vec<String>,
    /// Source descriptor (registry, git, path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
}

impl Requirement {
    /// Creates a new requirement
    pub fn new(file: impl Into<String>, requirement: Option<&str>) -> Self {
        Self {
            file: file.into(),
            requirement: requirement.map(str::to_string),
            groups: Vec::new(),
            source: None,
        }
    }

    /// Sets the requirement groups (builder pattern)
    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }

    /// Returns true if every group is a development group
    pub fn is_development(&self) -> bool {
        !self.groups.is_empty()
            && self
                .groups
                .iter()
                .all(|g| DEVELOPMENT_GROUPS.contains(&g.as_str()))
    }
}

/// Represents a package dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    /// Package name
    pub name: String,
    /// Current (or, after an update, new) version
    #[serde(default)]
    pub version: Option<String>,
    /// Version before the update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    /// Manifest requirements; empty for transitive dependencies
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    /// Requirements before the update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_requirements: Option<Vec<Requirement>>,
    /// Ecosystem the dependency belongs to
    pub package_manager: PackageManager,
    /// Production (true) or development (false) dependency
    #[serde(default = "default_production")]
    pub production: bool,
    /// The update removes this dependency
    #[serde(default)]
    pub removed: bool,
    /// Present only to inform the update, never written to files
    #[serde(default)]
    pub informational_only: bool,
    /// Source directory, stamped when the dependency joins a change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// Free-form metadata, e.g. `all_versions`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    /// Why this dependency was selected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
}

fn default_production() -> bool {
    true
}

impl Dependency {
    /// Creates a new production dependency without requirements
    pub fn new(
        name: impl Into<String>,
        version: Option<&str>,
        package_manager: PackageManager,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.map(str::to_string),
            previous_version: None,
            requirements: Vec::new(),
            previous_requirements: None,
            package_manager,
            production: true,
            removed: false,
            informational_only: false,
            directory: None,
            metadata: BTreeMap::new(),
            attribution: None,
        }
    }

    /// Sets the requirements (builder pattern)
    pub fn with_requirements(mut self, requirements: Vec<Requirement>) -> Self {
        self.requirements = requirements;
        self
    }

    /// Sets the previous version and requirements (builder pattern)
    pub fn with_previous(
        mut self,
        previous_version: Option<&str>,
        previous_requirements: Option<Vec<Requirement>>,
    ) -> Self {
        self.previous_version = previous_version.map(str::to_string);
        self.previous_requirements = previous_requirements;
        self
    }

    /// Marks the dependency as development-only (builder pattern)
    pub fn development(mut self) -> Self {
        self.production = false;
        self
    }

    /// Sets the source directory (builder pattern)
    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Declared in a manifest rather than pulled in transitively
    pub fn is_top_level(&self) -> bool {
        !self.requirements.is_empty()
    }

    /// Returns true if the version moved
    pub fn version_changed(&self) -> bool {
        self.version != self.previous_version
    }

    /// Returns true if the manifest requirements moved
    pub fn requirements_changed(&self) -> bool {
        match &self.previous_requirements {
            Some(previous) => previous != &self.requirements,
            None => false,
        }
    }

    /// Every version known to be installed: `metadata.all_versions` plus `version`
    pub fn all_versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self
            .metadata
            .get("all_versions")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if let Some(version) = &self.version {
            if !versions.contains(version) {
                versions.push(version.clone());
            }
        }
        versions
    }

    /// Returns the parsed current version
    pub fn parsed_version(&self) -> Option<Version> {
        self.version.as_deref().and_then(Version::parse)
    }

    /// Returns the semver delta between previous and current version
    pub fn update_type(&self) -> Option<UpdateType> {
        match (&self.previous_version, &self.version) {
            (Some(previous), Some(current)) => UpdateType::classify(previous, current),
            _ => None,
        }
    }

    /// Returns the version for display, `removed` for removed dependencies
    pub fn display_version(&self) -> &str {
        if self.removed {
            "removed"
        } else {
            self.version.as_deref().unwrap_or("unknown")
        }
    }

    /// Returns `name ( from a to b )` for logs
    pub fn humanized(&self) -> String {
        if self.removed {
            return format!("{} ( from {} to removed )", self.name, self.previous_display());
        }
        match &self.previous_version {
            Some(_) => format!(
                "{} ( from {} to {} )",
                self.name,
                self.previous_display(),
                self.display_version()
            ),
            None => format!("{} ( {} )", self.name, self.display_version()),
        }
    }

    fn previous_display(&self) -> &str {
        self.previous_version.as_deref().unwrap_or("unknown")
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dev_marker = if self.production { "" } else { " (dev)" };
        write!(
            f,
            "{}@{}{} [{}]",
            self.name,
            self.display_version(),
            dev_marker,
            self.package_manager
        )
    }
}
