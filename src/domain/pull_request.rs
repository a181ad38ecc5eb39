//! Pull request identity
//!
//! An existing pull request is identified by the set of dependency tuples it
//! updates. Directories only take part in the comparison when every entry on
//! both sides records one, so pull requests opened before directories were
//! tracked still match.

use super::{normalize_directory, Dependency};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One dependency entry of a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestDependency {
    #[serde(rename = "dependency-name")]
    pub name: String,
    #[serde(rename = "dependency-version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "dependency-removed", default, skip_serializing_if = "is_false")]
    pub removed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl PullRequestDependency {
    /// Creates a new entry
    pub fn new(name: impl Into<String>, version: Option<&str>) -> Self {
        Self {
            name: name.into(),
            version: version.map(str::to_string),
            removed: false,
            directory: None,
        }
    }

    /// Sets the directory (builder pattern)
    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Marks the entry as removed (builder pattern)
    pub fn removed(mut self) -> Self {
        self.removed = true;
        self
    }

    fn key(&self, with_directory: bool) -> (String, Option<String>, bool, Option<String>) {
        let directory = if with_directory {
            self.directory.as_deref().map(normalize_directory)
        } else {
            None
        };
        (self.name.clone(), self.version.clone(), self.removed, directory)
    }
}

impl From<&Dependency> for PullRequestDependency {
    fn from(dep: &Dependency) -> Self {
        Self {
            name: dep.name.clone(),
            version: if dep.removed { None } else { dep.version.clone() },
            removed: dep.removed,
            directory: dep.directory.clone(),
        }
    }
}

/// The identity of an open pull request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PullRequest {
    pub dependencies: Vec<PullRequestDependency>,
}

impl PullRequest {
    /// Creates a pull request identity from entries
    pub fn new(dependencies: Vec<PullRequestDependency>) -> Self {
        Self { dependencies }
    }

    /// Builds the identity a change with these dependencies would have
    pub fn from_updated_dependencies(dependencies: &[Dependency]) -> Self {
        Self {
            dependencies: dependencies.iter().map(PullRequestDependency::from).collect(),
        }
    }

    /// Returns true if every entry records a directory
    pub fn using_directory(&self) -> bool {
        !self.dependencies.is_empty() && self.dependencies.iter().all(|d| d.directory.is_some())
    }

    /// Returns true if this pull request updates `name` to `version`
    pub fn contains(&self, name: &str, version: Option<&str>) -> bool {
        self.dependencies
            .iter()
            .any(|d| d.name == name && d.version.as_deref() == version)
    }

    /// Returns true if this is a single-dependency pull request
    pub fn is_solo(&self) -> bool {
        self.dependencies.len() == 1
    }

    fn key_set(&self, with_directory: bool) -> BTreeSet<(String, Option<String>, bool, Option<String>)> {
        self.dependencies
            .iter()
            .map(|d| d.key(with_directory))
            .collect()
    }
}

impl PartialEq for PullRequest {
    fn eq(&self, other: &Self) -> bool {
        let with_directory = self.using_directory() && other.using_directory();
        self.key_set(with_directory) == other.key_set(with_directory)
    }
}

impl Eq for PullRequest {}

impl fmt::Display for PullRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .dependencies
            .iter()
            .map(|d| {
                if d.removed {
                    format!("{}@removed", d.name)
                } else {
                    format!("{}@{}", d.name, d.version.as_deref().unwrap_or("unknown"))
                }
            })
            .collect();
        write!(f, "{}", entries.join(", "))
    }
}

/// An open pull request for a dependency group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingGroupPullRequest {
    #[serde(rename = "dependency-group-name")]
    pub group_name: String,
    pub dependencies: PullRequest,
}
