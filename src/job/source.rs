//! Repository source of a job

use crate::domain::normalize_directory;
use crate::error::JobError;
use serde::{Deserialize, Serialize};

fn default_provider() -> String {
    "github".to_string()
}

/// Where the job's dependency files live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Source {
    #[serde(default = "default_provider")]
    pub provider: String,
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl Source {
    /// Creates a single-directory source
    pub fn new(repo: impl Into<String>, directory: impl Into<String>) -> Self {
        Self {
            provider: default_provider(),
            repo: repo.into(),
            directory: Some(directory.into()),
            directories: None,
            branch: None,
            hostname: None,
            api_endpoint: None,
            commit: None,
        }
    }

    /// Creates a multi-directory source
    pub fn with_directories(repo: impl Into<String>, directories: &[&str]) -> Self {
        Self {
            directory: None,
            directories: Some(directories.iter().map(|d| d.to_string()).collect()),
            ..Self::new(repo, "/")
        }
    }

    /// Checks that exactly one of `directory` / `directories` is set
    pub fn validate(&self) -> Result<(), JobError> {
        match (&self.directory, &self.directories) {
            (Some(_), None) => Ok(()),
            (None, Some(dirs)) if !dirs.is_empty() => Ok(()),
            _ => Err(JobError::DirectoryXorDirectories),
        }
    }

    /// Returns the normalised directories in configuration order, without duplicates
    pub fn all_directories(&self) -> Vec<String> {
        let raw: Vec<&str> = match (&self.directory, &self.directories) {
            (Some(dir), _) => vec![dir.as_str()],
            (None, Some(dirs)) => dirs.iter().map(String::as_str).collect(),
            (None, None) => vec!["/"],
        };

        let mut directories: Vec<String> = Vec::new();
        for dir in raw {
            let normalized = normalize_directory(dir);
            if !directories.contains(&normalized) {
                directories.push(normalized);
            }
        }
        directories
    }

    /// Returns true if the job spans several directories
    pub fn is_multi_directory(&self) -> bool {
        self.directories.is_some()
    }
}
