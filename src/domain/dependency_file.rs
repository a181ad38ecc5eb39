//! Dependency files and directory normalisation

use serde::{Deserialize, Serialize};
use std::fmt;

fn root_directory() -> String {
    "/".to_string()
}

/// Cleans a repository directory into `/a/b` form
///
/// Empty and `.` segments are dropped, `..` pops the previous segment and
/// the result always starts with `/` and never ends with one (except root).
pub fn normalize_directory(directory: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in directory.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

/// A manifest, lockfile or support file in the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyFile {
    /// File name relative to `directory` (may contain sub-paths)
    pub name: String,
    /// Directory the file belongs to
    #[serde(default = "root_directory")]
    pub directory: String,
    /// File content, absent for deleted files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Needed to perform an update but never written back
    #[serde(default)]
    pub support_file: bool,
    /// The update removes this file
    #[serde(default)]
    pub deleted: bool,
}

impl DependencyFile {
    /// Creates a new dependency file
    pub fn new(
        name: impl Into<String>,
        directory: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            content: Some(content.into()),
            support_file: false,
            deleted: false,
        }
    }

    /// Marks the file as a support file (builder pattern)
    pub fn as_support_file(mut self) -> Self {
        self.support_file = true;
        self
    }

    /// Returns the normalised directory
    pub fn normalized_directory(&self) -> String {
        normalize_directory(&self.directory)
    }

    /// Returns the normalised full path of the file
    pub fn path(&self) -> String {
        normalize_directory(&format!("{}/{}", self.directory, self.name))
    }
}

impl fmt::Display for DependencyFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}
