//! Accumulates the changes of a group update one dependency at a time

use super::DependencyChange;
use crate::domain::{Dependency, DependencyFile};

#[derive(Debug, Clone)]
struct BatchEntry {
    file: DependencyFile,
    changes: usize,
}

/// Working copy of a directory's files while a group is updated iteratively
///
/// Each dependency is checked against the files produced by the previous
/// updates, so later updates build on earlier ones.
#[derive(Debug, Clone)]
pub struct ChangeBatch {
    files: Vec<BatchEntry>,
    updated_dependencies: Vec<Dependency>,
}

impl ChangeBatch {
    pub fn new(initial_files: &[DependencyFile]) -> Self {
        Self {
            files: initial_files
                .iter()
                .map(|f| BatchEntry {
                    file: f.clone(),
                    changes: 0,
                })
                .collect(),
            updated_dependencies: Vec::new(),
        }
    }

    /// Files as they stand after the updates merged so far
    pub fn current_dependency_files(&self) -> Vec<DependencyFile> {
        self.files.iter().map(|e| e.file.clone()).collect()
    }

    /// Files touched by at least one merged update
    pub fn updated_dependency_files(&self) -> Vec<DependencyFile> {
        self.files
            .iter()
            .filter(|e| e.changes > 0)
            .map(|e| e.file.clone())
            .collect()
    }

    /// Dependencies updated so far
    ///
    /// A dependency updated twice keeps its first previous version and its
    /// last new version.
    pub fn updated_dependencies(&self) -> &[Dependency] {
        &self.updated_dependencies
    }

    pub fn merge(&mut self, change: DependencyChange) {
        for dependency in change.updated_dependencies {
            match self
                .updated_dependencies
                .iter_mut()
                .find(|d| d.name == dependency.name && d.directory == dependency.directory)
            {
                Some(existing) => {
                    let previous_version = existing.previous_version.take();
                    let previous_requirements = existing.previous_requirements.take();
                    *existing = dependency;
                    existing.previous_version = previous_version.or(existing.previous_version.take());
                    existing.previous_requirements =
                        previous_requirements.or(existing.previous_requirements.take());
                }
                None => self.updated_dependencies.push(dependency),
            }
        }

        for file in change.updated_dependency_files {
            match self.files.iter_mut().find(|e| e.file.path() == file.path()) {
                Some(entry) => {
                    entry.file = file;
                    entry.changes += 1;
                }
                None => self.files.push(BatchEntry { file, changes: 1 }),
            }
        }
    }
}
