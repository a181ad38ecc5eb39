//! Builds a [`DependencyChange`] from updated dependencies
//!
//! Steps:
//! 1. keep the dependency files of the directory being worked on
//! 2. ask the file updater for new contents (informational-only dependencies
//!    are not written) and drop support files
//! 3. drop files under the job's exclude paths
//! 4. drop dependencies that did not actually change
//! 5. stamp the directory onto the surviving dependencies

use super::{DependencyChange, Notice};
use crate::domain::{Dependency, DependencyFile};
use crate::ecosystem::FileUpdater;
use crate::error::ChangeError;
use crate::group::DependencyGroup;
use crate::job::wildcard::wildcard_match;
use crate::job::Job;
use crate::snapshot::DirectoryContext;
use tracing::{debug, info};

/// What a change was built for
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeSource {
    /// A single lead dependency
    Dependency(Dependency),
    /// A dependency group
    Group(DependencyGroup),
}

impl ChangeSource {
    fn lead_name(&self) -> Option<&str> {
        match self {
            ChangeSource::Dependency(dependency) => Some(&dependency.name),
            ChangeSource::Group(_) => None,
        }
    }

    fn into_group(self) -> Option<DependencyGroup> {
        match self {
            ChangeSource::Dependency(_) => None,
            ChangeSource::Group(group) => Some(group),
        }
    }
}

/// Computes the files and dependencies of one change
pub struct DependencyChangeBuilder<'a> {
    job: &'a Job,
    context: &'a DirectoryContext,
    dependency_files: Vec<DependencyFile>,
    updated_dependencies: Vec<Dependency>,
    change_source: ChangeSource,
    notices: Vec<Notice>,
}

impl<'a> DependencyChangeBuilder<'a> {
    /// Creates a builder; fails if no dependency file belongs to `context`
    pub fn new(
        job: &'a Job,
        context: &'a DirectoryContext,
        dependency_files: &[DependencyFile],
        updated_dependencies: Vec<Dependency>,
        change_source: ChangeSource,
    ) -> Result<Self, ChangeError> {
        let dependency_files: Vec<DependencyFile> = dependency_files
            .iter()
            .filter(|f| f.normalized_directory() == context.directory())
            .cloned()
            .collect();
        if dependency_files.is_empty() {
            return Err(ChangeError::NoFilesForDirectory {
                directory: context.directory().to_string(),
            });
        }

        Ok(Self {
            job,
            context,
            dependency_files,
            updated_dependencies,
            change_source,
            notices: Vec::new(),
        })
    }

    /// Attaches notices to the change (builder pattern)
    pub fn with_notices(mut self, notices: Vec<Notice>) -> Self {
        self.notices = notices;
        self
    }

    /// Shorthand for `new(..)?.run(updater)`
    pub fn create_from(
        job: &'a Job,
        context: &'a DirectoryContext,
        dependency_files: &[DependencyFile],
        updated_dependencies: Vec<Dependency>,
        change_source: ChangeSource,
        updater: &dyn FileUpdater,
    ) -> Result<DependencyChange, ChangeError> {
        Self::new(job, context, dependency_files, updated_dependencies, change_source)?.run(updater)
    }

    pub fn run(self, updater: &dyn FileUpdater) -> Result<DependencyChange, ChangeError> {
        let updated_files = self.generate_dependency_files(updater)?;
        let updated_dependencies = self.changed_dependencies();

        Ok(DependencyChange::new(
            updated_dependencies,
            updated_files,
            self.change_source.into_group(),
        )
        .with_notices(self.notices))
    }

    fn generate_dependency_files(&self, updater: &dyn FileUpdater) -> Result<Vec<DependencyFile>, ChangeError> {
        let relevant: Vec<Dependency> = self
            .updated_dependencies
            .iter()
            .filter(|d| !d.informational_only)
            .cloned()
            .collect();

        let files: Vec<DependencyFile> = updater
            .updated_dependency_files(self.context.directory(), &self.dependency_files, &relevant)?
            .into_iter()
            .filter(|f| !f.support_file)
            .collect();

        if files.is_empty() {
            return Err(ChangeError::NoFilesChanged {
                dependencies: relevant.iter().map(|d| d.name.clone()).collect(),
            });
        }

        if self.job.exclude_paths.is_empty() {
            return Ok(files);
        }

        let (excluded, kept): (Vec<DependencyFile>, Vec<DependencyFile>) = files
            .into_iter()
            .partition(|f| is_excluded(&f.path(), &self.job.exclude_paths));
        for file in &excluded {
            debug!(path = %file.path(), "Excluding updated file matching exclude-paths");
        }
        if kept.is_empty() {
            return Err(ChangeError::NoUpdateFilesAfterExclude {
                excluded: excluded.iter().map(DependencyFile::path).collect(),
            });
        }
        Ok(kept)
    }

    fn changed_dependencies(&self) -> Vec<Dependency> {
        let lead = self.change_source.lead_name();
        self.updated_dependencies
            .iter()
            .filter(|d| {
                let keep = lead == Some(d.name.as_str())
                    || (d.is_top_level() && d.requirements_changed())
                    || d.version_changed();
                if !keep {
                    info!(dependency = %d.name, "Dropping unchanged dependency from the change");
                }
                keep
            })
            .cloned()
            .map(|mut d| {
                d.directory = Some(self.context.directory().to_string());
                d
            })
            .collect()
    }
}

/// Returns true if `path` falls under one of the exclude patterns
///
/// A pattern matches the path itself (with `*` wildcards) or any directory
/// prefix of it.
fn is_excluded(path: &str, exclude_paths: &[String]) -> bool {
    let path = path.trim_start_matches('/');
    exclude_paths.iter().any(|pattern| {
        let pattern = pattern.trim_start_matches('/').trim_end_matches('/');
        wildcard_match(pattern, path) || path.starts_with(&format!("{}/", pattern))
    })
}
