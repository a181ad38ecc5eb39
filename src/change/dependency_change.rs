//! The computed change for one pull request

use crate::attribution::{telemetry_summary, TelemetrySummary};
use crate::domain::{Dependency, DependencyFile, PullRequest, PullRequestDependency};
use crate::error::ChangeError;
use crate::group::DependencyGroup;
use crate::job::Job;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// A message shown alongside a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub show_in_pr: bool,
}

/// Updated dependencies plus the files they change
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyChange {
    pub updated_dependencies: Vec<Dependency>,
    pub updated_dependency_files: Vec<DependencyFile>,
    pub dependency_group: Option<DependencyGroup>,
    pub notices: Vec<Notice>,
}

impl DependencyChange {
    pub fn new(
        updated_dependencies: Vec<Dependency>,
        updated_dependency_files: Vec<DependencyFile>,
        dependency_group: Option<DependencyGroup>,
    ) -> Self {
        Self {
            updated_dependencies,
            updated_dependency_files,
            dependency_group,
            notices: Vec::new(),
        }
    }

    /// Sets the notices (builder pattern)
    pub fn with_notices(mut self, notices: Vec<Notice>) -> Self {
        self.notices = notices;
        self
    }

    /// Fails if some dependency has neither a previous version nor a requirements change
    ///
    /// The error names every dependency without a previous version and every
    /// dependency without a requirements change.
    pub fn check_dependencies_have_previous_version(&self) -> Result<(), ChangeError> {
        let meaningful = self
            .updated_dependencies
            .iter()
            .all(|d| d.requirements_changed() || d.previous_version.is_some());
        if meaningful {
            return Ok(());
        }

        Err(ChangeError::InvalidUpdatedDependencies {
            no_previous_version: self
                .updated_dependencies
                .iter()
                .filter(|d| d.previous_version.is_none())
                .map(|d| d.name.clone())
                .collect(),
            no_requirements_change: self
                .updated_dependencies
                .iter()
                .filter(|d| !d.requirements_changed())
                .map(|d| d.name.clone())
                .collect(),
        })
    }

    pub fn is_grouped_update(&self) -> bool {
        self.dependency_group.is_some()
    }

    /// Lower-cased, de-duplicated names of the updated dependencies
    pub fn updated_dependency_names(&self) -> BTreeSet<String> {
        self.updated_dependencies
            .iter()
            .map(|d| d.name.to_lowercase())
            .collect()
    }

    /// True when refreshing a pull request whose dependency set no longer matches this change
    pub fn should_replace_existing_pr(&self, job: &Job) -> bool {
        if !job.updating_a_pull_request {
            return false;
        }
        let requested: BTreeSet<String> = job
            .requested_dependencies()
            .iter()
            .map(|n| n.to_lowercase())
            .collect();
        self.updated_dependency_names() != requested
    }

    /// The identity a pull request for this change would have
    pub fn pull_request(&self) -> PullRequest {
        PullRequest::from_updated_dependencies(&self.updated_dependencies)
    }

    /// True when an open pull request already proposes exactly this change
    pub fn matches_existing_pr(&self, job: &Job) -> bool {
        let candidate = self.pull_request();
        match &self.dependency_group {
            Some(group) => job
                .existing_group_pull_requests
                .iter()
                .any(|pr| pr.group_name == group.name && pr.dependencies == candidate),
            None => job.existing_pull_requests.iter().any(|pr| *pr == candidate),
        }
    }

    /// `name ( from a to b ), ...` for logs
    pub fn humanized(&self) -> String {
        self.updated_dependencies
            .iter()
            .map(Dependency::humanized)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Entries as reported to the service
    pub fn dependency_entries(&self) -> Vec<PullRequestDependency> {
        self.pull_request().dependencies
    }

    /// Summary of the attribution stamps on the updated dependencies
    pub fn attribution_summary(&self) -> TelemetrySummary {
        telemetry_summary(&self.updated_dependencies)
    }

    /// Logs the attribution summary of this change
    pub fn log_attribution(&self) {
        let summary = self.attribution_summary();
        if summary.attributed_dependencies == 0 {
            return;
        }
        info!(
            group = self.dependency_group.as_ref().map(|g| g.name.as_str()).unwrap_or(""),
            total = summary.total_dependencies,
            attributed = summary.attributed_dependencies,
            coverage = summary.attribution_coverage,
            "Dependency attribution: {:?}",
            summary.by_reason
        );
    }
}
