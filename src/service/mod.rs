//! Reporting sink
//!
//! Everything a run decides is reported through the [`Service`] trait:
//! pull requests to create, update or close, per-dependency errors, captured
//! exceptions and the final "processed" signal.
//!
//! - [`RecordingService`]: keeps the events in memory
//! - [`ApiService`]: records and posts every event to the update-job API

mod api;
mod client;
mod recording;

pub use api::{ApiService, ApiSettings};
pub use client::{ApiClient, Sleeper, TokioSleeper, MAX_RETRIES};
pub use recording::RecordingService;

use crate::change::DependencyChange;
use crate::domain::{Dependency, PullRequestDependency};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Why a pull request should be closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The job no longer names any dependency
    DependenciesRemoved,
    /// A dependency of the pull request left the project
    DependencyRemoved,
    /// The dependency is already at (or past) the proposed version
    UpToDate,
    /// The update cannot be resolved any more
    UpdateNoLongerPossible,
    /// The set of updated dependencies changed; a new pull request replaces this one
    DependenciesChanged,
    /// The group being refreshed no longer exists or matches nothing
    DependencyGroupEmpty,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::DependenciesRemoved => "dependencies_removed",
            CloseReason::DependencyRemoved => "dependency_removed",
            CloseReason::UpToDate => "up_to_date",
            CloseReason::UpdateNoLongerPossible => "update_no_longer_possible",
            CloseReason::DependenciesChanged => "dependencies_changed",
            CloseReason::DependencyGroupEmpty => "dependency_group_empty",
        }
    }

    /// Human form used in logs, e.g. "up to date"
    pub fn humanized(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An unexpected failure, reported in addition to any structured error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceptionReport {
    pub error_class: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_group: Option<String>,
}

impl ExceptionReport {
    pub fn new(error_class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_class: error_class.into(),
            message: message.into(),
            dependency: None,
            dependency_group: None,
        }
    }

    /// Sets the dependency the failure happened on (builder pattern)
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependency = Some(name.into());
        self
    }

    /// Sets the group the failure happened in (builder pattern)
    pub fn with_dependency_group(mut self, name: impl Into<String>) -> Self {
        self.dependency_group = Some(name.into());
        self
    }
}

/// Summary of a change as reported in pull request events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeSummary {
    pub dependencies: Vec<PullRequestDependency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_group: Option<String>,
    pub updated_files: Vec<String>,
}

impl From<&DependencyChange> for ChangeSummary {
    fn from(change: &DependencyChange) -> Self {
        Self {
            dependencies: change.dependency_entries(),
            dependency_group: change.dependency_group.as_ref().map(|g| g.name.clone()),
            updated_files: change
                .updated_dependency_files
                .iter()
                .map(|f| f.path())
                .collect(),
        }
    }
}

/// One reported decision or failure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServiceEvent {
    CreatePullRequest {
        change: ChangeSummary,
        base_commit_sha: String,
    },
    UpdatePullRequest {
        change: ChangeSummary,
        base_commit_sha: String,
    },
    ClosePullRequest {
        dependency_names: Vec<String>,
        reason: CloseReason,
    },
    RecordUpdateJobError {
        error_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_details: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dependency: Option<String>,
    },
    CaptureException {
        report: ExceptionReport,
    },
    MarkJobAsProcessed {
        base_commit_sha: String,
    },
}

impl ServiceEvent {
    /// Returns true for error and exception events
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ServiceEvent::RecordUpdateJobError { .. } | ServiceEvent::CaptureException { .. }
        )
    }
}

/// Receiver of everything a run reports
#[async_trait]
pub trait Service: Send + Sync {
    async fn create_pull_request(&self, change: &DependencyChange, base_commit_sha: &str);

    async fn update_pull_request(&self, change: &DependencyChange, base_commit_sha: &str);

    async fn close_pull_request(&self, dependency_names: &[String], reason: CloseReason);

    async fn record_update_job_error(
        &self,
        error_type: &str,
        error_details: Option<Value>,
        dependency: Option<&Dependency>,
    );

    async fn capture_exception(&self, report: ExceptionReport);

    /// Signals the end of the run; repeated calls have no further effect
    async fn mark_job_as_processed(&self, base_commit_sha: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_reason_names() {
        assert_eq!(CloseReason::UpdateNoLongerPossible.as_str(), "update_no_longer_possible");
        assert_eq!(CloseReason::UpToDate.humanized(), "up to date");
        assert_eq!(
            serde_json::to_value(CloseReason::DependencyGroupEmpty).unwrap(),
            serde_json::json!("dependency_group_empty")
        );
    }

    #[test]
    fn test_event_serialization() {
        let event = ServiceEvent::ClosePullRequest {
            dependency_names: vec!["rails".to_string()],
            reason: CloseReason::DependencyRemoved,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "close_pull_request");
        assert_eq!(value["reason"], "dependency_removed");
        assert!(!event.is_error());

        let event = ServiceEvent::RecordUpdateJobError {
            error_type: "unknown_error".to_string(),
            error_details: None,
            dependency: Some("rails".to_string()),
        };
        assert!(event.is_error());
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("error_details").is_none());
    }
}
