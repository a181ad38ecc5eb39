//! In-memory reporting sink

use super::{ChangeSummary, CloseReason, ExceptionReport, Service, ServiceEvent};
use crate::change::DependencyChange;
use crate::domain::Dependency;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Records every event in call order
#[derive(Debug, Default)]
pub struct RecordingService {
    events: Mutex<Vec<ServiceEvent>>,
    processed: AtomicBool,
}

impl RecordingService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ServiceEvent>> {
        // A poisoned lock still holds every event recorded before the panic
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn push(&self, event: ServiceEvent) {
        self.lock().push(event);
    }

    /// Returns true the first time it is called
    pub(crate) fn claim_processed(&self) -> bool {
        !self.processed.swap(true, Ordering::SeqCst)
    }

    /// A copy of the recorded events
    pub fn events(&self) -> Vec<ServiceEvent> {
        self.lock().clone()
    }

    /// Recorded error and exception events
    pub fn errors(&self) -> Vec<ServiceEvent> {
        self.lock().iter().filter(|e| e.is_error()).cloned().collect()
    }

    /// Error types of the recorded update job errors, in order
    pub fn error_types(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                ServiceEvent::RecordUpdateJobError { error_type, .. } => Some(error_type.clone()),
                _ => None,
            })
            .collect()
    }

    /// Changes of the recorded create events
    pub fn created_pull_requests(&self) -> Vec<ChangeSummary> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                ServiceEvent::CreatePullRequest { change, .. } => Some(change.clone()),
                _ => None,
            })
            .collect()
    }

    /// Changes of the recorded update events
    pub fn updated_pull_requests(&self) -> Vec<ChangeSummary> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                ServiceEvent::UpdatePullRequest { change, .. } => Some(change.clone()),
                _ => None,
            })
            .collect()
    }

    /// Reasons of the recorded close events
    pub fn closed_pull_requests(&self) -> Vec<(Vec<String>, CloseReason)> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                ServiceEvent::ClosePullRequest {
                    dependency_names,
                    reason,
                } => Some((dependency_names.clone(), *reason)),
                _ => None,
            })
            .collect()
    }

    pub fn is_processed(&self) -> bool {
        self.processed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Service for RecordingService {
    async fn create_pull_request(&self, change: &DependencyChange, base_commit_sha: &str) {
        self.push(ServiceEvent::CreatePullRequest {
            change: ChangeSummary::from(change),
            base_commit_sha: base_commit_sha.to_string(),
        });
    }

    async fn update_pull_request(&self, change: &DependencyChange, base_commit_sha: &str) {
        self.push(ServiceEvent::UpdatePullRequest {
            change: ChangeSummary::from(change),
            base_commit_sha: base_commit_sha.to_string(),
        });
    }

    async fn close_pull_request(&self, dependency_names: &[String], reason: CloseReason) {
        self.push(ServiceEvent::ClosePullRequest {
            dependency_names: dependency_names.to_vec(),
            reason,
        });
    }

    async fn record_update_job_error(
        &self,
        error_type: &str,
        error_details: Option<Value>,
        dependency: Option<&Dependency>,
    ) {
        self.push(ServiceEvent::RecordUpdateJobError {
            error_type: error_type.to_string(),
            error_details,
            dependency: dependency.map(|d| d.name.clone()),
        });
    }

    async fn capture_exception(&self, report: ExceptionReport) {
        self.push(ServiceEvent::CaptureException { report });
    }

    async fn mark_job_as_processed(&self, base_commit_sha: &str) {
        if self.claim_processed() {
            self.push(ServiceEvent::MarkJobAsProcessed {
                base_commit_sha: base_commit_sha.to_string(),
            });
        }
    }
}
