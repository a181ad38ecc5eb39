//! Reporting sink backed by the update-job API
//!
//! Every call is recorded locally and posted to
//! `{api_url}/update_jobs/{job_id}/{action}` on a background task. Closing a
//! pull request and marking the job as processed first drain the outstanding
//! posts and then post in the foreground, so a pull request created after a
//! close always reaches the API after it.

use super::{ApiClient, CloseReason, ExceptionReport, RecordingService, Service};
use crate::change::DependencyChange;
use crate::domain::Dependency;
use crate::error::ApiError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Where and as whom to report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub api_url: String,
    pub job_id: String,
}

impl ApiSettings {
    pub fn new(api_url: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            job_id: job_id.into(),
        }
    }

    /// Endpoint of one action
    pub fn url_for(&self, action: &str) -> String {
        format!(
            "{}/update_jobs/{}/{}",
            self.api_url.trim_end_matches('/'),
            self.job_id,
            action
        )
    }
}

/// Posts every reported event to the API
pub struct ApiService {
    client: ApiClient,
    settings: ApiSettings,
    recorder: RecordingService,
    pending: Mutex<JoinSet<Result<(), ApiError>>>,
    failures: AtomicUsize,
}

impl ApiService {
    pub fn new(client: ApiClient, settings: ApiSettings) -> Self {
        Self {
            client,
            settings,
            recorder: RecordingService::new(),
            pending: Mutex::new(JoinSet::new()),
            failures: AtomicUsize::new(0),
        }
    }

    /// The events reported so far
    pub fn recorded(&self) -> &RecordingService {
        &self.recorder
    }

    /// Number of posts that failed after retries
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    async fn dispatch(&self, action: &'static str, payload: Value) {
        let client = self.client.clone();
        let url = self.settings.url_for(action);
        debug!(action, "Queueing API call");
        self.pending
            .lock()
            .await
            .spawn(async move { client.post_json(&url, &payload).await });
    }

    /// Posts after every queued call has finished
    async fn post_in_order(&self, action: &'static str, payload: Value) -> bool {
        self.drain().await;
        let url = self.settings.url_for(action);
        match self.client.post_json(&url, &payload).await {
            Ok(()) => true,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::SeqCst);
                error!("API call {} failed: {}", action, e);
                false
            }
        }
    }

    async fn drain(&self) {
        let mut pending = self.pending.lock().await;
        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.failures.fetch_add(1, Ordering::SeqCst);
                    error!("API call failed: {}", e);
                }
                Err(e) => {
                    self.failures.fetch_add(1, Ordering::SeqCst);
                    error!("API task failed: {}", e);
                }
            }
        }
    }
}

fn change_payload(change: &DependencyChange, base_commit_sha: &str) -> Value {
    let dependencies: Vec<Value> = change
        .updated_dependencies
        .iter()
        .map(|d| {
            json!({
                "name": d.name,
                "version": d.version,
                "previous-version": d.previous_version,
                "requirements": d.requirements,
                "previous-requirements": d.previous_requirements,
                "directory": d.directory,
                "removed": d.removed,
            })
        })
        .collect();
    let files: Vec<Value> = change
        .updated_dependency_files
        .iter()
        .map(|f| {
            json!({
                "name": f.name,
                "directory": f.directory,
                "content": f.content,
                "deleted": f.deleted,
            })
        })
        .collect();

    let mut data = json!({
        "dependencies": dependencies,
        "updated-dependency-files": files,
        "base-commit-sha": base_commit_sha,
    });
    if let Some(group) = &change.dependency_group {
        data["grouped-update"] = json!(true);
        data["dependency-group"] = json!({ "name": group.name });
    }
    json!({ "data": data })
}

#[async_trait]
impl Service for ApiService {
    async fn create_pull_request(&self, change: &DependencyChange, base_commit_sha: &str) {
        self.recorder.create_pull_request(change, base_commit_sha).await;
        self.dispatch("create_pull_request", change_payload(change, base_commit_sha))
            .await;
    }

    async fn update_pull_request(&self, change: &DependencyChange, base_commit_sha: &str) {
        self.recorder.update_pull_request(change, base_commit_sha).await;
        self.dispatch("update_pull_request", change_payload(change, base_commit_sha))
            .await;
    }

    async fn close_pull_request(&self, dependency_names: &[String], reason: CloseReason) {
        self.recorder.close_pull_request(dependency_names, reason).await;
        self.post_in_order(
            "close_pull_request",
            json!({ "data": { "dependency-names": dependency_names, "reason": reason } }),
        )
        .await;
    }

    async fn record_update_job_error(
        &self,
        error_type: &str,
        error_details: Option<Value>,
        dependency: Option<&Dependency>,
    ) {
        self.recorder
            .record_update_job_error(error_type, error_details.clone(), dependency)
            .await;
        self.dispatch(
            "record_update_job_error",
            json!({ "data": { "error-type": error_type, "error-details": error_details } }),
        )
        .await;
    }

    async fn capture_exception(&self, report: ExceptionReport) {
        let payload = json!({
            "data": {
                "error-type": "unknown_error",
                "error-details": {
                    "error-class": report.error_class,
                    "error-message": report.message,
                    "dependency-name": report.dependency,
                    "dependency-group": report.dependency_group,
                    "job-id": self.settings.job_id,
                }
            }
        });
        self.recorder.capture_exception(report).await;
        self.dispatch("record_update_job_unknown_error", payload).await;
    }

    async fn mark_job_as_processed(&self, base_commit_sha: &str) {
        if !self.recorder.claim_processed() {
            debug!("Job already marked as processed");
            return;
        }
        self.recorder.push(super::ServiceEvent::MarkJobAsProcessed {
            base_commit_sha: base_commit_sha.to_string(),
        });

        let payload = json!({ "data": { "base-commit-sha": base_commit_sha } });
        if self.post_in_order("mark_as_processed", payload).await {
            info!(job_id = %self.settings.job_id, "Marked job as processed");
        }
    }
}
