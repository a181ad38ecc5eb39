//! Error reporting for the update run
//!
//! - Known collaborator errors are recorded with their error type and details
//! - Anything unexpected is also captured as an exception, and recorded as `unknown_error`
//! - Run-halting errors are handed back to the caller instead of being recorded
//! - Inconsistent registry responses are only logged

use crate::domain::Dependency;
use crate::error::{ChangeError, EcosystemError, HaltingError, UpdateError};
use crate::group::DependencyGroup;
use crate::job::Job;
use crate::service::{ExceptionReport, Service};
use serde_json::Value;
use tracing::{error, info};

const UNKNOWN_ERROR: &str = "unknown_error";

/// Reports failures of one dependency, group or parse to the service
#[derive(Clone, Copy)]
pub struct ErrorHandler<'a> {
    service: &'a dyn Service,
    job: &'a Job,
}

impl<'a> ErrorHandler<'a> {
    pub fn new(service: &'a dyn Service, job: &'a Job) -> Self {
        Self { service, job }
    }

    /// Reports a failure while updating `dependency` (or `group`)
    ///
    /// Returns the halting error when the failure must stop the run.
    pub async fn handle_dependency_error(
        &self,
        error: UpdateError,
        dependency: Option<&Dependency>,
        group: Option<&DependencyGroup>,
    ) -> Result<(), HaltingError> {
        let subject = subject_name(dependency, group);

        let error = match error {
            UpdateError::Ecosystem(error) => error,
            UpdateError::Change(change_error) => {
                let kind = change_error_kind(&change_error);
                self.capture(kind, change_error.to_string(), dependency, group)
                    .await;
                self.service
                    .record_update_job_error(UNKNOWN_ERROR, None, dependency)
                    .await;
                self.log_error(&subject, kind, &change_error.to_string(), UNKNOWN_ERROR, None);
                return Ok(());
            }
        };

        if let Some(halting) = HaltingError::from_ecosystem(&error) {
            return Err(halting);
        }

        if let EcosystemError::InconsistentRegistryResponse { message } = &error {
            self.log_error(
                &subject,
                error.kind(),
                message,
                "inconsistent_registry_response",
                Some(&Value::String(message.clone())),
            );
            return Ok(());
        }

        if let EcosystemError::HelperSubprocessFailed { fingerprint, .. } = &error {
            let sanitized = format!(
                "Subprocess {} failed to run. Check the job logs for error messages",
                fingerprint
            );
            self.capture(error.kind(), sanitized, dependency, group).await;
            self.service
                .record_update_job_error(UNKNOWN_ERROR, None, dependency)
                .await;
            self.log_error(&subject, error.kind(), &error.to_string(), UNKNOWN_ERROR, None);
            return Ok(());
        }

        let error_type = error.error_type();
        if error_type == UNKNOWN_ERROR {
            self.capture(error.kind(), error.to_string(), dependency, group)
                .await;
            self.service
                .record_update_job_error(UNKNOWN_ERROR, None, dependency)
                .await;
            self.log_error(&subject, error.kind(), &error.to_string(), UNKNOWN_ERROR, None);
            return Ok(());
        }

        let details = error.error_details();
        self.service
            .record_update_job_error(error_type, details.clone(), dependency)
            .await;
        self.log_error(&subject, error.kind(), &error.to_string(), error_type, details.as_ref());
        Ok(())
    }

    /// Reports a failure to parse the dependency files
    ///
    /// Returns the recorded error type; a repository that disappeared is not
    /// recorded.
    pub async fn handle_parser_error(&self, error: &EcosystemError) -> Option<&'static str> {
        if matches!(error, EcosystemError::RepoNotFound { .. }) {
            info!("Repository no longer exists: {}", error);
            return None;
        }

        let error_type = if is_known_parser_error(error) {
            let error_type = error.error_type();
            self.service
                .record_update_job_error(error_type, error.error_details(), None)
                .await;
            error_type
        } else if let Some(halting) = error.run_halting_type() {
            self.service.record_update_job_error(halting, None, None).await;
            halting
        } else if matches!(error, EcosystemError::ServerError { .. }) {
            self.service
                .record_update_job_error(UNKNOWN_ERROR, None, None)
                .await;
            UNKNOWN_ERROR
        } else {
            error!("Error parsing dependency files ({}): {}", error.kind(), error);
            self.capture(error.kind(), error.to_string(), None, None).await;
            self.service
                .record_update_job_error(UNKNOWN_ERROR, None, None)
                .await;
            UNKNOWN_ERROR
        };

        info!("Handled error whilst parsing dependency files: {} {}", error_type, error);
        Some(error_type)
    }

    /// Logs a per-dependency failure the way operators expect to read it
    pub fn log_error(
        &self,
        subject: &str,
        kind: &str,
        message: &str,
        error_type: &str,
        detail: Option<&Value>,
    ) {
        if error_type == UNKNOWN_ERROR {
            error!(job_id = %self.job.id, "Error processing {} ({})", subject, kind);
            error!(job_id = %self.job.id, "{}", message);
        } else {
            let detail = detail.map(Value::to_string).unwrap_or_default();
            info!(
                "Handled error whilst updating {}: {} {}",
                subject, error_type, detail
            );
        }
    }

    async fn capture(
        &self,
        kind: &str,
        message: String,
        dependency: Option<&Dependency>,
        group: Option<&DependencyGroup>,
    ) {
        let mut report = ExceptionReport::new(kind, message);
        if let Some(dependency) = dependency {
            report = report.with_dependency(&dependency.name);
        }
        if let Some(group) = group {
            report = report.with_dependency_group(&group.name);
        }
        self.service.capture_exception(report).await;
    }
}

fn subject_name(dependency: Option<&Dependency>, group: Option<&DependencyGroup>) -> String {
    match (dependency, group) {
        (Some(dependency), _) => dependency.name.clone(),
        (None, Some(group)) => group.name.clone(),
        (None, None) => "unknown".to_string(),
    }
}

fn change_error_kind(error: &ChangeError) -> &'static str {
    match error {
        ChangeError::InvalidUpdatedDependencies { .. } => "InvalidUpdatedDependencies",
        ChangeError::NoFilesForDirectory { .. } => "NoFilesForDirectory",
        ChangeError::NoFilesChanged { .. } => "NoFilesChanged",
        ChangeError::NoUpdateFilesAfterExclude { .. } => "NoUpdateFilesAfterExclude",
        ChangeError::Ecosystem(inner) => inner.kind(),
    }
}

fn is_known_parser_error(error: &EcosystemError) -> bool {
    matches!(
        error,
        EcosystemError::DependencyFileNotEvaluatable { .. }
            | EcosystemError::DependencyFileNotResolvable { .. }
            | EcosystemError::BranchNotFound { .. }
            | EcosystemError::DependencyFileNotParseable { .. }
            | EcosystemError::DependencyFileNotFound { .. }
            | EcosystemError::PathDependenciesNotReachable { .. }
            | EcosystemError::PrivateSourceAuthenticationFailure { .. }
            | EcosystemError::GitDependenciesNotReachable { .. }
            | EcosystemError::NotImplemented { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PackageManager;
    use crate::job::Source;
    use crate::service::{RecordingService, ServiceEvent};

    fn job() -> Job {
        Job::new("1", PackageManager::Bundler, Source::new("acme/app", "/"))
    }

    fn rails() -> Dependency {
        Dependency::new("rails", Some("7.0.0"), PackageManager::Bundler)
    }

    #[tokio::test]
    async fn test_known_error_is_recorded_with_details() {
        let service = RecordingService::new();
        let job = job();
        let handler = ErrorHandler::new(&service, &job);

        let error = EcosystemError::DependencyFileNotResolvable {
            message: "conflict".to_string(),
        };
        handler
            .handle_dependency_error(error.into(), Some(&rails()), None)
            .await
            .unwrap();

        assert_eq!(
            service.events(),
            vec![ServiceEvent::RecordUpdateJobError {
                error_type: "dependency_file_not_resolvable".to_string(),
                error_details: Some(serde_json::json!({ "message": "conflict" })),
                dependency: Some("rails".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_unknown_error_is_captured() {
        let service = RecordingService::new();
        let job = job();
        let handler = ErrorHandler::new(&service, &job);

        handler
            .handle_dependency_error(EcosystemError::other("boom").into(), Some(&rails()), None)
            .await
            .unwrap();

        let events = service.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            ServiceEvent::CaptureException { report } if report.error_class == "Other"
                && report.dependency.as_deref() == Some("rails")
        ));
        assert_eq!(service.error_types(), vec!["unknown_error".to_string()]);
    }

    #[tokio::test]
    async fn test_subprocess_failure_is_sanitized() {
        let service = RecordingService::new();
        let job = job();
        let handler = ErrorHandler::new(&service, &job);

        let error = EcosystemError::HelperSubprocessFailed {
            fingerprint: "npm-install".to_string(),
            message: "token=secret".to_string(),
        };
        let group = DependencyGroup::new("frontend");
        handler
            .handle_dependency_error(error.into(), None, Some(&group))
            .await
            .unwrap();

        match &service.events()[0] {
            ServiceEvent::CaptureException { report } => {
                assert_eq!(
                    report.message,
                    "Subprocess npm-install failed to run. Check the job logs for error messages"
                );
                assert_eq!(report.dependency_group.as_deref(), Some("frontend"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_halting_error_is_returned() {
        let service = RecordingService::new();
        let job = job();
        let handler = ErrorHandler::new(&service, &job);

        let halted = handler
            .handle_dependency_error(EcosystemError::OutOfDisk.into(), Some(&rails()), None)
            .await
            .unwrap_err();

        assert_eq!(halted.error_type, "out_of_disk");
        assert!(service.events().is_empty());
    }

    #[tokio::test]
    async fn test_inconsistent_registry_response_is_only_logged() {
        let service = RecordingService::new();
        let job = job();
        let handler = ErrorHandler::new(&service, &job);

        let error = EcosystemError::InconsistentRegistryResponse {
            message: "stale index".to_string(),
        };
        handler
            .handle_dependency_error(error.into(), Some(&rails()), None)
            .await
            .unwrap();

        assert!(service.events().is_empty());
    }

    #[tokio::test]
    async fn test_change_error_is_unknown() {
        let service = RecordingService::new();
        let job = job();
        let handler = ErrorHandler::new(&service, &job);

        let error = ChangeError::NoFilesChanged {
            dependencies: vec!["rails".to_string()],
        };
        handler
            .handle_dependency_error(error.into(), Some(&rails()), None)
            .await
            .unwrap();

        assert_eq!(service.error_types(), vec!["unknown_error".to_string()]);
        assert_eq!(service.errors().len(), 2);
    }

    #[tokio::test]
    async fn test_parser_errors() {
        let service = RecordingService::new();
        let job = job();
        let handler = ErrorHandler::new(&service, &job);

        let repo_gone = EcosystemError::RepoNotFound {
            repo: "acme/app".to_string(),
        };
        assert_eq!(handler.handle_parser_error(&repo_gone).await, None);

        let unparseable = EcosystemError::not_parseable("Gemfile", "syntax error");
        assert_eq!(
            handler.handle_parser_error(&unparseable).await,
            Some("dependency_file_not_parseable")
        );

        let server = EcosystemError::ServerError {
            message: "502".to_string(),
        };
        assert_eq!(handler.handle_parser_error(&server).await, Some("unknown_error"));

        assert_eq!(
            service.error_types(),
            vec![
                "dependency_file_not_parseable".to_string(),
                "unknown_error".to_string()
            ]
        );
        assert_eq!(service.errors().len(), 2);
    }
}
