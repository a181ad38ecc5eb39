//! Application error types using thiserror
//!
//! Error hierarchy:
//! - JobError: the job definition cannot be interpreted
//! - EcosystemError: failures raised by parser, update-checker and file-updater collaborators
//! - ChangeError: a change set was computed but is not actionable
//! - ApiError: transport failures while talking to the reporting API
//! - UpdaterError: the run stopped before its operation finished
//! - IoError-style variants live on AppError for reading local inputs

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Job definition errors
    #[error(transparent)]
    Job(#[from] JobError),

    /// Ecosystem collaborator errors
    #[error(transparent)]
    Ecosystem(#[from] EcosystemError),

    /// Change computation errors
    #[error(transparent)]
    Change(#[from] ChangeError),

    /// Reporting API errors
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Run-level errors
    #[error(transparent)]
    Updater(#[from] UpdaterError),

    /// Failed to read a local input file
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A replay scenario could not be decoded
    #[error("failed to parse scenario {path}: {message}")]
    Scenario { path: PathBuf, message: String },
}

/// Errors raised while interpreting a job definition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The definition document is not valid
    #[error("invalid job definition: {message}")]
    InvalidDefinition { message: String },

    /// Exactly one of `directory` / `directories` must be given
    #[error("job source must set exactly one of 'directory' or 'directories'")]
    DirectoryXorDirectories,

    /// A rule field carries a value outside its vocabulary
    #[error("invalid value '{value}' for {field}")]
    InvalidRuleValue { field: String, value: String },

    /// A version requirement string could not be parsed
    #[error("invalid version requirement '{requirement}': {message}")]
    InvalidRequirement {
        requirement: String,
        message: String,
    },
}

/// Failures reported by ecosystem collaborators
///
/// Deserializable (tagged by `type`) so recorded scenarios can script failures.
#[derive(Error, Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EcosystemError {
    #[error("dependency file not parseable: {file_path}: {message}")]
    DependencyFileNotParseable { file_path: String, message: String },

    #[error("dependency file not evaluatable: {message}")]
    DependencyFileNotEvaluatable { message: String },

    #[error("dependency file not resolvable: {message}")]
    DependencyFileNotResolvable { message: String },

    #[error("dependency file not found: {file_path}")]
    DependencyFileNotFound { file_path: String },

    #[error("branch not found: {branch_name}")]
    BranchNotFound { branch_name: String },

    #[error("repository not found: {repo}")]
    RepoNotFound { repo: String },

    #[error("path dependencies not reachable: {}", .dependencies.join(", "))]
    PathDependenciesNotReachable { dependencies: Vec<String> },

    #[error("git dependencies not reachable: {}", .dependency_urls.join(", "))]
    GitDependenciesNotReachable { dependency_urls: Vec<String> },

    #[error("git dependency reference not found: {dependency}")]
    GitDependencyReferenceNotFound { dependency: String },

    #[error("authentication failed for private source {registry}")]
    PrivateSourceAuthenticationFailure { registry: String },

    #[error("private source {registry} timed out")]
    PrivateSourceTimedOut { registry: String },

    #[error("certificate verification failed for private source {registry}")]
    PrivateSourceCertificateFailure { registry: String },

    #[error("missing environment variable {environment_variable}")]
    MissingEnvironmentVariable { environment_variable: String },

    #[error("go module path mismatch in {go_mod}: declared {declared_path}, discovered {discovered_path}")]
    GoModulePathMismatch {
        go_mod: String,
        declared_path: String,
        discovered_path: String,
    },

    #[error("not implemented: {message}")]
    NotImplemented { message: String },

    #[error("helper subprocess {fingerprint} failed: {message}")]
    HelperSubprocessFailed { fingerprint: String, message: String },

    #[error("inconsistent registry response: {message}")]
    InconsistentRegistryResponse { message: String },

    #[error("all versions of {dependency} are ignored")]
    AllVersionsIgnored { dependency: String },

    #[error("out of disk space")]
    OutOfDisk,

    #[error("out of memory")]
    OutOfMemory,

    #[error("unexpected external code")]
    UnexpectedExternalCode,

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("rate limited by the git host")]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("git host server error: {message}")]
    ServerError { message: String },

    #[error("{message}")]
    Other { message: String },
}

impl EcosystemError {
    /// Returns the error type reported when this error halts the whole run
    pub fn run_halting_type(&self) -> Option<&'static str> {
        match self {
            EcosystemError::OutOfDisk => Some("out_of_disk"),
            EcosystemError::OutOfMemory => Some("out_of_memory"),
            EcosystemError::AllVersionsIgnored { .. } => Some("all_versions_ignored"),
            EcosystemError::UnexpectedExternalCode => Some("unexpected_external_code"),
            EcosystemError::Unauthorized { .. } => Some("octokit_unauthorized"),
            _ => None,
        }
    }

    /// Returns true if this error stops the run
    pub fn is_run_halting(&self) -> bool {
        self.run_halting_type().is_some()
    }

    /// Short variant name used in logs and exception reports
    pub fn kind(&self) -> &'static str {
        match self {
            EcosystemError::DependencyFileNotParseable { .. } => "DependencyFileNotParseable",
            EcosystemError::DependencyFileNotEvaluatable { .. } => "DependencyFileNotEvaluatable",
            EcosystemError::DependencyFileNotResolvable { .. } => "DependencyFileNotResolvable",
            EcosystemError::DependencyFileNotFound { .. } => "DependencyFileNotFound",
            EcosystemError::BranchNotFound { .. } => "BranchNotFound",
            EcosystemError::RepoNotFound { .. } => "RepoNotFound",
            EcosystemError::PathDependenciesNotReachable { .. } => "PathDependenciesNotReachable",
            EcosystemError::GitDependenciesNotReachable { .. } => "GitDependenciesNotReachable",
            EcosystemError::GitDependencyReferenceNotFound { .. } => {
                "GitDependencyReferenceNotFound"
            }
            EcosystemError::PrivateSourceAuthenticationFailure { .. } => {
                "PrivateSourceAuthenticationFailure"
            }
            EcosystemError::PrivateSourceTimedOut { .. } => "PrivateSourceTimedOut",
            EcosystemError::PrivateSourceCertificateFailure { .. } => {
                "PrivateSourceCertificateFailure"
            }
            EcosystemError::MissingEnvironmentVariable { .. } => "MissingEnvironmentVariable",
            EcosystemError::GoModulePathMismatch { .. } => "GoModulePathMismatch",
            EcosystemError::NotImplemented { .. } => "NotImplemented",
            EcosystemError::HelperSubprocessFailed { .. } => "HelperSubprocessFailed",
            EcosystemError::InconsistentRegistryResponse { .. } => "InconsistentRegistryResponse",
            EcosystemError::AllVersionsIgnored { .. } => "AllVersionsIgnored",
            EcosystemError::OutOfDisk => "OutOfDisk",
            EcosystemError::OutOfMemory => "OutOfMemory",
            EcosystemError::UnexpectedExternalCode => "UnexpectedExternalCode",
            EcosystemError::Unauthorized { .. } => "Unauthorized",
            EcosystemError::RateLimited { .. } => "RateLimited",
            EcosystemError::ServerError { .. } => "ServerError",
            EcosystemError::Other { .. } => "Other",
        }
    }

    /// Error type string reported to the service
    pub fn error_type(&self) -> &'static str {
        if let Some(halting) = self.run_halting_type() {
            return halting;
        }
        match self {
            EcosystemError::DependencyFileNotParseable { .. } => "dependency_file_not_parseable",
            EcosystemError::DependencyFileNotEvaluatable { .. } => "dependency_file_not_evaluatable",
            EcosystemError::DependencyFileNotResolvable { .. } => "dependency_file_not_resolvable",
            EcosystemError::DependencyFileNotFound { .. } => "dependency_file_not_found",
            EcosystemError::BranchNotFound { .. } => "branch_not_found",
            EcosystemError::RepoNotFound { .. } => "repo_not_found",
            EcosystemError::PathDependenciesNotReachable { .. } => "path_dependencies_not_reachable",
            EcosystemError::GitDependenciesNotReachable { .. } => "git_dependencies_not_reachable",
            EcosystemError::GitDependencyReferenceNotFound { .. } => {
                "git_dependency_reference_not_found"
            }
            EcosystemError::PrivateSourceAuthenticationFailure { .. } => {
                "private_source_authentication_failure"
            }
            EcosystemError::PrivateSourceTimedOut { .. } => "private_source_timed_out",
            EcosystemError::PrivateSourceCertificateFailure { .. } => {
                "private_source_certificate_failure"
            }
            EcosystemError::MissingEnvironmentVariable { .. } => "missing_environment_variable",
            EcosystemError::GoModulePathMismatch { .. } => "go_module_path_mismatch",
            EcosystemError::NotImplemented { .. } => "not_implemented",
            EcosystemError::InconsistentRegistryResponse { .. } => "inconsistent_registry_response",
            EcosystemError::RateLimited { .. } => "octokit_rate_limited",
            _ => "unknown_error",
        }
    }

    /// Structured details reported alongside [`error_type`](Self::error_type)
    pub fn error_details(&self) -> Option<Value> {
        let details = match self {
            EcosystemError::DependencyFileNotParseable { file_path, message } => {
                json!({ "message": message, "file-path": file_path })
            }
            EcosystemError::DependencyFileNotEvaluatable { message }
            | EcosystemError::DependencyFileNotResolvable { message }
            | EcosystemError::NotImplemented { message }
            | EcosystemError::InconsistentRegistryResponse { message } => json!({ "message": message }),
            EcosystemError::DependencyFileNotFound { file_path } => json!({ "file-path": file_path }),
            EcosystemError::BranchNotFound { branch_name } => json!({ "branch-name": branch_name }),
            EcosystemError::PathDependenciesNotReachable { dependencies } => {
                json!({ "dependencies": dependencies })
            }
            EcosystemError::GitDependenciesNotReachable { dependency_urls } => {
                json!({ "dependency-urls": dependency_urls })
            }
            EcosystemError::GitDependencyReferenceNotFound { dependency } => {
                json!({ "dependency": dependency })
            }
            EcosystemError::PrivateSourceAuthenticationFailure { registry }
            | EcosystemError::PrivateSourceTimedOut { registry }
            | EcosystemError::PrivateSourceCertificateFailure { registry } => json!({ "source": registry }),
            EcosystemError::MissingEnvironmentVariable { environment_variable } => {
                json!({ "environment-variable": environment_variable })
            }
            EcosystemError::GoModulePathMismatch {
                go_mod,
                declared_path,
                discovered_path,
            } => json!({
                "declared-path": declared_path,
                "discovered-path": discovered_path,
                "go-mod": go_mod,
            }),
            EcosystemError::AllVersionsIgnored { dependency } => json!({ "dependency-name": dependency }),
            EcosystemError::RateLimited { reset_at } => {
                json!({ "rate-limit-reset": reset_at.map(|t| t.timestamp()) })
            }
            _ => return None,
        };
        Some(details)
    }

    /// Creates a new AllVersionsIgnored error
    pub fn all_versions_ignored(dependency: impl Into<String>) -> Self {
        EcosystemError::AllVersionsIgnored {
            dependency: dependency.into(),
        }
    }

    /// Creates a new DependencyFileNotParseable error
    pub fn not_parseable(file_path: impl Into<String>, message: impl Into<String>) -> Self {
        EcosystemError::DependencyFileNotParseable {
            file_path: file_path.into(),
            message: message.into(),
        }
    }

    /// Creates a new Other error
    pub fn other(message: impl Into<String>) -> Self {
        EcosystemError::Other {
            message: message.into(),
        }
    }
}

/// Errors that make a computed change set unusable
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChangeError {
    /// Some updated dependency is meaningless: no previous version and no requirement change
    #[error(
        "invalid updated dependencies: no previous version for [{}], no requirements change for [{}]",
        .no_previous_version.join(", "),
        .no_requirements_change.join(", ")
    )]
    InvalidUpdatedDependencies {
        no_previous_version: Vec<String>,
        no_requirements_change: Vec<String>,
    },

    /// No dependency files live in the job's directory
    #[error("no dependency files found in directory {directory}")]
    NoFilesForDirectory { directory: String },

    /// The file updater produced nothing
    #[error("no files changed when updating {}", .dependencies.join(", "))]
    NoFilesChanged { dependencies: Vec<String> },

    /// Every updated file was removed by the exclude-paths filter
    #[error("no files left to update after applying exclude paths: {}", .excluded.join(", "))]
    NoUpdateFilesAfterExclude { excluded: Vec<String> },

    /// The file updater failed
    #[error(transparent)]
    Ecosystem(#[from] EcosystemError),
}

/// Any failure while processing a single dependency or group
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpdateError {
    #[error(transparent)]
    Ecosystem(#[from] EcosystemError),

    #[error(transparent)]
    Change(ChangeError),
}

impl From<ChangeError> for UpdateError {
    fn from(error: ChangeError) -> Self {
        match error {
            ChangeError::Ecosystem(inner) => UpdateError::Ecosystem(inner),
            other => UpdateError::Change(other),
        }
    }
}

impl UpdateError {
    /// Returns the halting error type if this failure stops the run
    pub fn run_halting_type(&self) -> Option<&'static str> {
        match self {
            UpdateError::Ecosystem(e) => e.run_halting_type(),
            UpdateError::Change(_) => None,
        }
    }
}

/// Errors talking to the reporting API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Could not build the HTTP client
    #[error("failed to create HTTP client: {message}")]
    Client { message: String },

    /// Connection-level failure (DNS, refused, TLS)
    #[error("connection to {url} failed: {message}")]
    Connection { url: String, message: String },

    /// Request timed out
    #[error("timeout while calling {url}")]
    Timeout { url: String },

    /// Non-success HTTP status
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
}

impl ApiError {
    /// Returns true if a retry may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Connection { .. } | ApiError::Timeout { .. } => true,
            ApiError::Status { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            ApiError::Client { .. } => false,
        }
    }
}

/// A run-halting condition, reported once before the run stops
#[derive(Error, Debug, Clone, PartialEq)]
#[error("run halted ({error_type}): {cause}")]
pub struct HaltingError {
    pub error_type: &'static str,
    pub cause: EcosystemError,
}

impl HaltingError {
    /// Wraps an ecosystem error if it belongs to the halting set
    pub fn from_ecosystem(error: &EcosystemError) -> Option<Self> {
        error.run_halting_type().map(|error_type| HaltingError {
            error_type,
            cause: error.clone(),
        })
    }
}

/// Errors that end a run early
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpdaterError {
    #[error(transparent)]
    Halted(#[from] HaltingError),

    #[error("no operation applies to job {job_id}")]
    NoOperation { job_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_halting_types() {
        assert_eq!(EcosystemError::OutOfDisk.run_halting_type(), Some("out_of_disk"));
        assert_eq!(
            EcosystemError::OutOfMemory.run_halting_type(),
            Some("out_of_memory")
        );
        assert_eq!(
            EcosystemError::all_versions_ignored("rails").run_halting_type(),
            Some("all_versions_ignored")
        );
        assert_eq!(
            EcosystemError::UnexpectedExternalCode.run_halting_type(),
            Some("unexpected_external_code")
        );
        assert_eq!(
            EcosystemError::Unauthorized {
                message: "bad credentials".to_string()
            }
            .run_halting_type(),
            Some("octokit_unauthorized")
        );
    }

    #[test]
    fn test_error_type_and_details() {
        let err = EcosystemError::GoModulePathMismatch {
            go_mod: "go.mod".to_string(),
            declared_path: "example.com/a".to_string(),
            discovered_path: "example.com/b".to_string(),
        };
        assert_eq!(err.error_type(), "go_module_path_mismatch");
        assert_eq!(
            err.error_details(),
            Some(json!({
                "declared-path": "example.com/a",
                "discovered-path": "example.com/b",
                "go-mod": "go.mod"
            }))
        );

        let err = EcosystemError::PrivateSourceTimedOut {
            registry: "npm.internal".to_string(),
        };
        assert_eq!(err.error_details(), Some(json!({ "source": "npm.internal" })));
        assert_eq!(EcosystemError::other("boom").error_type(), "unknown_error");
        assert_eq!(EcosystemError::other("boom").error_details(), None);
        assert_eq!(EcosystemError::OutOfDisk.error_type(), "out_of_disk");
    }

    #[test]
    fn test_deserialize_tagged() {
        let err: EcosystemError =
            serde_json::from_str(r#"{"type": "dependency_file_not_resolvable", "message": "conflict"}"#).unwrap();
        assert_eq!(
            err,
            EcosystemError::DependencyFileNotResolvable {
                message: "conflict".to_string()
            }
        );
        let err: EcosystemError = serde_json::from_str(r#"{"type": "out_of_memory"}"#).unwrap();
        assert_eq!(err, EcosystemError::OutOfMemory);
    }

    #[test]
    fn test_non_halting_errors() {
        assert!(!EcosystemError::not_parseable("Gemfile", "oops").is_run_halting());
        assert!(!EcosystemError::RateLimited { reset_at: None }.is_run_halting());
        assert!(!EcosystemError::other("boom").is_run_halting());
    }

    #[test]
    fn test_invalid_updated_dependencies_message() {
        let err = ChangeError::InvalidUpdatedDependencies {
            no_previous_version: vec!["x".to_string()],
            no_requirements_change: vec!["x".to_string(), "y".to_string()],
        };
        let msg = format!("{}", err);
        assert!(msg.contains("no previous version for [x]"));
        assert!(msg.contains("no requirements change for [x, y]"));
    }

    #[test]
    fn test_update_error_unwraps_change_ecosystem() {
        let err: UpdateError = ChangeError::Ecosystem(EcosystemError::OutOfDisk).into();
        assert_eq!(err, UpdateError::Ecosystem(EcosystemError::OutOfDisk));
        assert_eq!(err.run_halting_type(), Some("out_of_disk"));

        let err: UpdateError = ChangeError::NoFilesChanged {
            dependencies: vec!["a".to_string()],
        }
        .into();
        assert!(matches!(err, UpdateError::Change(_)));
        assert_eq!(err.run_halting_type(), None);
    }

    #[test]
    fn test_api_error_retryable() {
        assert!(ApiError::Timeout {
            url: "http://api".to_string()
        }
        .is_retryable());
        assert!(ApiError::Status {
            url: "http://api".to_string(),
            status: 502
        }
        .is_retryable());
        assert!(!ApiError::Status {
            url: "http://api".to_string(),
            status: 400
        }
        .is_retryable());
        assert!(!ApiError::Status {
            url: "http://api".to_string(),
            status: 501
        }
        .is_retryable());
    }

    #[test]
    fn test_halting_error_from_ecosystem() {
        let halting = HaltingError::from_ecosystem(&EcosystemError::OutOfMemory).unwrap();
        assert_eq!(halting.error_type, "out_of_memory");
        assert!(HaltingError::from_ecosystem(&EcosystemError::other("x")).is_none());
    }

    #[test]
    fn test_job_error_messages() {
        let msg = format!("{}", JobError::DirectoryXorDirectories);
        assert!(msg.contains("exactly one of 'directory' or 'directories'"));

        let msg = format!(
            "{}",
            JobError::InvalidRuleValue {
                field: "dependency-type".to_string(),
                value: "optional".to_string()
            }
        );
        assert!(msg.contains("'optional'"));
    }

    #[test]
    fn test_app_error_from_job_error() {
        let app_err: AppError = JobError::DirectoryXorDirectories.into();
        let msg = format!("{}", app_err);
        assert!(msg.contains("directories"));
    }
}
