//! Update run driver
//!
//! - Parses the dependency files into a [`DependencySnapshot`]
//! - Resolves the [`Operation`] that applies to the job and runs it
//! - Reports a run-halting error once, then stops
//! - Always finishes by marking the job as processed

mod error_handler;
mod operations;

pub use error_handler::ErrorHandler;
pub use operations::Operation;

use crate::domain::DependencyFile;
use crate::ecosystem::Ecosystem;
use crate::error::{EcosystemError, HaltingError, UpdaterError};
use crate::job::Job;
use crate::service::{ExceptionReport, Service};
use crate::snapshot::DependencySnapshot;
use operations::OperationContext;
use serde::Serialize;
use tracing::{error, info, warn};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The operation ran to the end
    Completed { operation: Operation },
    /// No operation applies to the job
    NoOperation,
    /// The dependency files could not be parsed
    ParseFailed { error_type: Option<&'static str> },
    /// A run-halting error stopped the operation
    Halted { error_type: &'static str },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// Runs one operation against a parsed snapshot
pub struct Updater<'a> {
    job: &'a Job,
    snapshot: DependencySnapshot,
    ecosystem: &'a dyn Ecosystem,
    service: &'a dyn Service,
}

impl<'a> Updater<'a> {
    pub fn new(
        job: &'a Job,
        snapshot: DependencySnapshot,
        ecosystem: &'a dyn Ecosystem,
        service: &'a dyn Service,
    ) -> Self {
        Self {
            job,
            snapshot,
            ecosystem,
            service,
        }
    }

    /// Runs the operation resolved for the job
    ///
    /// Per-dependency errors are reported as they happen; only run-halting
    /// errors come back as `Err`.
    pub async fn run(&mut self) -> Result<Operation, UpdaterError> {
        let operation = Operation::for_job(self.job).ok_or_else(|| UpdaterError::NoOperation {
            job_id: self.job.id.clone(),
        })?;
        info!(job_id = %self.job.id, operation = operation.tag_name(), "Running {}", operation);

        let mut ops = OperationContext::new(
            self.job,
            self.ecosystem,
            self.service,
            self.snapshot.base_commit_sha(),
        );
        operation.perform(&mut ops, &mut self.snapshot).await?;
        Ok(operation)
    }

    /// The snapshot, with the dependencies handled so far
    pub fn snapshot(&self) -> &DependencySnapshot {
        &self.snapshot
    }

    /// Reports a halting error once
    ///
    /// Every version being ignored is expected in security-only runs. Anywhere
    /// else it means an earlier filter was skipped, so it is captured as an
    /// exception instead of being recorded.
    pub async fn report_halting_error(&self, halted: &HaltingError) {
        report_halting_error(self.job, self.service, halted).await;
    }
}

async fn report_halting_error(job: &Job, service: &dyn Service, halted: &HaltingError) {
    if matches!(halted.cause, EcosystemError::AllVersionsIgnored { .. }) && !job.security_updates_only {
        error!("AllVersionsIgnored was unexpectedly raised for a non-security update job");
        service
            .capture_exception(ExceptionReport::new(
                halted.cause.kind(),
                "AllVersionsIgnored was unexpectedly raised for a non-security update job",
            ))
            .await;
        return;
    }

    warn!(error_type = halted.error_type, "Run halted: {}", halted.cause);
    service
        .record_update_job_error(halted.error_type, None, None)
        .await;
}

/// Parses `files`, runs the job and marks it as processed
pub async fn run_job(
    job: &Job,
    files: Vec<DependencyFile>,
    base_commit_sha: &str,
    ecosystem: &dyn Ecosystem,
    service: &dyn Service,
) -> RunOutcome {
    let outcome = run_until_done(job, files, base_commit_sha, ecosystem, service).await;
    service.mark_job_as_processed(base_commit_sha).await;
    info!(job_id = %job.id, ?outcome, "Finished update job");
    outcome
}

async fn run_until_done(
    job: &Job,
    files: Vec<DependencyFile>,
    base_commit_sha: &str,
    ecosystem: &dyn Ecosystem,
    service: &dyn Service,
) -> RunOutcome {
    let snapshot = match DependencySnapshot::from_parser(job, files, base_commit_sha, ecosystem.file_parser()) {
        Ok(snapshot) => snapshot,
        Err(error) => {
            let error_type = ErrorHandler::new(service, job).handle_parser_error(&error).await;
            return RunOutcome::ParseFailed { error_type };
        }
    };

    let mut updater = Updater::new(job, snapshot, ecosystem, service);
    match updater.run().await {
        Ok(operation) => RunOutcome::Completed { operation },
        Err(UpdaterError::Halted(halted)) => {
            updater.report_halting_error(&halted).await;
            RunOutcome::Halted {
                error_type: halted.error_type,
            }
        }
        Err(UpdaterError::NoOperation { job_id }) => {
            error!(job_id = %job_id, "No operation applies to this job");
            service
                .capture_exception(ExceptionReport::new(
                    "NoOperation",
                    format!("no operation applies to job {}", job_id),
                ))
                .await;
            RunOutcome::NoOperation
        }
    }
}
