//! Operation strategies
//!
//! Exactly one operation runs per job, chosen by [`Operation::for_job`]:
//! 1. create a security update
//! 2. refresh a security update pull request
//! 3. refresh a group pull request
//! 4. refresh a version update pull request
//! 5. update all versions with groups
//! 6. update all versions
//!
//! Each strategy decides synchronously what to do for a dependency (a
//! [`Decision`]) and then reports the decision to the service. The helpers in
//! this module are the steps every strategy shares.

mod create_security_update;
mod group_update_all_versions;
mod refresh_group_update;
mod refresh_security_update;
mod refresh_version_update;
mod update_all_versions;

use super::ErrorHandler;
use crate::change::DependencyChange;
use crate::domain::{Dependency, DependencyFile, PullRequest};
use crate::ecosystem::{CheckRequest, Ecosystem, RequirementsToUnlock, UpdateChecker};
use crate::error::{EcosystemError, HaltingError, UpdateError};
use crate::group::DependencyGroup;
use crate::job::Job;
use crate::service::{CloseReason, Service};
use crate::snapshot::{DependencySnapshot, DirectoryContext};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::info;

/// The strategy a job runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateSecurityUpdate,
    RefreshSecurityUpdate,
    RefreshGroupUpdate,
    RefreshVersionUpdate,
    GroupUpdateAllVersions,
    UpdateAllVersions,
}

impl Operation {
    /// The first operation that applies to `job`, if any
    pub fn for_job(job: &Job) -> Option<Self> {
        let security_only = job.security_updates_only;
        let updating = job.updating_a_pull_request;
        let has_dependencies = job.has_requested_dependencies();
        // An absent dependency list still applies, an explicitly empty one does not
        let names_nothing = matches!(&job.dependencies, Some(names) if names.is_empty());

        if security_only && !updating && !names_nothing {
            return Some(Operation::CreateSecurityUpdate);
        }
        if security_only && updating && !names_nothing {
            return Some(Operation::RefreshSecurityUpdate);
        }
        if updating && job.dependency_group_to_refresh().is_some() {
            return Some(Operation::RefreshGroupUpdate);
        }
        if !security_only && updating && has_dependencies {
            return Some(Operation::RefreshVersionUpdate);
        }
        if !security_only && !updating && !has_dependencies {
            if job.dependency_groups.is_empty() {
                return Some(Operation::UpdateAllVersions);
            }
            return Some(Operation::GroupUpdateAllVersions);
        }
        None
    }

    /// Short name used in logs and reports
    pub fn tag_name(&self) -> &'static str {
        match self {
            Operation::CreateSecurityUpdate => "create_security_pr",
            Operation::RefreshSecurityUpdate => "update_security_pr",
            Operation::RefreshGroupUpdate => "update_version_group_pr",
            Operation::RefreshVersionUpdate => "update_version_pr",
            Operation::GroupUpdateAllVersions => "group_update_all_versions",
            Operation::UpdateAllVersions => "update_all_versions",
        }
    }

    pub(crate) async fn perform(
        self,
        ops: &mut OperationContext<'_>,
        snapshot: &mut DependencySnapshot,
    ) -> Result<(), HaltingError> {
        match self {
            Operation::CreateSecurityUpdate => create_security_update::perform(ops, snapshot).await,
            Operation::RefreshSecurityUpdate => refresh_security_update::perform(ops, snapshot).await,
            Operation::RefreshGroupUpdate => refresh_group_update::perform(ops, snapshot).await,
            Operation::RefreshVersionUpdate => refresh_version_update::perform(ops, snapshot).await,
            Operation::GroupUpdateAllVersions => group_update_all_versions::perform(ops, snapshot).await,
            Operation::UpdateAllVersions => update_all_versions::perform(ops, snapshot).await,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag_name())
    }
}

/// What the checks decided for one dependency or group
#[derive(Debug)]
pub(crate) enum Decision {
    /// Nothing to report
    Skip,
    Create(DependencyChange),
    Update(DependencyChange),
    Close(CloseReason),
    /// Close the refreshed pull request and open one for the new dependency set
    Replace(DependencyChange),
    RecordError {
        error_type: &'static str,
        details: Value,
        dependency: Option<Dependency>,
    },
}

/// Collaborators and run state shared by the steps of an operation
pub(crate) struct OperationContext<'a> {
    pub job: &'a Job,
    pub ecosystem: &'a dyn Ecosystem,
    pub service: &'a dyn Service,
    pub error_handler: ErrorHandler<'a>,
    base_commit_sha: String,
    created_pull_requests: Vec<PullRequest>,
}

impl<'a> OperationContext<'a> {
    pub fn new(
        job: &'a Job,
        ecosystem: &'a dyn Ecosystem,
        service: &'a dyn Service,
        base_commit_sha: &str,
    ) -> Self {
        Self {
            job,
            ecosystem,
            service,
            error_handler: ErrorHandler::new(service, job),
            base_commit_sha: base_commit_sha.to_string(),
            created_pull_requests: Vec::new(),
        }
    }

    /// An update checker configured with the job's ignores, advisories and strategy
    pub fn checker<'b>(
        &'b self,
        dependency: &'b Dependency,
        dependency_files: &'b [DependencyFile],
        group: Option<&'b DependencyGroup>,
    ) -> Box<dyn UpdateChecker + 'b> {
        let raise_on_ignored =
            self.job.security_updates_only || !self.job.ignore_conditions_for(dependency).is_empty();
        self.build_checker(dependency, dependency_files, group, raise_on_ignored)
    }

    fn build_checker<'b>(
        &'b self,
        dependency: &'b Dependency,
        dependency_files: &'b [DependencyFile],
        group: Option<&'b DependencyGroup>,
        raise_on_ignored: bool,
    ) -> Box<dyn UpdateChecker + 'b> {
        let request = CheckRequest {
            dependency,
            dependency_files,
            ignored_versions: self.job.ignored_versions_for(dependency),
            security_advisories: self
                .job
                .security_advisories_for(dependency)
                .into_iter()
                .cloned()
                .collect(),
            raise_on_ignored,
            requirements_update_strategy: self.job.requirements_update_strategy,
            group,
        };
        self.ecosystem.update_checker(request)
    }

    /// Logs the latest version; true when every newer version is ignored
    ///
    /// Security-only runs propagate the `AllVersionsIgnored` error instead.
    pub fn all_versions_ignored(&self, checker: &dyn UpdateChecker) -> Result<bool, EcosystemError> {
        match checker.latest_version() {
            Ok(latest) => {
                info!("Latest version is {}", latest.as_deref().unwrap_or("unknown"));
                Ok(false)
            }
            Err(EcosystemError::AllVersionsIgnored { .. }) if !self.job.security_updates_only => {
                info!("All updates for {} were ignored", checker.dependency().name);
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    /// True when a single-dependency pull request already proposes the latest version
    pub fn pr_exists_for_latest_version(&self, checker: &dyn UpdateChecker) -> Result<bool, EcosystemError> {
        let Some(latest) = checker.latest_version()? else {
            return Ok(false);
        };
        let name = &checker.dependency().name;
        Ok(self
            .job
            .existing_pull_requests
            .iter()
            .filter(|pr| pr.is_solo())
            .any(|pr| pr.contains(name, Some(&latest))))
    }

    /// An open or freshly created pull request proposing exactly `updated`
    pub fn existing_pull_request(&self, updated: &[Dependency]) -> Option<PullRequest> {
        let candidate = PullRequest::from_updated_dependencies(updated);
        self.job
            .existing_pull_requests
            .iter()
            .chain(self.created_pull_requests.iter())
            .find(|pr| **pr == candidate)
            .cloned()
    }

    /// True when another dependency of the update should be updated on its own instead
    ///
    /// Never applies to security-only runs.
    pub fn peer_dependency_should_update_instead(
        &self,
        lead_name: &str,
        dependency_files: &[DependencyFile],
        updated: &[Dependency],
    ) -> Result<bool, EcosystemError> {
        if self.job.security_updates_only {
            return Ok(false);
        }

        for peer in updated.iter().filter(|d| d.name != lead_name) {
            if self.existing_pull_request(std::slice::from_ref(peer)).is_some() {
                return Ok(true);
            }

            let original = Dependency {
                version: peer.previous_version.clone(),
                requirements: peer.previous_requirements.clone().unwrap_or_default(),
                previous_version: None,
                previous_requirements: None,
                attribution: None,
                ..peer.clone()
            };
            let checker = self.build_checker(&original, dependency_files, None, false);
            if checker.can_update(RequirementsToUnlock::Own)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Reports a decision; changes are validated before they are submitted
    pub async fn apply(
        &mut self,
        decision: Decision,
        dependency: Option<&Dependency>,
        group: Option<&DependencyGroup>,
    ) -> Result<(), HaltingError> {
        match decision {
            Decision::Skip => {}
            Decision::Create(change) => {
                if let Err(error) = change.check_dependencies_have_previous_version() {
                    return self
                        .error_handler
                        .handle_dependency_error(error.into(), dependency, group)
                        .await;
                }
                self.create_pull_request(&change).await;
            }
            Decision::Update(change) => {
                info!("Submitting {} pull request for update", change.humanized());
                self.service
                    .update_pull_request(&change, &self.base_commit_sha)
                    .await;
            }
            Decision::Close(reason) => self.close_pull_request(reason).await,
            Decision::Replace(change) => {
                if let Err(error) = change.check_dependencies_have_previous_version() {
                    return self
                        .error_handler
                        .handle_dependency_error(error.into(), dependency, group)
                        .await;
                }
                self.close_pull_request(CloseReason::DependenciesChanged).await;
                self.create_pull_request(&change).await;
            }
            Decision::RecordError {
                error_type,
                details,
                dependency,
            } => {
                info!("Recording {} for {}", error_type, details);
                self.service
                    .record_update_job_error(error_type, Some(details), dependency.as_ref())
                    .await;
            }
        }
        Ok(())
    }

    /// Applies a decision, or reports the error that prevented one
    pub async fn settle(
        &mut self,
        result: Result<Decision, UpdateError>,
        dependency: Option<&Dependency>,
        group: Option<&DependencyGroup>,
    ) -> Result<(), HaltingError> {
        match result {
            Ok(decision) => self.apply(decision, dependency, group).await,
            Err(error) => {
                self.error_handler
                    .handle_dependency_error(error, dependency, group)
                    .await
            }
        }
    }

    async fn create_pull_request(&mut self, change: &DependencyChange) {
        info!("Submitting {} pull request for creation", change.humanized());
        change.log_attribution();
        self.service
            .create_pull_request(change, &self.base_commit_sha)
            .await;
        self.created_pull_requests.push(change.pull_request());
    }

    async fn close_pull_request(&self, reason: CloseReason) {
        let names = self.job.requested_dependencies().to_vec();
        info!(
            "Telling backend to close pull request for {} - {}",
            names.join(", "),
            reason.humanized()
        );
        self.service.close_pull_request(&names, reason).await;
    }
}

/// How far requirements must be unlocked, `None` when no update is possible
pub(crate) fn requirements_to_unlock(
    job: &Job,
    checker: &dyn UpdateChecker,
) -> Result<Option<RequirementsToUnlock>, EcosystemError> {
    if job.lockfile_only() || !checker.requirements_unlocked_or_can_be() {
        let unlock = checker
            .can_update(RequirementsToUnlock::None)?
            .then_some(RequirementsToUnlock::None);
        return Ok(unlock);
    }

    for unlock in [RequirementsToUnlock::Own, RequirementsToUnlock::All] {
        if checker.can_update(unlock)? {
            return Ok(Some(unlock));
        }
    }
    Ok(None)
}

pub(crate) fn log_requirements_for_update(job: &Job, unlock: Option<RequirementsToUnlock>) {
    info!(
        "Requirements to unlock {}",
        unlock.map_or("update_not_possible", |u| u.as_str())
    );
    if let Some(strategy) = job.requirements_update_strategy {
        info!("Requirements update strategy {}", strategy.as_str());
    }
}

pub(crate) fn log_checking_for_update(job: &Job, dependency: &Dependency) {
    info!(
        dependency = %dependency.name,
        "Checking if {} {} needs updating",
        dependency.name,
        dependency.display_version()
    );
    job.log_ignore_conditions_for(dependency);
}

pub(crate) fn log_up_to_date(dependency: &Dependency) {
    info!("No update needed for {} {}", dependency.name, dependency.display_version());
}

/// The directory holding a refreshed pull request's dependencies, with those dependencies
///
/// Falls back to the first directory when none of them is found.
pub(crate) fn refresh_target(snapshot: &DependencySnapshot) -> Option<(DirectoryContext, Vec<Dependency>)> {
    let contexts = snapshot.contexts();
    let context = contexts
        .iter()
        .find(|c| !snapshot.job_dependencies(c).is_empty())
        .or_else(|| contexts.first())?;
    let dependencies = snapshot
        .job_dependencies(context)
        .into_iter()
        .cloned()
        .collect();
    Some((context.clone(), dependencies))
}

/// The parsed dependency named first in the job, matched case-insensitively
pub(crate) fn lead_dependency<'d>(job: &Job, dependencies: &'d [Dependency]) -> Option<&'d Dependency> {
    let lead = job.requested_dependencies().first()?.to_lowercase();
    dependencies.iter().find(|d| d.name.to_lowercase() == lead)
}
