//! A pull request fixing the advisories of the requested dependencies
//!
//! Every outcome other than a created pull request is recorded as an update
//! job error so the reason shows up on the job.

use super::{
    log_checking_for_update, log_requirements_for_update, requirements_to_unlock, Decision,
    OperationContext,
};
use crate::change::{ChangeSource, DependencyChangeBuilder};
use crate::domain::{Dependency, DependencyFile, Version};
use crate::ecosystem::UpdateChecker;
use crate::error::{HaltingError, UpdateError};
use crate::snapshot::{DependencySnapshot, DirectoryContext};
use serde_json::json;
use tracing::info;

pub(crate) async fn perform(
    ops: &mut OperationContext<'_>,
    snapshot: &DependencySnapshot,
) -> Result<(), HaltingError> {
    info!("Starting security update job for {}", ops.job.source.repo);

    for context in snapshot.contexts() {
        let dependencies: Vec<Dependency> = snapshot
            .job_dependencies(&context)
            .into_iter()
            .cloned()
            .collect();
        if dependencies.is_empty() {
            info!(directory = %context, "Found no requested dependencies in this directory");
            continue;
        }

        let files = snapshot.dependency_files(&context);
        for dependency in &dependencies {
            let decision = check_and_create_pull_request(ops, &context, files, dependency);
            ops.settle(decision, Some(dependency), None).await?;
        }
    }
    Ok(())
}

fn check_and_create_pull_request(
    ops: &OperationContext<'_>,
    context: &DirectoryContext,
    files: &[DependencyFile],
    dependency: &Dependency,
) -> Result<Decision, UpdateError> {
    let checker = ops.checker(dependency, files, None);
    log_checking_for_update(ops.job, dependency);

    if ops.all_versions_ignored(checker.as_ref())? {
        return Ok(Decision::Skip);
    }

    if !ops.job.vulnerable(dependency) {
        let correct = dependency.version.as_deref().is_some_and(Version::is_correct);
        let error_type = if correct {
            info!("{} {} is not vulnerable", dependency.name, dependency.display_version());
            "security_update_not_needed"
        } else {
            info!("{} has no registry version to check", dependency.name);
            "dependency_file_not_supported"
        };
        return Ok(Decision::RecordError {
            error_type,
            details: json!({ "dependency-name": dependency.name }),
            dependency: None,
        });
    }

    if !ops.job.allowed_update(dependency) {
        info!("All updates for {} were ignored", dependency.name);
        return Ok(Decision::RecordError {
            error_type: "all_versions_ignored",
            details: json!({ "dependency-name": dependency.name }),
            dependency: None,
        });
    }

    if checker.up_to_date()? {
        info!(
            "No patched version available for {} {}",
            dependency.name,
            dependency.display_version()
        );
        return Ok(Decision::RecordError {
            error_type: "security_update_not_found",
            details: json!({
                "dependency-name": dependency.name,
                "dependency-version": dependency.version,
            }),
            dependency: Some(dependency.clone()),
        });
    }

    if ops.pr_exists_for_latest_version(checker.as_ref())? {
        let latest = checker.latest_version()?;
        info!(
            "Pull request already exists for {} with latest version {}",
            dependency.name,
            latest.as_deref().unwrap_or("unknown")
        );
        return Ok(Decision::RecordError {
            error_type: "pull_request_exists_for_latest_version",
            details: json!({
                "dependency-name": dependency.name,
                "dependency-version": latest,
            }),
            dependency: Some(dependency.clone()),
        });
    }

    let unlock = requirements_to_unlock(ops.job, checker.as_ref())?;
    log_requirements_for_update(ops.job, unlock);
    let Some(unlock) = unlock else {
        return not_possible(checker.as_ref());
    };

    let updated = checker.updated_dependencies(unlock)?;
    if !updated.iter().any(|d| ops.job.security_fix(d)) {
        info!("Updated dependencies do not fix any advisory for {}", dependency.name);
        return not_possible(checker.as_ref());
    }

    if let Some(existing) = ops.existing_pull_request(&updated) {
        info!("Pull request already exists for {}", existing);
        return Ok(Decision::RecordError {
            error_type: "pull_request_exists_for_security_update",
            details: json!({ "updated-dependencies": existing.dependencies }),
            dependency: Some(dependency.clone()),
        });
    }

    let change = DependencyChangeBuilder::create_from(
        ops.job,
        context,
        files,
        updated,
        ChangeSource::Dependency(dependency.clone()),
        ops.ecosystem.file_updater(),
    )?;
    Ok(Decision::Create(change))
}

fn not_possible(checker: &dyn UpdateChecker) -> Result<Decision, UpdateError> {
    let dependency = checker.dependency();
    let latest_resolvable = checker
        .latest_resolvable_version()?
        .or_else(|| dependency.version.clone());
    let lowest_fix = checker.lowest_security_fix_version()?;
    info!(
        "The latest possible version that can be installed is {} because of conflicting dependencies",
        latest_resolvable.as_deref().unwrap_or("unknown")
    );

    Ok(Decision::RecordError {
        error_type: "security_update_not_possible",
        details: json!({
            "dependency-name": dependency.name,
            "latest-resolvable-version": latest_resolvable,
            "lowest-non-vulnerable-version": lowest_fix,
            "conflicting-dependencies": checker.conflicting_dependencies(),
        }),
        dependency: Some(dependency.clone()),
    })
}
