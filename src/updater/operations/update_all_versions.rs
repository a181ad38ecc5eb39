//! One pull request per outdated dependency

use super::{
    log_checking_for_update, log_requirements_for_update, log_up_to_date, requirements_to_unlock,
    Decision, OperationContext,
};
use crate::change::{ChangeSource, DependencyChangeBuilder};
use crate::domain::{Dependency, DependencyFile};
use crate::error::{HaltingError, UpdateError};
use crate::snapshot::{DependencySnapshot, DirectoryContext};
use tracing::info;

pub(crate) async fn perform(
    ops: &mut OperationContext<'_>,
    snapshot: &DependencySnapshot,
) -> Result<(), HaltingError> {
    info!("Starting update job for {}", ops.job.source.repo);

    for context in snapshot.contexts() {
        let dependencies: Vec<Dependency> = snapshot
            .ungrouped_dependencies(&context)
            .into_iter()
            .cloned()
            .collect();
        if dependencies.is_empty() {
            continue;
        }
        info!(directory = %context, "Checking {} dependencies for version updates", dependencies.len());

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
    if checker.up_to_date()? {
        log_up_to_date(dependency);
        return Ok(Decision::Skip);
    }
    if ops.pr_exists_for_latest_version(checker.as_ref())? {
        info!(
            "Pull request already exists for {} with latest version {}",
            dependency.name,
            checker.latest_version()?.unwrap_or_default()
        );
        return Ok(Decision::Skip);
    }

    let unlock = requirements_to_unlock(ops.job, checker.as_ref())?;
    log_requirements_for_update(ops.job, unlock);
    let Some(unlock) = unlock else {
        info!("No update possible for {} {}", dependency.name, dependency.display_version());
        return Ok(Decision::Skip);
    };

    let updated = checker.updated_dependencies(unlock)?;
    if let Some(existing) = ops.existing_pull_request(&updated) {
        info!("Pull request already exists for {}", existing);
        return Ok(Decision::Skip);
    }
    if ops.peer_dependency_should_update_instead(&dependency.name, files, &updated)? {
        info!(
            "No update possible for {} {} (peer dependency can be updated)",
            dependency.name,
            dependency.display_version()
        );
        return Ok(Decision::Skip);
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
