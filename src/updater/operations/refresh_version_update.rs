//! Refreshes an open single-dependency pull request
//!
//! The lead dependency is re-checked. The pull request is closed when the
//! update went away, replaced when the set of updated dependencies changed,
//! updated when it still proposes the same versions, and superseded otherwise.

use super::{
    lead_dependency, log_checking_for_update, log_requirements_for_update, log_up_to_date,
    refresh_target, requirements_to_unlock, Decision, OperationContext,
};
use crate::change::{ChangeSource, DependencyChangeBuilder};
use crate::domain::{Dependency, DependencyFile};
use crate::error::{HaltingError, UpdateError};
use crate::service::CloseReason;
use crate::snapshot::{DependencySnapshot, DirectoryContext};
use tracing::info;

pub(crate) async fn perform(
    ops: &mut OperationContext<'_>,
    snapshot: &DependencySnapshot,
) -> Result<(), HaltingError> {
    info!("Starting PR update job for {}", ops.job.source.repo);

    let Some((context, dependencies)) = refresh_target(snapshot) else {
        return ops.apply(Decision::Close(CloseReason::DependencyRemoved), None, None).await;
    };
    if dependencies.len() != ops.job.requested_dependencies().len() {
        return ops.apply(Decision::Close(CloseReason::DependencyRemoved), None, None).await;
    }

    let files = snapshot.dependency_files(&context);
    let decision = refresh_pull_request(ops, &context, files, &dependencies);
    ops.settle(decision, dependencies.last(), None).await
}

/// Decides what happens to the refreshed pull request of `dependencies`
///
/// The dependency the job names first leads the update.
pub(crate) fn refresh_pull_request(
    ops: &OperationContext<'_>,
    context: &DirectoryContext,
    files: &[DependencyFile],
    dependencies: &[Dependency],
) -> Result<Decision, UpdateError> {
    let Some(lead) = lead_dependency(ops.job, dependencies) else {
        return Ok(Decision::Close(CloseReason::UpdateNoLongerPossible));
    };

    let checker = ops.checker(lead, files, None);
    log_checking_for_update(ops.job, lead);

    if ops.all_versions_ignored(checker.as_ref())? {
        return Ok(Decision::Skip);
    }
    if checker.up_to_date()? {
        log_up_to_date(lead);
        return Ok(Decision::Close(CloseReason::UpToDate));
    }

    let unlock = requirements_to_unlock(ops.job, checker.as_ref())?;
    log_requirements_for_update(ops.job, unlock);
    let Some(unlock) = unlock else {
        return Ok(Decision::Close(CloseReason::UpdateNoLongerPossible));
    };

    let updated = checker.updated_dependencies(unlock)?;
    if ops.peer_dependency_should_update_instead(&lead.name, files, &updated)? {
        info!(
            "No update possible for {} {} (peer dependency can be updated)",
            lead.name,
            lead.display_version()
        );
        return Ok(Decision::Close(CloseReason::UpdateNoLongerPossible));
    }

    let existing = ops.existing_pull_request(&updated);
    let change = DependencyChangeBuilder::create_from(
        ops.job,
        context,
        files,
        updated,
        ChangeSource::Dependency(lead.clone()),
        ops.ecosystem.file_updater(),
    )?;

    if change.should_replace_existing_pr(ops.job) {
        info!("Dependency list changed, closing existing pull request");
        Ok(Decision::Replace(change))
    } else if existing.is_some() {
        Ok(Decision::Update(change))
    } else {
        info!("Superseding the existing pull request for a previous version");
        Ok(Decision::Create(change))
    }
}
