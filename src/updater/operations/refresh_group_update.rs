//! Refreshes an open group pull request

use super::group_update_all_versions::compile_group_change;
use super::{Decision, OperationContext};
use crate::error::HaltingError;
use crate::group::warn_group_is_empty;
use crate::service::CloseReason;
use crate::snapshot::DependencySnapshot;
use tracing::{info, warn};

pub(crate) async fn perform(
    ops: &mut OperationContext<'_>,
    snapshot: &mut DependencySnapshot,
) -> Result<(), HaltingError> {
    let job = ops.job;
    let Some(group_name) = job.dependency_group_to_refresh() else {
        return Ok(());
    };
    info!("Starting PR update job for group '{}' in {}", group_name, job.source.repo);

    let Some(group) = snapshot.find_group(group_name).cloned() else {
        warn!("The '{}' group no longer exists", group_name);
        return ops
            .apply(Decision::Close(CloseReason::DependencyGroupEmpty), None, None)
            .await;
    };

    let has_members = snapshot
        .contexts()
        .iter()
        .any(|c| !snapshot.group_dependencies(&group.name, c).is_empty());
    if !has_members {
        warn_group_is_empty(&group);
        return ops
            .apply(Decision::Close(CloseReason::DependencyGroupEmpty), None, Some(&group))
            .await;
    }

    let decision = match compile_group_change(ops, snapshot, &group).await? {
        None => {
            info!("No updated dependencies, closing existing pull request");
            Decision::Close(CloseReason::UpdateNoLongerPossible)
        }
        Some(change) if change.should_replace_existing_pr(job) => {
            info!("Dependency list changed, closing existing pull request");
            Decision::Replace(change)
        }
        Some(change) => {
            info!("Updating pull request for '{}'", group.name);
            Decision::Update(change)
        }
    };
    ops.apply(decision, None, Some(&group)).await
}
