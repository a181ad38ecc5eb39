//! Refreshes an open security update pull request

use super::refresh_version_update::refresh_pull_request;
use super::{refresh_target, Decision, OperationContext};
use crate::error::HaltingError;
use crate::service::CloseReason;
use crate::snapshot::DependencySnapshot;
use tracing::info;

pub(crate) async fn perform(
    ops: &mut OperationContext<'_>,
    snapshot: &DependencySnapshot,
) -> Result<(), HaltingError> {
    info!("Starting security PR update job for {}", ops.job.source.repo);

    if ops.job.dependencies.is_none() {
        info!("No dependencies to update");
        return ops
            .apply(Decision::Close(CloseReason::DependenciesRemoved), None, None)
            .await;
    }

    let Some((context, dependencies)) = refresh_target(snapshot) else {
        return ops
            .apply(Decision::Close(CloseReason::DependencyRemoved), None, None)
            .await;
    };
    if dependencies.len() != ops.job.requested_dependencies().len() {
        return ops
            .apply(Decision::Close(CloseReason::DependencyRemoved), None, None)
            .await;
    }

    // Security-only jobs only allow dependencies that are still vulnerable
    if !dependencies.iter().any(|d| ops.job.allowed_update(d)) {
        match dependencies.first() {
            Some(lead) if ops.job.vulnerable(lead) => info!(
                "Dependency no longer allowed to update {} {}",
                lead.name,
                lead.display_version()
            ),
            Some(lead) => info!("No longer vulnerable {} {}", lead.name, lead.display_version()),
            None => info!("No dependencies to update"),
        }
        return ops
            .apply(Decision::Close(CloseReason::UpToDate), None, None)
            .await;
    }

    let files = snapshot.dependency_files(&context);
    let decision = refresh_pull_request(ops, &context, files, &dependencies);
    ops.settle(decision, dependencies.last(), None).await
}
