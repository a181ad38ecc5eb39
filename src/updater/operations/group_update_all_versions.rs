//! Grouped version updates
//!
//! Each group is compiled directory by directory into one change: every
//! member is re-checked against the files already rewritten for earlier
//! members, so the group's pull request holds a consistent set of updates.
//! Dependencies no group handled are then updated one pull request each.

use super::{
    log_checking_for_update, log_requirements_for_update, log_up_to_date, requirements_to_unlock,
    update_all_versions, Decision, OperationContext,
};
use crate::change::{ChangeBatch, ChangeSource, DependencyChange, DependencyChangeBuilder};
use crate::domain::{Dependency, DependencyFile};
use crate::error::{HaltingError, UpdateError};
use crate::group::{DependencyGroup, GroupDependencySelector};
use crate::snapshot::{DependencySnapshot, DirectoryContext};
use tracing::{debug, info};

/// Result of checking one group member
enum MemberUpdate {
    /// The proposed update falls outside the group's update-types
    OutsideGroup,
    Unchanged,
    Changed(DependencyChange),
}

pub(crate) async fn perform(
    ops: &mut OperationContext<'_>,
    snapshot: &mut DependencySnapshot,
) -> Result<(), HaltingError> {
    info!("Starting grouped update job for {}", ops.job.source.repo);

    let groups: Vec<DependencyGroup> = snapshot.groups().to_vec();
    for group in &groups {
        if existing_pr_for_group(ops, group) {
            info!("Detected existing pull request for '{}'.", group.name);
            info!("Deferring creation of a new pull request. The existing pull request will update in a separate job.");
            mark_group_handled(ops, snapshot, group);
            continue;
        }
        run_update_for(ops, snapshot, group).await?;
    }
    snapshot.engine().warn_empty_groups();

    update_all_versions::perform(ops, snapshot).await
}

fn existing_pr_for_group(ops: &OperationContext<'_>, group: &DependencyGroup) -> bool {
    ops.job
        .existing_group_pull_requests
        .iter()
        .any(|pr| pr.group_name == group.name)
}

/// Keeps the members of a group with an open pull request out of solo updates
fn mark_group_handled(ops: &OperationContext<'_>, snapshot: &mut DependencySnapshot, group: &DependencyGroup) {
    let in_existing_pr: Vec<String> = ops
        .job
        .existing_group_pull_requests
        .iter()
        .filter(|pr| pr.group_name == group.name)
        .flat_map(|pr| pr.dependencies.dependencies.iter().map(|d| d.name.clone()))
        .collect();

    for context in snapshot.contexts() {
        let mut names: Vec<String> = snapshot
            .group_dependencies(&group.name, &context)
            .iter()
            .map(|d| d.name.clone())
            .collect();
        names.extend(in_existing_pr.iter().cloned());
        snapshot.add_handled_dependencies(&context, names);
    }
}

async fn run_update_for(
    ops: &mut OperationContext<'_>,
    snapshot: &mut DependencySnapshot,
    group: &DependencyGroup,
) -> Result<(), HaltingError> {
    let Some(change) = compile_group_change(ops, snapshot, group).await? else {
        info!("Nothing to update for Dependency Group: '{}'", group.name);
        return Ok(());
    };
    if change.matches_existing_pr(ops.job) {
        info!("Pull request already exists for '{}' with the same updates", group.name);
        return Ok(());
    }

    info!("Creating a pull request for '{}'", group.name);
    ops.apply(Decision::Create(change), None, Some(group)).await
}

/// Compiles the group's change across every directory
///
/// Returns `None` when no member of the group updates.
pub(crate) async fn compile_group_change(
    ops: &mut OperationContext<'_>,
    snapshot: &mut DependencySnapshot,
    group: &DependencyGroup,
) -> Result<Option<DependencyChange>, HaltingError> {
    let mut changes = Vec::new();
    for context in snapshot.contexts() {
        if let Some(change) = compile_directory_change(ops, snapshot, group, &context).await? {
            changes.push(change);
        }
    }

    let selector = GroupDependencySelector::new(group, ops.job, snapshot.engine());
    let Some(mut change) = selector.merge_per_directory(changes) else {
        return Ok(None);
    };
    selector.annotate_dependency_drift(&mut change);
    selector.filter_to_group(&mut change);

    if change.updated_dependencies.is_empty() {
        return Ok(None);
    }
    Ok(Some(change))
}

async fn compile_directory_change(
    ops: &mut OperationContext<'_>,
    snapshot: &mut DependencySnapshot,
    group: &DependencyGroup,
    context: &DirectoryContext,
) -> Result<Option<DependencyChange>, HaltingError> {
    let already_handled = snapshot.handled_dependencies(context);
    let members: Vec<Dependency> = snapshot
        .group_dependencies(&group.name, context)
        .into_iter()
        .cloned()
        .collect();
    if members.is_empty() {
        debug!(group = %group.name, directory = %context, "No members in this directory");
        return Ok(None);
    }
    info!(group = %group.name, directory = %context, "Updating the '{}' group in {}", group.name, context);

    let mut batch = ChangeBatch::new(snapshot.dependency_files(context));
    let mut handled = Vec::new();

    for member in &members {
        if already_handled.contains(&member.name) {
            info!("Skipping {} as it has already been handled by a previous group", member.name);
            continue;
        }

        let files = batch.current_dependency_files();
        let reparsed = match ops.ecosystem.file_parser().parse(context.directory(), &files) {
            Ok(reparsed) => reparsed,
            Err(error) => {
                ops.error_handler
                    .handle_dependency_error(error.into(), Some(member), Some(group))
                    .await?;
                handled.push(member.name.clone());
                continue;
            }
        };
        // An earlier update in this batch may have removed it
        let Some(dependency) = reparsed.into_iter().find(|d| d.name == member.name) else {
            debug!("{} is no longer in the dependency files", member.name);
            handled.push(member.name.clone());
            continue;
        };

        match compile_updates_for(ops, context, &files, &dependency, group) {
            Ok(MemberUpdate::OutsideGroup) => continue,
            Ok(MemberUpdate::Unchanged) => {}
            Ok(MemberUpdate::Changed(change)) => batch.merge(change),
            Err(error) => {
                ops.error_handler
                    .handle_dependency_error(error, Some(&dependency), Some(group))
                    .await?
            }
        }
        handled.push(dependency.name.clone());
    }

    snapshot.add_handled_dependencies(context, handled);

    if batch.updated_dependencies().is_empty() {
        return Ok(None);
    }
    Ok(Some(DependencyChange::new(
        batch.updated_dependencies().to_vec(),
        batch.updated_dependency_files(),
        Some(group.clone()),
    )))
}

fn compile_updates_for(
    ops: &OperationContext<'_>,
    context: &DirectoryContext,
    files: &[DependencyFile],
    dependency: &Dependency,
    group: &DependencyGroup,
) -> Result<MemberUpdate, UpdateError> {
    let checker = ops.checker(dependency, files, Some(group));
    log_checking_for_update(ops.job, dependency);

    if ops.all_versions_ignored(checker.as_ref())? {
        return Ok(MemberUpdate::Unchanged);
    }
    if let Some(latest) = checker.latest_version()? {
        if !group.accepts_update(dependency, &latest) {
            info!(
                "Skipping {} as the update to {} is not allowed by the '{}' group",
                dependency.name, latest, group.name
            );
            return Ok(MemberUpdate::OutsideGroup);
        }
    }
    if checker.up_to_date()? {
        log_up_to_date(dependency);
        return Ok(MemberUpdate::Unchanged);
    }

    let unlock = requirements_to_unlock(ops.job, checker.as_ref())?;
    log_requirements_for_update(ops.job, unlock);
    let Some(unlock) = unlock else {
        info!("No update possible for {} {}", dependency.name, dependency.display_version());
        return Ok(MemberUpdate::Unchanged);
    };

    let updated = checker.updated_dependencies(unlock)?;
    if updated.is_empty() {
        return Ok(MemberUpdate::Unchanged);
    }

    let change = DependencyChangeBuilder::create_from(
        ops.job,
        context,
        files,
        updated,
        ChangeSource::Group(group.clone()),
        ops.ecosystem.file_updater(),
    )?;
    Ok(MemberUpdate::Changed(change))
}
