//! Per-group post-processing of computed changes
//!
//! A multi-directory group produces one change per directory. The selector
//! folds them into one change and, with the `group_membership_enforcement`
//! experiment, keeps only the updated dependencies the group really owns,
//! stamping attribution on every dependency it looks at.

use super::{DependencyGroup, DependencyGroupEngine, GROUP_MEMBERSHIP_ENFORCEMENT};
use crate::attribution::{annotate, SelectionReason};
use crate::change::DependencyChange;
use crate::domain::Dependency;
use crate::job::Job;
use std::collections::HashSet;
use tracing::info;

/// Names listed per log line before the list is cut off
const MAX_LOGGED_NAMES: usize = 10;

pub struct GroupDependencySelector<'a> {
    group: &'a DependencyGroup,
    job: &'a Job,
    engine: &'a DependencyGroupEngine,
}

impl<'a> GroupDependencySelector<'a> {
    pub fn new(group: &'a DependencyGroup, job: &'a Job, engine: &'a DependencyGroupEngine) -> Self {
        Self { group, job, engine }
    }

    fn ecosystem(&self) -> &'static str {
        self.job.package_manager.ecosystem()
    }

    fn enforcing(&self) -> bool {
        self.job.experiment_enabled(GROUP_MEMBERSHIP_ENFORCEMENT)
    }

    /// Folds per-directory changes into one, de-duplicating on (directory, name)
    pub fn merge_per_directory(&self, mut changes: Vec<DependencyChange>) -> Option<DependencyChange> {
        if changes.len() <= 1 {
            return changes.pop();
        }

        let directory_count = changes.len();
        let mut seen_dependencies: HashSet<(String, String)> = HashSet::new();
        let mut seen_files: HashSet<(String, String)> = HashSet::new();
        let mut merged = DependencyChange::new(Vec::new(), Vec::new(), Some(self.group.clone()));

        for change in changes {
            for dependency in change.updated_dependencies {
                let key = (
                    dependency.directory.clone().unwrap_or_else(|| "/".to_string()),
                    dependency.name.clone(),
                );
                if seen_dependencies.insert(key) {
                    merged.updated_dependencies.push(dependency);
                }
            }
            for file in change.updated_dependency_files {
                if seen_files.insert((file.normalized_directory(), file.name.clone())) {
                    merged.updated_dependency_files.push(file);
                }
            }
            for notice in change.notices {
                if !merged.notices.contains(&notice) {
                    merged.notices.push(notice);
                }
            }
        }

        info!(
            "GroupDependencySelector merged {} directory changes into {} unique dependencies [group={}, ecosystem={}]",
            directory_count,
            merged.updated_dependencies.len(),
            self.group.name,
            self.ecosystem()
        );
        Some(merged)
    }

    /// Stamps `dependency_drift` on transitive dependencies the group does not own
    ///
    /// These are pulled into the change by another update and stay in it.
    pub fn annotate_dependency_drift(&self, change: &mut DependencyChange) {
        if !self.enforcing() {
            return;
        }

        let mut drift: Vec<String> = Vec::new();
        for dependency in change.updated_dependencies.iter_mut() {
            if dependency.is_top_level() || self.contains(dependency) {
                continue;
            }
            let directory = directory_of(dependency);
            annotate(
                dependency,
                Some(&self.group.name),
                SelectionReason::DependencyDrift,
                &directory,
            );
            drift.push(dependency.name.clone());
        }

        if !drift.is_empty() {
            info!(
                "Dependency drift detected: {}{} [group={}, ecosystem={}, dependency_drift_count={}]",
                capped(&drift),
                suffix(&drift),
                self.group.name,
                self.ecosystem(),
                drift.len()
            );
        }
    }

    /// Keeps the updated dependencies the group owns and configuration allows
    ///
    /// Returns the dependencies that were removed. Does nothing unless the
    /// membership enforcement experiment is enabled.
    pub fn filter_to_group(&self, change: &mut DependencyChange) -> Vec<Dependency> {
        if !self.enforcing() {
            return Vec::new();
        }

        let mut kept = Vec::new();
        let mut filtered = Vec::new();
        for mut dependency in std::mem::take(&mut change.updated_dependencies) {
            let directory = directory_of(&dependency);
            let drifted = dependency
                .attribution
                .as_ref()
                .is_some_and(|a| a.selection_reason == SelectionReason::DependencyDrift);
            if drifted {
                kept.push(dependency);
                continue;
            }

            let in_group = self.contains(&dependency);
            let allowed = self.allowed_by_config(&dependency);
            let reason = match (in_group, allowed) {
                (true, true) => SelectionReason::Direct,
                (false, _) => SelectionReason::NotInGroup,
                (true, false) => SelectionReason::FilteredByConfig,
            };
            annotate(&mut dependency, Some(&self.group.name), reason, &directory);

            if reason == SelectionReason::Direct {
                kept.push(dependency);
            } else {
                filtered.push(dependency);
            }
        }
        change.updated_dependencies = kept;

        if !filtered.is_empty() {
            self.log_filtered(&filtered);
        }
        filtered
    }

    fn contains(&self, dependency: &Dependency) -> bool {
        self.engine
            .is_member(&self.group.name, &directory_of(dependency), &dependency.name)
    }

    fn allowed_by_config(&self, dependency: &Dependency) -> bool {
        !self.job.all_versions_ignored(dependency) && self.job.allowed_update(dependency)
    }

    fn log_filtered(&self, filtered: &[Dependency]) {
        let names_for = |reason: SelectionReason| -> Vec<String> {
            filtered
                .iter()
                .filter(|d| d.attribution.as_ref().map(|a| a.selection_reason) == Some(reason))
                .map(|d| d.name.clone())
                .collect()
        };

        let not_in_group = names_for(SelectionReason::NotInGroup);
        if !not_in_group.is_empty() {
            info!(
                "Filtered dependencies not in group: {}{} [group={}, ecosystem={}, count={}]",
                capped(&not_in_group),
                suffix(&not_in_group),
                self.group.name,
                self.ecosystem(),
                not_in_group.len()
            );
        }

        let by_config = names_for(SelectionReason::FilteredByConfig);
        if !by_config.is_empty() {
            info!(
                "Filtered dependencies by configuration: {}{} [group={}, ecosystem={}, count={}]",
                capped(&by_config),
                suffix(&by_config),
                self.group.name,
                self.ecosystem(),
                by_config.len()
            );
        }
    }
}

fn directory_of(dependency: &Dependency) -> String {
    dependency.directory.clone().unwrap_or_else(|| "/".to_string())
}

fn capped(names: &[String]) -> String {
    names
        .iter()
        .take(MAX_LOGGED_NAMES)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

fn suffix(names: &[String]) -> &'static str {
    if names.len() > MAX_LOGGED_NAMES {
        " (showing first 10)"
    } else {
        ""
    }
}
