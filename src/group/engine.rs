//! Classification of dependencies into groups
//!
//! The engine holds the immutable group definitions that apply to the run and
//! a separate assignment table (group name -> members) built up directory by
//! directory. Dependencies matching no group are recorded as ungrouped.

use super::specificity::{most_specific, Specificity};
use super::{AppliesTo, DependencyGroup};
use crate::domain::{Dependency, PackageManager};
use crate::job::Job;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Experiment switching the engine to single-most-specific-group mode
pub const GROUP_MEMBERSHIP_ENFORCEMENT: &str = "group_membership_enforcement";

/// A dependency assigned to a group, identified per directory
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupMember {
    pub directory: String,
    pub name: String,
}

impl GroupMember {
    pub fn new(directory: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
        }
    }
}

/// Groups for one run plus the membership assigned so far
#[derive(Debug, Clone, Default)]
pub struct DependencyGroupEngine {
    groups: Vec<DependencyGroup>,
    enforce_single_group: bool,
    assignments: BTreeMap<String, Vec<GroupMember>>,
    ungrouped: Vec<GroupMember>,
}

impl DependencyGroupEngine {
    /// Builds the engine from the job's groups that apply to this kind of run
    pub fn from_job(job: &Job) -> Self {
        let applies_to = if job.security_updates_only {
            AppliesTo::SecurityUpdates
        } else {
            AppliesTo::VersionUpdates
        };
        let groups = job
            .dependency_groups
            .iter()
            .filter(|g| g.applies_to == applies_to)
            .cloned()
            .collect();
        Self::new(groups, job.experiment_enabled(GROUP_MEMBERSHIP_ENFORCEMENT))
    }

    /// Validates and registers `groups`
    ///
    /// Groups named after an ecosystem are dropped. Groups without rules are
    /// kept, since they match every dependency.
    pub fn new(groups: Vec<DependencyGroup>, enforce_single_group: bool) -> Self {
        let mut registered: Vec<DependencyGroup> = Vec::new();
        for group in groups {
            if PackageManager::is_reserved_name(&group.name) {
                warn!(
                    group = %group.name,
                    "The group name '{}' is reserved for an ecosystem and cannot be used; skipping group",
                    group.name
                );
                continue;
            }
            if registered.iter().any(|g| g.name == group.name) {
                warn!(group = %group.name, "Duplicate group '{}' ignored", group.name);
                continue;
            }
            if !group.has_rules() {
                warn!(
                    group = %group.name,
                    "Group '{}' has no rules and will match every dependency",
                    group.name
                );
            }
            registered.push(group);
        }

        let assignments = registered
            .iter()
            .map(|g| (g.name.clone(), Vec::new()))
            .collect();

        Self {
            groups: registered,
            enforce_single_group,
            assignments,
            ungrouped: Vec::new(),
        }
    }

    /// Returns the registered groups in configuration order
    pub fn groups(&self) -> &[DependencyGroup] {
        &self.groups
    }

    /// Looks up a group by name
    pub fn find_group(&self, name: &str) -> Option<&DependencyGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn is_enforcing_single_group(&self) -> bool {
        self.enforce_single_group
    }

    /// Assigns `dependencies` found in `directory` to groups
    pub fn assign_to_groups(&mut self, directory: &str, dependencies: &[Dependency]) {
        for dependency in dependencies {
            let member = GroupMember::new(directory, &dependency.name);
            let mut matched: Vec<usize> = self
                .groups
                .iter()
                .enumerate()
                .filter(|(_, g)| g.matches(dependency))
                .map(|(i, _)| i)
                .collect();

            if self.enforce_single_group && matched.len() > 1 {
                matched = self.keep_most_specific(&matched, &member);
            }

            if matched.is_empty() {
                if !self.ungrouped.contains(&member) {
                    self.ungrouped.push(member);
                }
                continue;
            }

            for index in matched {
                let group_name = &self.groups[index].name;
                debug!(
                    group = %group_name,
                    directory = %directory,
                    dependency = %dependency.name,
                    "Assigned to group"
                );
                let members = self.assignments.entry(group_name.clone()).or_default();
                if !members.contains(&member) {
                    members.push(member.clone());
                }
            }
        }
    }

    fn keep_most_specific(&self, matched: &[usize], member: &GroupMember) -> Vec<usize> {
        let candidates: Vec<(usize, Specificity)> = matched
            .iter()
            .map(|&i| {
                (i, Specificity::of(&self.groups[i], &member.name))
            })
            .collect();

        let kept = most_specific(&candidates);
        for &(i, _) in &candidates {
            if !kept.contains(&i) {
                debug!(
                    group = %self.groups[i].name,
                    dependency = %member.name,
                    "Skipping group: a more specific group matches"
                );
            }
        }
        kept
    }

    /// Returns every member of `group_name` across directories
    pub fn members(&self, group_name: &str) -> &[GroupMember] {
        self.assignments
            .get(group_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the names of `group_name`'s members in `directory`
    pub fn member_names_in(&self, group_name: &str, directory: &str) -> Vec<&str> {
        self.members(group_name)
            .iter()
            .filter(|m| m.directory == directory)
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Returns true if `name` in `directory` belongs to `group_name`
    pub fn is_member(&self, group_name: &str, directory: &str, name: &str) -> bool {
        self.members(group_name)
            .iter()
            .any(|m| m.directory == directory && m.name == name)
    }

    /// Returns the names in `directory` that matched no group
    pub fn ungrouped_names_in(&self, directory: &str) -> Vec<&str> {
        self.ungrouped
            .iter()
            .filter(|m| m.directory == directory)
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Returns the groups that ended up without members
    pub fn empty_groups(&self) -> Vec<&DependencyGroup> {
        self.groups
            .iter()
            .filter(|g| self.members(&g.name).is_empty())
            .collect()
    }

    /// Logs a warning for every group without members
    pub fn warn_empty_groups(&self) {
        for group in self.empty_groups() {
            warn_group_is_empty(group);
        }
    }
}

/// Logs that `group` matched nothing, with its configuration at debug level
pub fn warn_group_is_empty(group: &DependencyGroup) {
    warn!(
        group = %group.name,
        "Skipping update group for '{}' as it does not match any allowed dependencies.",
        group.name
    );
    debug!("Calculated update group configuration: {}", group);
}
