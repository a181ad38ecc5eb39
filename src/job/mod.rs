//! Job policy model
//!
//! A [`Job`] describes one update run: which dependencies may be updated,
//! which versions are ignored, known advisories, group configuration, the
//! repository source and the pull requests already open. It is decoded once
//! from a job-definition document and read-only afterwards, apart from
//! [`Job::override_group_to_refresh`].
//!
//! Rule values are parsed eagerly: an unknown dependency type, update type or
//! malformed version range is rejected when the job is decoded. A dependency
//! group with malformed rules is dropped with a warning instead.

mod allowed_update;
mod ignore_condition;
mod security_advisory;
mod source;
pub mod wildcard;

pub use allowed_update::{AllowedUpdate, AllowedUpdateType, DependencyType};
pub use ignore_condition::{IgnoreCondition, ALL_VERSIONS};
pub use security_advisory::SecurityAdvisory;
pub use source::Source;

use crate::domain::{Dependency, ExistingGroupPullRequest, PackageManager, PullRequest, Version};
use crate::error::JobError;
use crate::group::{DependencyGroup, RawDependencyGroup};
use allowed_update::RawAllowedUpdate;
use ignore_condition::RawIgnoreCondition;
use security_advisory::RawSecurityAdvisory;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};
use wildcard::wildcard_match;

/// How manifest requirements may be changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementsUpdateStrategy {
    BumpVersions,
    BumpVersionsIfNecessary,
    LockfileOnly,
    WidenRanges,
}

impl RequirementsUpdateStrategy {
    /// Parses a strategy name
    pub fn parse(value: &str) -> Result<Self, JobError> {
        match value {
            "bump_versions" => Ok(Self::BumpVersions),
            "bump_versions_if_necessary" => Ok(Self::BumpVersionsIfNecessary),
            "lockfile_only" => Ok(Self::LockfileOnly),
            "widen_ranges" => Ok(Self::WidenRanges),
            other => Err(JobError::InvalidRuleValue {
                field: "requirements-update-strategy".to_string(),
                value: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BumpVersions => "bump_versions",
            Self::BumpVersionsIfNecessary => "bump_versions_if_necessary",
            Self::LockfileOnly => "lockfile_only",
            Self::WidenRanges => "widen_ranges",
        }
    }
}

impl fmt::Display for RequirementsUpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct JobDefinition {
    job: RawJob,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawJob {
    #[serde(default)]
    id: Option<Value>,
    package_manager: PackageManager,
    #[serde(default)]
    allowed_updates: Option<Vec<RawAllowedUpdate>>,
    #[serde(default)]
    ignore_conditions: Vec<RawIgnoreCondition>,
    #[serde(default)]
    security_advisories: Vec<RawSecurityAdvisory>,
    #[serde(default)]
    security_updates_only: bool,
    #[serde(default)]
    updating_a_pull_request: bool,
    #[serde(default)]
    dependencies: Option<Vec<String>>,
    #[serde(default)]
    existing_pull_requests: Vec<PullRequest>,
    #[serde(default)]
    existing_group_pull_requests: Vec<ExistingGroupPullRequest>,
    #[serde(default)]
    dependency_groups: Vec<RawDependencyGroup>,
    #[serde(default)]
    dependency_group_to_refresh: Option<String>,
    source: Source,
    #[serde(default)]
    requirements_update_strategy: Option<String>,
    #[serde(default)]
    lockfile_only: bool,
    #[serde(default)]
    experiments: BTreeMap<String, Value>,
    #[serde(default)]
    exclude_paths: Vec<String>,
    #[serde(default)]
    commit_message_options: Option<Value>,
}

/// One update run's policy and scope
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub package_manager: PackageManager,
    pub allowed_updates: Vec<AllowedUpdate>,
    pub ignore_conditions: Vec<IgnoreCondition>,
    pub security_advisories: Vec<SecurityAdvisory>,
    pub security_updates_only: bool,
    pub updating_a_pull_request: bool,
    /// Explicitly requested dependency names
    pub dependencies: Option<Vec<String>>,
    pub existing_pull_requests: Vec<PullRequest>,
    pub existing_group_pull_requests: Vec<ExistingGroupPullRequest>,
    pub dependency_groups: Vec<DependencyGroup>,
    pub source: Source,
    pub requirements_update_strategy: Option<RequirementsUpdateStrategy>,
    /// Experiment flags, keys normalised to snake_case
    pub experiments: BTreeMap<String, Value>,
    pub exclude_paths: Vec<String>,
    pub commit_message_options: Option<Value>,
    dependency_group_to_refresh: Option<String>,
}

impl Job {
    /// Creates a job that allows every update of `package_manager` in `source`
    pub fn new(id: impl Into<String>, package_manager: PackageManager, source: Source) -> Self {
        Self {
            id: id.into(),
            package_manager,
            allowed_updates: vec![AllowedUpdate::new()],
            ignore_conditions: Vec::new(),
            security_advisories: Vec::new(),
            security_updates_only: false,
            updating_a_pull_request: false,
            dependencies: None,
            existing_pull_requests: Vec::new(),
            existing_group_pull_requests: Vec::new(),
            dependency_groups: Vec::new(),
            source,
            requirements_update_strategy: None,
            experiments: BTreeMap::new(),
            exclude_paths: Vec::new(),
            commit_message_options: None,
            dependency_group_to_refresh: None,
        }
    }

    /// Decodes a `{"job": {...}}` job-definition document
    ///
    /// A bare job object without the `job` wrapper is accepted too.
    pub fn from_json(input: &str) -> Result<Self, JobError> {
        let value: Value = serde_json::from_str(input).map_err(|e| JobError::InvalidDefinition {
            message: e.to_string(),
        })?;
        Self::from_value(value)
    }

    /// Decodes a job definition that was already parsed as JSON
    pub fn from_value(value: Value) -> Result<Self, JobError> {
        let raw = if value.get("job").is_some() {
            serde_json::from_value::<JobDefinition>(value).map(|d| d.job)
        } else {
            serde_json::from_value::<RawJob>(value)
        }
        .map_err(|e| JobError::InvalidDefinition {
            message: e.to_string(),
        })?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawJob) -> Result<Self, JobError> {
        raw.source.validate()?;

        let id = match raw.id {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        let allowed_updates = match raw.allowed_updates {
            Some(rules) => rules
                .into_iter()
                .map(AllowedUpdate::from_raw)
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![AllowedUpdate::new()],
        };

        let requirements_update_strategy = match raw.requirements_update_strategy.as_deref() {
            Some(value) => Some(RequirementsUpdateStrategy::parse(value)?),
            None if raw.lockfile_only => Some(RequirementsUpdateStrategy::LockfileOnly),
            None => None,
        };

        Ok(Self {
            id,
            package_manager: raw.package_manager,
            allowed_updates,
            ignore_conditions: raw
                .ignore_conditions
                .into_iter()
                .map(IgnoreCondition::from_raw)
                .collect::<Result<Vec<_>, _>>()?,
            security_advisories: raw
                .security_advisories
                .into_iter()
                .map(SecurityAdvisory::from_raw)
                .collect::<Result<Vec<_>, _>>()?,
            security_updates_only: raw.security_updates_only,
            updating_a_pull_request: raw.updating_a_pull_request,
            dependencies: raw.dependencies,
            existing_pull_requests: raw.existing_pull_requests,
            existing_group_pull_requests: raw.existing_group_pull_requests,
            dependency_groups: decode_groups(raw.dependency_groups),
            source: raw.source,
            requirements_update_strategy,
            experiments: raw
                .experiments
                .into_iter()
                .map(|(k, v)| (k.replace('-', "_"), v))
                .collect(),
            exclude_paths: raw.exclude_paths,
            commit_message_options: raw.commit_message_options,
            dependency_group_to_refresh: raw.dependency_group_to_refresh,
        })
    }

    /// Sets the allow rules (builder pattern)
    pub fn with_allowed_updates(mut self, allowed_updates: Vec<AllowedUpdate>) -> Self {
        self.allowed_updates = allowed_updates;
        self
    }

    /// Sets the ignore conditions (builder pattern)
    pub fn with_ignore_conditions(mut self, conditions: Vec<IgnoreCondition>) -> Self {
        self.ignore_conditions = conditions;
        self
    }

    /// Sets the security advisories (builder pattern)
    pub fn with_security_advisories(mut self, advisories: Vec<SecurityAdvisory>) -> Self {
        self.security_advisories = advisories;
        self
    }

    /// Sets the explicitly requested dependencies (builder pattern)
    pub fn with_dependencies(mut self, names: &[&str]) -> Self {
        self.dependencies = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    /// Sets the security-only flag (builder pattern)
    pub fn with_security_updates_only(mut self, security_updates_only: bool) -> Self {
        self.security_updates_only = security_updates_only;
        self
    }

    /// Sets the refresh flag (builder pattern)
    pub fn with_updating_a_pull_request(mut self, updating: bool) -> Self {
        self.updating_a_pull_request = updating;
        self
    }

    /// Sets the open solo pull requests (builder pattern)
    pub fn with_existing_pull_requests(mut self, pull_requests: Vec<PullRequest>) -> Self {
        self.existing_pull_requests = pull_requests;
        self
    }

    /// Sets the open group pull requests (builder pattern)
    pub fn with_existing_group_pull_requests(mut self, pull_requests: Vec<ExistingGroupPullRequest>) -> Self {
        self.existing_group_pull_requests = pull_requests;
        self
    }

    /// Sets the group definitions (builder pattern)
    pub fn with_dependency_groups(mut self, groups: Vec<DependencyGroup>) -> Self {
        self.dependency_groups = groups;
        self
    }

    /// Sets the group to refresh (builder pattern)
    pub fn with_group_to_refresh(mut self, name: impl Into<String>) -> Self {
        self.dependency_group_to_refresh = Some(name.into());
        self
    }

    /// Enables or disables an experiment (builder pattern)
    pub fn with_experiment(mut self, name: &str, enabled: bool) -> Self {
        self.experiments
            .insert(name.replace('-', "_"), Value::Bool(enabled));
        self
    }

    /// Sets the requirements update strategy (builder pattern)
    pub fn with_requirements_update_strategy(mut self, strategy: RequirementsUpdateStrategy) -> Self {
        self.requirements_update_strategy = Some(strategy);
        self
    }

    /// Sets the exclude paths (builder pattern)
    pub fn with_exclude_paths(mut self, paths: &[&str]) -> Self {
        self.exclude_paths = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Returns true if `dependency` may be updated by this job
    pub fn allowed_update(&self, dependency: &Dependency) -> bool {
        if self.all_versions_ignored(dependency) {
            return false;
        }
        self.allowed_updates.iter().any(|rule| {
            rule.permits(
                dependency,
                self.security_updates_only,
                |pattern, name| self.name_match(pattern, name),
                |dep| self.vulnerable(dep),
            )
        })
    }

    /// Returns true if any known version of `dependency` is affected by an advisory
    ///
    /// Dependencies without a version, or pinned to a source-control
    /// reference, are never considered vulnerable.
    pub fn vulnerable(&self, dependency: &Dependency) -> bool {
        let advisories = self.security_advisories_for(dependency);
        if advisories.is_empty() {
            return false;
        }
        match dependency.version.as_deref() {
            Some(version) if Version::is_correct(version) => {}
            _ => return false,
        }

        let versions: Vec<Version> = dependency
            .all_versions()
            .iter()
            .filter(|v| Version::is_correct(v))
            .filter_map(|v| Version::parse(v))
            .collect();

        advisories
            .iter()
            .any(|advisory| versions.iter().any(|v| advisory.is_vulnerable(v)))
    }

    /// Returns true if the updated `dependency` fixes an advisory
    pub fn security_fix(&self, dependency: &Dependency) -> bool {
        self.security_advisories_for(dependency)
            .iter()
            .any(|advisory| advisory.is_fixed_by(dependency))
    }

    /// Advisories for `dependency`, matched case-insensitively by name
    pub fn security_advisories_for(&self, dependency: &Dependency) -> Vec<&SecurityAdvisory> {
        self.security_advisories
            .iter()
            .filter(|a| a.applies_to(&dependency.name))
            .collect()
    }

    /// Ignore conditions naming `dependency`, config conditions before chat commands
    pub fn ignore_conditions_for(&self, dependency: &Dependency) -> Vec<&IgnoreCondition> {
        let mut conditions: Vec<&IgnoreCondition> = self
            .ignore_conditions
            .iter()
            .filter(|c| self.name_match(&c.dependency_name, &dependency.name))
            .collect();
        conditions.sort_by_key(|c| c.is_from_command());
        conditions
    }

    /// Version requirements that must never be proposed for `dependency`
    pub fn ignored_versions_for(&self, dependency: &Dependency) -> Vec<String> {
        self.ignore_conditions_for(dependency)
            .iter()
            .flat_map(|c| c.ignored_versions(dependency, self.security_updates_only))
            .collect()
    }

    /// Returns true if an ignore condition excludes every version of `dependency`
    pub fn all_versions_ignored(&self, dependency: &Dependency) -> bool {
        self.ignored_versions_for(dependency)
            .iter()
            .any(|v| v == ALL_VERSIONS)
    }

    /// Logs which versions of `dependency` are ignored and why
    pub fn log_ignore_conditions_for(&self, dependency: &Dependency) {
        let conditions = self.ignore_conditions_for(dependency);
        if conditions.is_empty() {
            return;
        }

        info!("Ignored versions:");
        for condition in conditions {
            let source = condition.source.as_deref().unwrap_or("");
            if let Some(requirement) = &condition.version_requirement {
                info!("  {} - from {}", requirement, source);
            }
            for update_type in &condition.update_types {
                if self.security_updates_only {
                    info!(
                        "  {} - from {} (doesn't apply to security update)",
                        update_type.semver_label(),
                        source
                    );
                } else {
                    info!("  {} - from {}", update_type.semver_label(), source);
                }
            }
        }
    }

    /// Wildcard match after applying the ecosystem's name normalisation
    pub fn name_match(&self, pattern: &str, name: &str) -> bool {
        wildcard_match(
            &self.package_manager.normalise_name(pattern),
            &self.package_manager.normalise_name(name),
        )
    }

    /// Returns true if the experiment is set to a truthy value
    pub fn experiment_enabled(&self, name: &str) -> bool {
        match self.experiments.get(&name.replace('-', "_")) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::String(s)) => s != "false",
            Some(_) => true,
        }
    }

    /// Returns true if only lockfiles may change
    pub fn lockfile_only(&self) -> bool {
        self.requirements_update_strategy == Some(RequirementsUpdateStrategy::LockfileOnly)
    }

    /// Explicitly requested dependency names, empty when none were given
    pub fn requested_dependencies(&self) -> &[String] {
        self.dependencies.as_deref().unwrap_or(&[])
    }

    /// Returns true if explicit dependencies were requested
    pub fn has_requested_dependencies(&self) -> bool {
        self.dependencies.as_ref().is_some_and(|d| !d.is_empty())
    }

    /// Name of the group whose pull request is being refreshed
    pub fn dependency_group_to_refresh(&self) -> Option<&str> {
        self.dependency_group_to_refresh.as_deref()
    }

    /// Replaces the group to refresh
    pub fn override_group_to_refresh(&mut self, name: Option<String>) {
        self.dependency_group_to_refresh = name;
    }

    /// Normalised source directories
    pub fn directories(&self) -> Vec<String> {
        self.source.all_directories()
    }
}

/// Converts group configuration, dropping groups whose rules are malformed
fn decode_groups(raw: Vec<RawDependencyGroup>) -> Vec<DependencyGroup> {
    raw.into_iter()
        .filter_map(|group| {
            let name = group.name.clone();
            match DependencyGroup::from_raw(group) {
                Ok(group) => Some(group),
                Err(e) => {
                    warn!(group = %name, "Skipping dependency group '{}': {}", name, e);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Requirement, UpdateType};
    use serde_json::json;

    fn make_job(pm: PackageManager) -> Job {
        Job::new("1", pm, Source::new("acme/app", "/"))
    }

    fn direct(name: &str, version: &str) -> Dependency {
        Dependency::new(name, Some(version), PackageManager::NpmAndYarn)
            .with_requirements(vec![Requirement::new("package.json", Some("^1.0.0"))])
    }

    #[test]
    fn test_production_allow_rule() {
        let job = make_job(PackageManager::NpmAndYarn).with_allowed_updates(vec![
            AllowedUpdate::new().with_dependency_type(DependencyType::Production),
        ]);
        assert!(job.allowed_update(&direct("foo", "1.0.0")));
        assert!(!job.allowed_update(&direct("bar", "1.0.0").development()));
    }

    #[test]
    fn test_security_run_rejects_non_vulnerable() {
        let job = make_job(PackageManager::NpmAndYarn)
            .with_security_updates_only(true)
            .with_security_advisories(vec![
                SecurityAdvisory::new("foo", &["< 1.5.0"], &[], &[]).unwrap()
            ]);
        assert!(job.allowed_update(&direct("foo", "1.0.0")));
        assert!(!job.allowed_update(&direct("foo", "1.6.0")));
        assert!(!job.allowed_update(&direct("bar", "1.0.0")));
    }

    #[test]
    fn test_git_versions_never_vulnerable() {
        let job = make_job(PackageManager::NpmAndYarn).with_security_advisories(vec![
            SecurityAdvisory::new("foo", &["< 9.0.0"], &[], &[]).unwrap(),
        ]);
        assert!(!job.vulnerable(&direct("foo", "a1b2c3d4e5f6a7b8c9d0a1b2c3d4e5f6a7b8c9d0")));
        assert!(!job.vulnerable(&Dependency::new("foo", None, PackageManager::NpmAndYarn)));
        assert!(job.vulnerable(&direct("foo", "1.0.0")));
    }

    #[test]
    fn test_vulnerable_checks_all_versions() {
        let job = make_job(PackageManager::NpmAndYarn).with_security_advisories(vec![
            SecurityAdvisory::new("foo", &["< 1.5.0"], &[], &[]).unwrap(),
        ]);
        let mut dep = direct("foo", "2.0.0");
        assert!(!job.vulnerable(&dep));
        dep.metadata
            .insert("all_versions".to_string(), json!(["1.0.0", "2.0.0"]));
        assert!(job.vulnerable(&dep));
    }

    #[test]
    fn test_name_matching_is_exact_without_wildcard() {
        let job = make_job(PackageManager::NpmAndYarn)
            .with_allowed_updates(vec![AllowedUpdate::new().with_name("bus")]);
        assert!(job.allowed_update(&direct("bus", "1.0.0")));
        assert!(!job.allowed_update(&direct("business", "1.0.0")));
    }

    #[test]
    fn test_name_normalisation() {
        let job = make_job(PackageManager::Pip);
        assert!(job.name_match("Django_Rest.Framework", "django-rest-framework"));
        let job = make_job(PackageManager::NpmAndYarn);
        assert!(!job.name_match("a_b", "a-b"));
    }

    #[test]
    fn test_all_versions_ignored_rejects() {
        let job = make_job(PackageManager::NpmAndYarn)
            .with_ignore_conditions(vec![IgnoreCondition::new("foo")]);
        let dep = direct("foo", "1.0.0");
        assert!(job.all_versions_ignored(&dep));
        assert!(!job.allowed_update(&dep));
        assert!(job.allowed_update(&direct("bar", "1.0.0")));
    }

    #[test]
    fn test_ignore_conditions_sorted_config_first() {
        let job = make_job(PackageManager::NpmAndYarn).with_ignore_conditions(vec![
            IgnoreCondition::new("foo")
                .with_version_requirement("> 3")
                .with_source("@dependabot ignore command"),
            IgnoreCondition::new("f*")
                .with_update_types(&[UpdateType::Major])
                .with_source(".github/dependabot.yml"),
        ]);
        let conditions = job.ignore_conditions_for(&direct("foo", "1.0.0"));
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].dependency_name, "f*");
        assert_eq!(conditions[1].dependency_name, "foo");
        assert_eq!(
            job.ignored_versions_for(&direct("foo", "1.0.0")),
            vec![">= 2.a".to_string(), "> 3".to_string()]
        );
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "job": {
                "id": 1234,
                "package-manager": "npm_and_yarn",
                "allowed-updates": [{"dependency-type": "direct", "update-type": "all"}],
                "ignore-conditions": [
                    {"dependency-name": "lodash", "version-requirement": ">= 5", "source": ".github/dependabot.yml"}
                ],
                "security-advisories": [
                    {"dependency-name": "lodash", "affected-versions": ["< 4.17.21"], "patched-versions": [">= 4.17.21"]}
                ],
                "existing-pull-requests": [[{"dependency-name": "lodash", "dependency-version": "4.17.21"}]],
                "existing-group-pull-requests": [
                    {"dependency-group-name": "dev", "dependencies": [{"dependency-name": "jest", "dependency-version": "29.0.0"}]}
                ],
                "dependency-groups": [{"name": "dev", "rules": {"patterns": ["jest*"]}}],
                "source": {"provider": "github", "repo": "acme/app", "directories": ["/", "/web"]},
                "lockfile-only": true,
                "experiments": {"group-membership-enforcement": true}
            }
        }"#;
        let job = Job::from_json(json).unwrap();
        assert_eq!(job.id, "1234");
        assert_eq!(job.package_manager, PackageManager::NpmAndYarn);
        assert_eq!(job.allowed_updates[0].dependency_type, Some(DependencyType::Direct));
        assert_eq!(job.existing_pull_requests.len(), 1);
        assert_eq!(job.existing_group_pull_requests[0].group_name, "dev");
        assert_eq!(job.dependency_groups[0].name, "dev");
        assert_eq!(job.directories(), vec!["/", "/web"]);
        assert!(job.lockfile_only());
        assert!(job.experiment_enabled("group_membership_enforcement"));
        assert!(!job.experiment_enabled("unknown"));
    }

    #[test]
    fn test_from_json_rejects_directory_and_directories() {
        let json = r#"{"job": {
            "package-manager": "bundler",
            "source": {"repo": "acme/app", "directory": "/", "directories": ["/a"]}
        }}"#;
        assert_eq!(Job::from_json(json).unwrap_err(), JobError::DirectoryXorDirectories);
    }

    #[test]
    fn test_from_json_rejects_bad_rules() {
        let json = r#"{"job": {
            "package-manager": "bundler",
            "allowed-updates": [{"dependency-type": "sometimes"}],
            "source": {"repo": "acme/app", "directory": "/"}
        }}"#;
        assert!(matches!(
            Job::from_json(json),
            Err(JobError::InvalidRuleValue { .. })
        ));
        assert!(matches!(
            Job::from_json("{ not json"),
            Err(JobError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_malformed_group_is_dropped() {
        let json = r#"{"job": {
            "package-manager": "npm_and_yarn",
            "source": {"repo": "acme/app", "directory": "/"},
            "dependency-groups": [
                {"name": "ok", "rules": {"patterns": ["*"]}},
                {"name": "bad", "rules": {"dependency-type": "indirect"}},
                {"name": "typo", "rules": {"update-types": ["huge"]}}
            ]
        }}"#;
        let job = Job::from_json(json).unwrap();
        let names: Vec<&str> = job.dependency_groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["ok"]);
    }

    #[test]
    fn test_missing_allowed_updates_allows_all() {
        let json = r#"{"package-manager": "bundler", "source": {"repo": "acme/app", "directory": "/"}}"#;
        let job = Job::from_json(json).unwrap();
        assert_eq!(job.allowed_updates, vec![AllowedUpdate::new()]);
    }

    #[test]
    fn test_override_group_to_refresh() {
        let mut job = make_job(PackageManager::Bundler).with_group_to_refresh("dev");
        assert_eq!(job.dependency_group_to_refresh(), Some("dev"));
        job.override_group_to_refresh(None);
        assert_eq!(job.dependency_group_to_refresh(), None);
    }
}
