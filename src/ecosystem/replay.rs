//! Replays recorded collaborator answers
//!
//! A [`Scenario`] records what a parser, an update checker and a file
//! updater said for one repository. [`ReplayEcosystem`] answers from it so
//! the engine can be run end to end without any package manager installed.
//!
//! Checks and file updates are keyed by dependency name, or by
//! `"<directory>:<name>"` when a directory needs its own answer.

use super::{CheckRequest, Ecosystem, FileParser, FileUpdater, RequirementsToUnlock, UpdateChecker};
use crate::domain::{Dependency, DependencyFile, PackageManager, Version, VersionRequirement};
use crate::error::EcosystemError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Recorded update checker answers for one dependency
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckAnswer {
    /// Published versions; the latest is computed after ignore rules
    pub versions: Vec<String>,
    /// Latest version, used when `versions` is empty
    pub latest_version: Option<String>,
    pub latest_resolvable_version: Option<String>,
    pub lowest_security_fix_version: Option<String>,
    /// Whether manifest requirements may be loosened (defaults to true)
    pub requirements_unlocked: Option<bool>,
    /// Unlock levels at which an update resolves; derived when absent
    pub can_update: Option<Vec<String>>,
    /// Dependencies changed by the update; derived from the latest version when empty
    pub updated_dependencies: Vec<Dependency>,
    /// Raised by every query of this check
    pub error: Option<EcosystemError>,
    pub conflicting_dependencies: Vec<Value>,
}

/// A recorded repository state plus collaborator answers
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Dependency files of every directory
    pub files: Vec<DependencyFile>,
    /// Parsed dependencies per directory
    pub dependencies: BTreeMap<String, Vec<Dependency>>,
    /// Raised by the parser instead of returning dependencies
    pub parse_error: Option<EcosystemError>,
    pub checks: BTreeMap<String, CheckAnswer>,
    /// Files written when a dependency is updated
    pub updated_files: BTreeMap<String, Vec<DependencyFile>>,
    /// Raised by the file updater when a dependency is part of the update
    pub update_errors: BTreeMap<String, EcosystemError>,
}

impl Scenario {
    /// Decodes a scenario from JSON
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    fn lookup<'a, T>(map: &'a BTreeMap<String, T>, directory: Option<&str>, name: &str) -> Option<&'a T> {
        directory
            .and_then(|dir| map.get(&format!("{}:{}", dir, name)))
            .or_else(|| map.get(name))
    }
}

/// An ecosystem that answers from a [`Scenario`]
#[derive(Debug, Clone)]
pub struct ReplayEcosystem {
    package_manager: PackageManager,
    scenario: Scenario,
    parser: ReplayParser,
    updater: ReplayUpdater,
}

impl ReplayEcosystem {
    pub fn new(package_manager: PackageManager, scenario: Scenario) -> Self {
        Self {
            package_manager,
            parser: ReplayParser {
                package_manager,
                scenario: scenario.clone(),
            },
            updater: ReplayUpdater {
                scenario: scenario.clone(),
            },
            scenario,
        }
    }

    /// Dependency files recorded in the scenario
    pub fn dependency_files(&self) -> &[DependencyFile] {
        &self.scenario.files
    }

    pub fn package_manager(&self) -> PackageManager {
        self.package_manager
    }
}

impl Ecosystem for ReplayEcosystem {
    fn file_parser(&self) -> &dyn FileParser {
        &self.parser
    }

    fn update_checker<'a>(&'a self, request: CheckRequest<'a>) -> Box<dyn UpdateChecker + 'a> {
        let answer = Scenario::lookup(
            &self.scenario.checks,
            request.dependency.directory.as_deref(),
            &request.dependency.name,
        )
        .cloned()
        .unwrap_or_default();
        Box::new(ReplayChecker { request, answer })
    }

    fn file_updater(&self) -> &dyn FileUpdater {
        &self.updater
    }
}

#[derive(Debug, Clone)]
struct ReplayParser {
    package_manager: PackageManager,
    scenario: Scenario,
}

impl FileParser for ReplayParser {
    fn parse(&self, directory: &str, _files: &[DependencyFile]) -> Result<Vec<Dependency>, EcosystemError> {
        if let Some(error) = &self.scenario.parse_error {
            return Err(error.clone());
        }
        let dependencies = self
            .scenario
            .dependencies
            .iter()
            .find(|(dir, _)| crate::domain::normalize_directory(dir) == directory)
            .map(|(_, deps)| deps.clone())
            .unwrap_or_default();

        Ok(dependencies
            .into_iter()
            .map(|mut d| {
                d.package_manager = self.package_manager;
                d.directory = Some(directory.to_string());
                d
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
struct ReplayUpdater {
    scenario: Scenario,
}

impl FileUpdater for ReplayUpdater {
    fn updated_dependency_files(
        &self,
        directory: &str,
        files: &[DependencyFile],
        dependencies: &[Dependency],
    ) -> Result<Vec<DependencyFile>, EcosystemError> {
        let mut updated: Vec<DependencyFile> = Vec::new();
        for dependency in dependencies {
            if let Some(error) = Scenario::lookup(&self.scenario.update_errors, Some(directory), &dependency.name) {
                return Err(error.clone());
            }

            let written = match Scenario::lookup(&self.scenario.updated_files, Some(directory), &dependency.name) {
                Some(recorded) => recorded.clone(),
                None => rewrite_versions(files, dependency),
            };
            for file in written {
                let base = updated
                    .iter()
                    .position(|f| f.path() == file.path());
                match base {
                    Some(index) => updated[index] = file,
                    None => updated.push(file),
                }
            }
        }
        debug!(directory, files = updated.len(), "Replayed file update");
        Ok(updated)
    }
}

/// Replaces the previous version with the new one in the manifests the dependency is declared in
fn rewrite_versions(files: &[DependencyFile], dependency: &Dependency) -> Vec<DependencyFile> {
    let (Some(previous), Some(version)) = (dependency.previous_version.as_deref(), dependency.version.as_deref())
    else {
        return Vec::new();
    };

    files
        .iter()
        .filter(|f| dependency.requirements.iter().any(|r| r.file == f.name))
        .filter_map(|f| {
            let content = f.content.as_deref()?;
            let rewritten = content.replace(previous, version);
            (rewritten != content).then(|| DependencyFile {
                content: Some(rewritten),
                ..f.clone()
            })
        })
        .collect()
}

struct ReplayChecker<'a> {
    request: CheckRequest<'a>,
    answer: CheckAnswer,
}

impl ReplayChecker<'_> {
    fn fail_if_scripted(&self) -> Result<(), EcosystemError> {
        match &self.answer.error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn is_ignored(&self, version: &str) -> bool {
        let Some(parsed) = Version::parse(version) else {
            return false;
        };
        self.request
            .ignored_versions
            .iter()
            .filter_map(|r| VersionRequirement::parse(r).ok())
            .any(|r| r.is_satisfied_by(&parsed))
    }

    fn candidates(&self) -> Vec<String> {
        if self.answer.versions.is_empty() {
            self.answer.latest_version.iter().cloned().collect()
        } else {
            self.answer.versions.clone()
        }
    }

    fn current_version(&self) -> Option<Version> {
        self.request.dependency.version.as_deref().and_then(Version::parse)
    }

    fn target_version(&self) -> Result<Option<String>, EcosystemError> {
        if !self.request.security_advisories.is_empty() {
            if let Some(fix) = self.lowest_security_fix_version()? {
                return Ok(Some(fix));
            }
        }
        self.latest_resolvable_version()
    }
}

impl UpdateChecker for ReplayChecker<'_> {
    fn dependency(&self) -> &Dependency {
        self.request.dependency
    }

    fn latest_version(&self) -> Result<Option<String>, EcosystemError> {
        self.fail_if_scripted()?;
        let candidates = self.candidates();
        let newer: Vec<&String> = candidates
            .iter()
            .filter(|v| match (Version::parse(v), self.current_version()) {
                (Some(candidate), Some(current)) => candidate > current,
                _ => true,
            })
            .collect();
        let allowed: Vec<&String> = newer.iter().copied().filter(|v| !self.is_ignored(v)).collect();

        if allowed.is_empty() && !newer.is_empty() && self.request.raise_on_ignored {
            return Err(EcosystemError::all_versions_ignored(&self.request.dependency.name));
        }

        let latest = allowed
            .into_iter()
            .max_by(|a, b| Version::parse(a).cmp(&Version::parse(b)))
            .cloned();
        Ok(latest.or_else(|| self.request.dependency.version.clone()))
    }

    fn latest_resolvable_version(&self) -> Result<Option<String>, EcosystemError> {
        self.fail_if_scripted()?;
        match &self.answer.latest_resolvable_version {
            Some(version) => Ok(Some(version.clone())),
            None => self.latest_version(),
        }
    }

    fn lowest_security_fix_version(&self) -> Result<Option<String>, EcosystemError> {
        self.fail_if_scripted()?;
        Ok(self.answer.lowest_security_fix_version.clone())
    }

    fn up_to_date(&self) -> Result<bool, EcosystemError> {
        let latest = self.latest_version()?;
        let current = self.current_version();
        Ok(match (latest.as_deref().and_then(Version::parse), current) {
            (Some(latest), Some(current)) => latest <= current,
            (None, _) => true,
            (Some(_), None) => false,
        })
    }

    fn requirements_unlocked_or_can_be(&self) -> bool {
        self.answer.requirements_unlocked.unwrap_or(true)
    }

    fn can_update(&self, unlock: RequirementsToUnlock) -> Result<bool, EcosystemError> {
        self.fail_if_scripted()?;
        match &self.answer.can_update {
            Some(levels) => Ok(levels.iter().any(|l| l == unlock.as_str())),
            None => Ok(!self.updated_dependencies(unlock)?.is_empty() && !self.up_to_date()?),
        }
    }

    fn updated_dependencies(&self, _unlock: RequirementsToUnlock) -> Result<Vec<Dependency>, EcosystemError> {
        self.fail_if_scripted()?;
        let original = self.request.dependency;

        if !self.answer.updated_dependencies.is_empty() {
            return Ok(self
                .answer
                .updated_dependencies
                .iter()
                .cloned()
                .map(|mut d| {
                    d.package_manager = original.package_manager;
                    if d.directory.is_none() {
                        d.directory = original.directory.clone();
                    }
                    d
                })
                .collect());
        }

        let Some(target) = self.target_version()? else {
            return Ok(Vec::new());
        };
        if original.version.as_deref() == Some(target.as_str()) {
            return Ok(Vec::new());
        }

        let requirements = original
            .requirements
            .iter()
            .map(|r| {
                let mut updated = r.clone();
                if let (Some(requirement), Some(previous)) = (&r.requirement, &original.version) {
                    updated.requirement = Some(requirement.replace(previous.as_str(), &target));
                }
                updated
            })
            .collect();

        let mut updated = original.clone();
        updated.version = Some(target);
        updated.previous_version = original.version.clone();
        updated.requirements = requirements;
        updated.previous_requirements = Some(original.requirements.clone());
        updated.attribution = None;
        Ok(vec![updated])
    }

    fn conflicting_dependencies(&self) -> Vec<Value> {
        self.answer.conflicting_dependencies.clone()
    }
}
