//! Ecosystem collaborators
//!
//! The engine never reads manifests or resolves versions itself. It talks to
//! three collaborators that an ecosystem implementation provides:
//! - [`FileParser`]: dependency files -> dependencies
//! - [`UpdateChecker`]: one dependency -> target version and updated dependencies
//! - [`FileUpdater`]: updated dependencies -> new file contents
//!
//! [`ReplayEcosystem`] answers from a recorded scenario and backs the CLI and
//! the integration tests.

mod replay;

pub use replay::{ReplayEcosystem, Scenario};

use crate::domain::{Dependency, DependencyFile};
use crate::error::EcosystemError;
use crate::group::DependencyGroup;
use crate::job::{RequirementsUpdateStrategy, SecurityAdvisory};
use serde_json::Value;
use std::fmt;

/// How far the checker may loosen manifest requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequirementsToUnlock {
    /// Lockfile-only update
    None,
    /// Only the dependency's own requirements
    Own,
    /// Requirements of other dependencies too
    All,
}

impl RequirementsToUnlock {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementsToUnlock::None => "none",
            RequirementsToUnlock::Own => "own",
            RequirementsToUnlock::All => "all",
        }
    }
}

impl fmt::Display for RequirementsToUnlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything an update checker needs for one dependency
#[derive(Debug, Clone)]
pub struct CheckRequest<'a> {
    pub dependency: &'a Dependency,
    pub dependency_files: &'a [DependencyFile],
    pub ignored_versions: Vec<String>,
    pub security_advisories: Vec<SecurityAdvisory>,
    /// Fail with `AllVersionsIgnored` instead of reporting "up to date"
    pub raise_on_ignored: bool,
    pub requirements_update_strategy: Option<RequirementsUpdateStrategy>,
    pub group: Option<&'a DependencyGroup>,
}

impl<'a> CheckRequest<'a> {
    /// Creates a request without ignores, advisories or group
    pub fn new(dependency: &'a Dependency, dependency_files: &'a [DependencyFile]) -> Self {
        Self {
            dependency,
            dependency_files,
            ignored_versions: Vec::new(),
            security_advisories: Vec::new(),
            raise_on_ignored: false,
            requirements_update_strategy: None,
            group: None,
        }
    }
}

/// Parses dependency files into dependencies
pub trait FileParser: Send + Sync {
    /// Parses the files of one source directory
    fn parse(&self, directory: &str, files: &[DependencyFile]) -> Result<Vec<Dependency>, EcosystemError>;
}

/// Answers update questions for one dependency
pub trait UpdateChecker {
    /// The dependency being checked
    fn dependency(&self) -> &Dependency;

    /// Highest version not excluded by ignore rules
    fn latest_version(&self) -> Result<Option<String>, EcosystemError>;

    /// Highest version the resolver accepts
    fn latest_resolvable_version(&self) -> Result<Option<String>, EcosystemError>;

    /// Lowest version that fixes every advisory
    fn lowest_security_fix_version(&self) -> Result<Option<String>, EcosystemError>;

    fn up_to_date(&self) -> Result<bool, EcosystemError>;

    /// Whether manifest requirements are unlocked or may be unlocked
    fn requirements_unlocked_or_can_be(&self) -> bool;

    fn can_update(&self, unlock: RequirementsToUnlock) -> Result<bool, EcosystemError>;

    /// Dependencies that change when updating at `unlock` level
    fn updated_dependencies(&self, unlock: RequirementsToUnlock) -> Result<Vec<Dependency>, EcosystemError>;

    /// Dependencies blocking a security update
    fn conflicting_dependencies(&self) -> Vec<Value>;
}

/// Writes updated dependencies into dependency files
pub trait FileUpdater: Send + Sync {
    fn updated_dependency_files(
        &self,
        directory: &str,
        files: &[DependencyFile],
        dependencies: &[Dependency],
    ) -> Result<Vec<DependencyFile>, EcosystemError>;
}

/// The collaborators of one package ecosystem
pub trait Ecosystem: Send + Sync {
    fn file_parser(&self) -> &dyn FileParser;

    fn update_checker<'a>(&'a self, request: CheckRequest<'a>) -> Box<dyn UpdateChecker + 'a>;

    fn file_updater(&self) -> &dyn FileUpdater;
}
