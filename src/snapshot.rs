//! Dependency snapshot
//!
//! The parsed, policy-filtered and grouped state of a repository at one
//! commit. Per-directory queries take an explicit [`DirectoryContext`] so a
//! run that walks several directories can never read or record state for
//! the wrong one.

use crate::domain::{normalize_directory, Dependency, DependencyFile};
use crate::ecosystem::FileParser;
use crate::error::EcosystemError;
use crate::group::{DependencyGroup, DependencyGroupEngine};
use crate::job::Job;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, info};

/// The source directory a piece of work runs in
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirectoryContext {
    directory: String,
}

impl DirectoryContext {
    /// Creates a context for `directory` (normalised)
    pub fn new(directory: &str) -> Self {
        Self {
            directory: normalize_directory(directory),
        }
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }
}

impl fmt::Display for DirectoryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.directory)
    }
}

#[derive(Debug, Clone)]
struct DirectoryState {
    context: DirectoryContext,
    files: Vec<DependencyFile>,
    dependencies: Vec<Dependency>,
    allowed: Vec<usize>,
}

/// Parsed dependency state for one run
#[derive(Debug, Clone)]
pub struct DependencySnapshot {
    base_commit_sha: String,
    directories: Vec<DirectoryState>,
    handled: HashMap<DirectoryContext, BTreeSet<String>>,
    engine: DependencyGroupEngine,
    requested: Vec<String>,
}

impl DependencySnapshot {
    /// Parses `files` directory by directory and applies the job's policy
    pub fn from_parser(
        job: &Job,
        files: Vec<DependencyFile>,
        base_commit_sha: impl Into<String>,
        parser: &dyn FileParser,
    ) -> Result<Self, EcosystemError> {
        let mut parsed = Vec::new();
        for directory in job.directories() {
            let directory_files: Vec<DependencyFile> = files
                .iter()
                .filter(|f| f.normalized_directory() == directory)
                .cloned()
                .collect();
            let dependencies = parser.parse(&directory, &directory_files)?;
            debug!(
                directory = %directory,
                files = directory_files.len(),
                dependencies = dependencies.len(),
                "Parsed dependency files"
            );
            parsed.push((directory, directory_files, dependencies));
        }
        Ok(Self::from_parsed(job, base_commit_sha, parsed))
    }

    /// Builds a snapshot from already parsed `(directory, files, dependencies)` triples
    pub fn from_parsed(
        job: &Job,
        base_commit_sha: impl Into<String>,
        parsed: Vec<(String, Vec<DependencyFile>, Vec<Dependency>)>,
    ) -> Self {
        let requested = job.requested_dependencies().to_vec();
        let mut engine = DependencyGroupEngine::from_job(job);
        let mut directories = Vec::new();

        for (directory, files, dependencies) in parsed {
            let context = DirectoryContext::new(&directory);
            let allowed: Vec<usize> = if job.security_updates_only {
                matching_requested(&dependencies, &requested)
            } else {
                dependencies
                    .iter()
                    .enumerate()
                    .filter(|(_, d)| job.allowed_update(d))
                    .map(|(i, _)| i)
                    .collect()
            };

            if !dependencies.is_empty() && allowed.is_empty() {
                info!(
                    directory = %context,
                    "Found no dependencies to update after filtering allowed updates"
                );
            }

            let allowed_dependencies: Vec<Dependency> =
                allowed.iter().map(|&i| dependencies[i].clone()).collect();
            engine.assign_to_groups(context.directory(), &allowed_dependencies);

            directories.push(DirectoryState {
                context,
                files,
                dependencies,
                allowed,
            });
        }

        Self {
            base_commit_sha: base_commit_sha.into(),
            directories,
            handled: HashMap::new(),
            engine,
            requested,
        }
    }

    pub fn base_commit_sha(&self) -> &str {
        &self.base_commit_sha
    }

    /// Directory contexts in job order
    pub fn contexts(&self) -> Vec<DirectoryContext> {
        self.directories.iter().map(|d| d.context.clone()).collect()
    }

    fn state(&self, context: &DirectoryContext) -> Option<&DirectoryState> {
        self.directories.iter().find(|d| &d.context == context)
    }

    /// Dependency files of one directory
    pub fn dependency_files(&self, context: &DirectoryContext) -> &[DependencyFile] {
        self.state(context).map(|s| s.files.as_slice()).unwrap_or(&[])
    }

    /// Dependency files across all directories
    pub fn all_dependency_files(&self) -> Vec<DependencyFile> {
        self.directories
            .iter()
            .flat_map(|d| d.files.iter().cloned())
            .collect()
    }

    /// Every parsed dependency of one directory
    pub fn dependencies(&self, context: &DirectoryContext) -> &[Dependency] {
        self.state(context)
            .map(|s| s.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Looks up a parsed dependency by exact name
    pub fn find_dependency(&self, context: &DirectoryContext, name: &str) -> Option<&Dependency> {
        self.dependencies(context).iter().find(|d| d.name == name)
    }

    /// Dependencies the job may update in one directory
    ///
    /// Security-only runs restrict this to the requested dependencies.
    pub fn allowed_dependencies(&self, context: &DirectoryContext) -> Vec<&Dependency> {
        match self.state(context) {
            Some(state) => state.allowed.iter().map(|&i| &state.dependencies[i]).collect(),
            None => Vec::new(),
        }
    }

    /// The requested dependencies, matched case-insensitively
    pub fn job_dependencies(&self, context: &DirectoryContext) -> Vec<&Dependency> {
        match self.state(context) {
            Some(state) => matching_requested(&state.dependencies, &self.requested)
                .into_iter()
                .map(|i| &state.dependencies[i])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Allowed dependencies not yet handled by a group in this directory
    pub fn ungrouped_dependencies(&self, context: &DirectoryContext) -> Vec<&Dependency> {
        let allowed = self.allowed_dependencies(context);
        if self.engine.groups().is_empty() {
            return allowed;
        }
        let handled = self.handled.get(context);
        allowed
            .into_iter()
            .filter(|d| !handled.is_some_and(|h| h.contains(&d.name)))
            .collect()
    }

    /// Records dependencies a group pass took care of in this directory
    pub fn add_handled_dependencies<I, S>(&mut self, context: &DirectoryContext, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.handled
            .entry(context.clone())
            .or_default()
            .extend(names.into_iter().map(Into::into));
    }

    /// Dependencies already handled in this directory
    pub fn handled_dependencies(&self, context: &DirectoryContext) -> BTreeSet<String> {
        self.handled.get(context).cloned().unwrap_or_default()
    }

    /// Group definitions that apply to this run
    pub fn groups(&self) -> &[DependencyGroup] {
        self.engine.groups()
    }

    pub fn find_group(&self, name: &str) -> Option<&DependencyGroup> {
        self.engine.find_group(name)
    }

    pub fn engine(&self) -> &DependencyGroupEngine {
        &self.engine
    }

    /// Allowed dependencies of `group_name` in one directory, in snapshot order
    pub fn group_dependencies(&self, group_name: &str, context: &DirectoryContext) -> Vec<&Dependency> {
        self.allowed_dependencies(context)
            .into_iter()
            .filter(|d| self.engine.is_member(group_name, context.directory(), &d.name))
            .collect()
    }
}

fn matching_requested(dependencies: &[Dependency], requested: &[String]) -> Vec<usize> {
    dependencies
        .iter()
        .enumerate()
        .filter(|(_, d)| requested.iter().any(|r| r.eq_ignore_ascii_case(&d.name)))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PackageManager, Requirement};
    use crate::job::{AllowedUpdate, DependencyType, SecurityAdvisory, Source};

    fn dep(name: &str) -> Dependency {
        Dependency::new(name, Some("1.0.0"), PackageManager::NpmAndYarn)
            .with_requirements(vec![Requirement::new("package.json", Some("^1.0.0"))])
    }

    fn make_job() -> Job {
        Job::new("1", PackageManager::NpmAndYarn, Source::new("acme/app", "/"))
    }

    fn snapshot(job: &Job, deps: Vec<Dependency>) -> DependencySnapshot {
        DependencySnapshot::from_parsed(job, "sha", vec![("/".to_string(), Vec::new(), deps)])
    }

    #[test]
    fn test_allowed_dependencies_filters_policy() {
        let job = make_job().with_allowed_updates(vec![
            AllowedUpdate::new().with_dependency_type(DependencyType::Production)
        ]);
        let snap = snapshot(&job, vec![dep("foo"), dep("bar").development()]);
        let ctx = DirectoryContext::new("/");
        let names: Vec<&str> = snap.allowed_dependencies(&ctx).iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["foo"]);
    }

    #[test]
    fn test_security_only_uses_requested_dependencies() {
        let job = make_job()
            .with_security_updates_only(true)
            .with_dependencies(&["Foo"])
            .with_security_advisories(vec![SecurityAdvisory::new("bar", &["< 2"], &[], &[]).unwrap()]);
        let snap = snapshot(&job, vec![dep("foo"), dep("bar")]);
        let ctx = DirectoryContext::new("/");
        let names: Vec<&str> = snap.allowed_dependencies(&ctx).iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["foo"]);
        assert_eq!(snap.job_dependencies(&ctx).len(), 1);
    }

    #[test]
    fn test_ungrouped_without_groups_is_allowed() {
        let job = make_job();
        let mut snap = snapshot(&job, vec![dep("a"), dep("b")]);
        let ctx = DirectoryContext::new("/");
        snap.add_handled_dependencies(&ctx, ["a"]);
        assert_eq!(snap.ungrouped_dependencies(&ctx).len(), 2);
    }

    #[test]
    fn test_ungrouped_excludes_handled_in_same_directory() {
        let job = Job::new(
            "1",
            PackageManager::NpmAndYarn,
            Source::with_directories("acme/app", &["/api", "/web"]),
        )
        .with_dependency_groups(vec![DependencyGroup::new("db").with_patterns(&["pg-*"])]);
        let mut snap = DependencySnapshot::from_parsed(
            &job,
            "sha",
            vec![
                ("/api".to_string(), Vec::new(), vec![dep("pg-client"), dep("redis")]),
                ("/web".to_string(), Vec::new(), vec![dep("pg-client")]),
            ],
        );
        let api = DirectoryContext::new("/api");
        let web = DirectoryContext::new("web/");

        snap.add_handled_dependencies(&api, ["pg-client"]);
        let names: Vec<&str> = snap.ungrouped_dependencies(&api).iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["redis"]);
        assert_eq!(snap.ungrouped_dependencies(&web).len(), 1);
        assert!(snap.handled_dependencies(&web).is_empty());
        assert_eq!(snap.group_dependencies("db", &web).len(), 1);
    }

    #[test]
    fn test_contexts_follow_job_order() {
        let job = Job::new(
            "1",
            PackageManager::NpmAndYarn,
            Source::with_directories("acme/app", &["/b", "/a"]),
        );
        let snap = DependencySnapshot::from_parsed(
            &job,
            "sha",
            vec![
                ("/b".to_string(), Vec::new(), Vec::new()),
                ("/a".to_string(), Vec::new(), Vec::new()),
            ],
        );
        let dirs: Vec<String> = snap.contexts().iter().map(|c| c.to_string()).collect();
        assert_eq!(dirs, vec!["/b", "/a"]);
    }
}
