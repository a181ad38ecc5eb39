//! Property tests for the policy and identity core
//!
//! These tests verify:
//! - Allow rules agree with a naive reference matcher, security rules included
//! - Grouping covers every dependency exactly once as member or ungrouped
//! - Pull request identity ignores order, and directories when one side lacks them
//! - The previous-version check names exactly the offending dependencies

use depwright::change::DependencyChange;
use depwright::domain::{Dependency, PackageManager, PullRequest, PullRequestDependency, Requirement};
use depwright::error::ChangeError;
use depwright::group::{DependencyGroup, DependencyGroupEngine};
use depwright::job::{AllowedUpdate, AllowedUpdateType, DependencyType, Job, SecurityAdvisory, Source};
use proptest::prelude::*;
use std::collections::BTreeSet;

const NAMES: &[&str] = &["pg-client", "pg-pool", "redis", "rails", "rake", "left-pad"];

fn dependency_type() -> impl Strategy<Value = Option<DependencyType>> {
    prop_oneof![
        Just(None),
        Just(Some(DependencyType::All)),
        Just(Some(DependencyType::Direct)),
        Just(Some(DependencyType::Indirect)),
        Just(Some(DependencyType::Production)),
        Just(Some(DependencyType::Development)),
    ]
}

fn allow_rule() -> impl Strategy<Value = AllowedUpdate> {
    (
        proptest::option::of(proptest::sample::select(NAMES)),
        dependency_type(),
        any::<bool>(),
    )
        .prop_map(|(name, dependency_type, security)| {
            let mut rule = AllowedUpdate::new();
            if let Some(name) = name {
                rule = rule.with_name(name);
            }
            if let Some(dependency_type) = dependency_type {
                rule = rule.with_dependency_type(dependency_type);
            }
            if security {
                rule = rule.security_only();
            }
            rule
        })
}

fn dependency() -> impl Strategy<Value = Dependency> {
    (proptest::sample::select(NAMES), any::<bool>(), any::<bool>()).prop_map(|(name, top_level, production)| {
        let mut dependency = Dependency::new(name, Some("1.0.0"), PackageManager::NpmAndYarn);
        if top_level {
            dependency = dependency.with_requirements(vec![Requirement::new("package.json", Some("^1.0.0"))]);
        }
        if !production {
            dependency = dependency.development();
        }
        dependency
    })
}

/// Reference semantics of one allow rule
///
/// Security rules and security-only jobs require a vulnerable dependency;
/// security-only jobs also let top-level rule types reach transitive dependencies.
fn reference_rule_matches(
    rule: &AllowedUpdate,
    dependency: &Dependency,
    security_only: bool,
    vulnerable: bool,
) -> bool {
    if (rule.update_type == AllowedUpdateType::Security || security_only) && !vulnerable {
        return false;
    }
    if let Some(name) = &rule.dependency_name {
        if name != &dependency.name {
            return false;
        }
    }
    let top_level = !dependency.requirements.is_empty();
    let reaches = top_level || security_only;
    match rule.dependency_type.unwrap_or(DependencyType::All) {
        DependencyType::All => true,
        DependencyType::Direct => reaches,
        DependencyType::Indirect => !top_level,
        DependencyType::Production => reaches && dependency.production,
        DependencyType::Development => reaches && !dependency.production,
    }
}

fn job_with_rules(rules: Vec<AllowedUpdate>, security_only: bool, advisories: Vec<SecurityAdvisory>) -> Job {
    Job::new("1", PackageManager::NpmAndYarn, Source::new("acme/app", "/"))
        .with_allowed_updates(rules)
        .with_security_updates_only(security_only)
        .with_security_advisories(advisories)
}

proptest! {
    #[test]
    fn prop_allow_rules_match_reference(
        rules in proptest::collection::vec(allow_rule(), 0..4),
        dependency in dependency(),
        security_only in any::<bool>(),
        vulnerable in any::<bool>(),
    ) {
        let expected = rules
            .iter()
            .any(|r| reference_rule_matches(r, &dependency, security_only, vulnerable));
        let advisories = if vulnerable {
            vec![SecurityAdvisory::new(dependency.name.clone(), &["< 2.0.0"], &[], &[]).unwrap()]
        } else {
            Vec::new()
        };
        let job = job_with_rules(rules, security_only, advisories);
        prop_assert_eq!(job.vulnerable(&dependency), vulnerable);
        prop_assert_eq!(job.allowed_update(&dependency), expected);
    }

    #[test]
    fn prop_grouping_is_total(
        names in proptest::sample::subsequence(NAMES.to_vec(), 0..=NAMES.len()),
        patterns in proptest::sample::subsequence(vec!["pg-*", "ra*", "redis", "*pad"], 1..=4),
    ) {
        let groups: Vec<DependencyGroup> = patterns
            .iter()
            .enumerate()
            .map(|(i, p)| DependencyGroup::new(format!("group-{}", i)).with_patterns(&[*p]))
            .collect();
        let dependencies: Vec<Dependency> = names
            .iter()
            .map(|n| Dependency::new(*n, Some("1.0.0"), PackageManager::NpmAndYarn))
            .collect();

        let mut engine = DependencyGroupEngine::new(groups.clone(), false);
        engine.assign_to_groups("/", &dependencies);

        let mut covered: BTreeSet<String> = engine
            .ungrouped_names_in("/")
            .into_iter()
            .map(str::to_string)
            .collect();
        for group in &groups {
            for dependency in &dependencies {
                // membership is reflexive without single-group enforcement
                let member = engine.is_member(&group.name, "/", &dependency.name);
                prop_assert_eq!(member, group.matches(dependency));
            }
            covered.extend(engine.member_names_in(&group.name, "/").into_iter().map(str::to_string));
        }

        let all: BTreeSet<String> = names.iter().map(|n| n.to_string()).collect();
        prop_assert_eq!(covered, all);

        for ungrouped in engine.ungrouped_names_in("/") {
            prop_assert!(groups.iter().all(|g| !engine.is_member(&g.name, "/", ungrouped)));
        }
    }

    #[test]
    fn prop_pull_request_identity_ignores_order(
        entries in proptest::sample::subsequence(NAMES.to_vec(), 1..=NAMES.len()),
        rotation in 0usize..6,
        strip in 0usize..6,
    ) {
        let build = |name: &str, directory: &str| {
            PullRequestDependency::new(name, Some("2.0.0")).with_directory(directory)
        };
        let original: Vec<PullRequestDependency> = entries.iter().map(|n| build(*n, "/a")).collect();

        let mut rotated = original.clone();
        rotated.rotate_left(rotation % original.len());
        prop_assert_eq!(PullRequest::new(original.clone()), PullRequest::new(rotated.clone()));

        // one side loses a directory, the other moves everything elsewhere
        let mut partial = rotated;
        let index = strip % partial.len();
        partial[index].directory = None;
        let moved: Vec<PullRequestDependency> = entries.iter().map(|n| build(*n, "/b")).collect();
        prop_assert_eq!(PullRequest::new(partial), PullRequest::new(moved));
    }

    #[test]
    fn prop_previous_version_check_names_offenders(
        flags in proptest::collection::vec((any::<bool>(), any::<bool>()), 1..6),
    ) {
        let dependencies: Vec<Dependency> = flags
            .iter()
            .enumerate()
            .map(|(i, (has_previous, requirements_moved))| {
                let current = vec![Requirement::new("package.json", Some("^2.0.0"))];
                let previous = if *requirements_moved {
                    vec![Requirement::new("package.json", Some("^1.0.0"))]
                } else {
                    current.clone()
                };
                Dependency::new(format!("dep-{}", i), Some("2.0.0"), PackageManager::NpmAndYarn)
                    .with_requirements(current)
                    .with_previous(has_previous.then_some("1.0.0"), Some(previous))
            })
            .collect();

        let change = DependencyChange::new(dependencies, Vec::new(), None);
        let valid = flags.iter().all(|(has_previous, moved)| *has_previous || *moved);

        match change.check_dependencies_have_previous_version() {
            Ok(()) => prop_assert!(valid),
            Err(ChangeError::InvalidUpdatedDependencies { no_previous_version, no_requirements_change }) => {
                prop_assert!(!valid);
                let expected_no_previous: Vec<String> = flags
                    .iter()
                    .enumerate()
                    .filter(|(_, (has_previous, _))| !has_previous)
                    .map(|(i, _)| format!("dep-{}", i))
                    .collect();
                let expected_no_change: Vec<String> = flags
                    .iter()
                    .enumerate()
                    .filter(|(_, (_, moved))| !moved)
                    .map(|(i, _)| format!("dep-{}", i))
                    .collect();
                prop_assert_eq!(no_previous_version, expected_no_previous);
                prop_assert_eq!(no_requirements_change, expected_no_change);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
