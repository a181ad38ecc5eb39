//! Integration tests for depwright
//!
//! These tests verify:
//! - Every operation end to end over a replayed ecosystem
//! - Grouped updates and the solo updates that follow them
//! - Per-dependency errors versus run-halting errors
//! - Job decoding at the boundary

use depwright::ecosystem::{ReplayEcosystem, Scenario};
use depwright::job::Job;
use depwright::service::{CloseReason, RecordingService, Service, ServiceEvent};
use depwright::updater::{run_job, Operation, RunOutcome};
use serde_json::{json, Value};
use std::collections::BTreeSet;

const MANIFEST: &str =
    r#"{"left-pad": "1.0.0", "lodash": "4.17.0", "eslint": "8.0.0", "eslint-plugin-react": "7.0.0"}"#;

fn dep(name: &str, version: &str) -> Value {
    json!({
        "name": name,
        "version": version,
        "package_manager": "npm_and_yarn",
        "requirements": [{"file": "package.json", "requirement": version, "groups": ["dependencies"]}]
    })
}

fn job(extra: Value) -> Value {
    let mut job = json!({
        "id": 1234,
        "package-manager": "npm_and_yarn",
        "source": {"provider": "github", "repo": "acme/app", "directory": "/"}
    });
    if let (Some(job), Value::Object(extra)) = (job.as_object_mut(), extra) {
        job.extend(extra);
    }
    json!({ "job": job })
}

fn scenario(dependencies: Vec<Value>, checks: Value) -> Value {
    json!({
        "files": [{"name": "package.json", "directory": "/", "content": MANIFEST}],
        "dependencies": {"/": dependencies},
        "checks": checks
    })
}

async fn run(job: Value, scenario: Value) -> (RunOutcome, RecordingService) {
    let job = Job::from_value(job).expect("valid job");
    let scenario: Scenario = serde_json::from_value(scenario).expect("valid scenario");
    let ecosystem = ReplayEcosystem::new(job.package_manager, scenario);
    let service = RecordingService::new();
    let outcome = run_job(
        &job,
        ecosystem.dependency_files().to_vec(),
        "abc123",
        &ecosystem,
        &service,
    )
    .await;
    (outcome, service)
}

fn completed(operation: Operation) -> RunOutcome {
    RunOutcome::Completed { operation }
}

mod version_updates {
    use super::*;

    fn left_pad_and_lodash() -> Value {
        scenario(
            vec![dep("left-pad", "1.0.0"), dep("lodash", "4.17.21")],
            json!({
                "left-pad": {"versions": ["1.0.0", "1.1.0"]},
                "lodash": {"versions": ["4.17.21"]}
            }),
        )
    }

    #[tokio::test]
    async fn test_one_pull_request_per_outdated_dependency() {
        let (outcome, service) = run(job(json!({})), left_pad_and_lodash()).await;

        assert_eq!(outcome, completed(Operation::UpdateAllVersions));
        let created = service.created_pull_requests();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].dependencies[0].name, "left-pad");
        assert_eq!(created[0].dependencies[0].version.as_deref(), Some("1.1.0"));
        assert!(created[0].dependency_group.is_none());
        assert_eq!(created[0].updated_files.len(), 1);
        assert!(created[0].updated_files[0].ends_with("package.json"));
        assert!(service.errors().is_empty());
        assert!(service.is_processed());
    }

    #[tokio::test]
    async fn test_existing_pull_request_for_latest_version_is_skipped() {
        let job = job(json!({
            "existing-pull-requests": [[{"dependency-name": "left-pad", "dependency-version": "1.1.0"}]]
        }));
        let (outcome, service) = run(job, left_pad_and_lodash()).await;

        assert_eq!(outcome, completed(Operation::UpdateAllVersions));
        assert!(service.created_pull_requests().is_empty());
        assert!(service.errors().is_empty());
    }

    #[tokio::test]
    async fn test_ignored_versions_are_never_proposed() {
        let job = job(json!({
            "ignore-conditions": [{"dependency-name": "left-pad", "version-requirement": ">= 1.1.0"}]
        }));
        let (_, service) = run(job, left_pad_and_lodash()).await;

        assert!(service.created_pull_requests().is_empty());
        assert!(service.errors().is_empty());
    }

    #[tokio::test]
    async fn test_dependency_error_does_not_stop_the_run() {
        let scenario = scenario(
            vec![dep("broken", "2.0.0"), dep("left-pad", "1.0.0")],
            json!({
                "broken": {"error": {"type": "dependency_file_not_resolvable", "message": "conflict"}},
                "left-pad": {"versions": ["1.1.0"]}
            }),
        );
        let (outcome, service) = run(job(json!({})), scenario).await;

        assert_eq!(outcome, completed(Operation::UpdateAllVersions));
        assert_eq!(service.error_types(), vec!["dependency_file_not_resolvable".to_string()]);
        assert_eq!(service.created_pull_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_halting_error_stops_the_run() {
        let scenario = scenario(
            vec![dep("left-pad", "1.0.0"), dep("lodash", "4.17.0")],
            json!({
                "left-pad": {"error": {"type": "out_of_disk"}},
                "lodash": {"versions": ["4.17.21"]}
            }),
        );
        let (outcome, service) = run(job(json!({})), scenario).await;

        assert_eq!(outcome, RunOutcome::Halted { error_type: "out_of_disk" });
        assert_eq!(service.error_types(), vec!["out_of_disk".to_string()]);
        assert!(service.created_pull_requests().is_empty());
        assert!(service.is_processed());
    }

    #[tokio::test]
    async fn test_unparseable_files_fail_the_run() {
        let scenario = json!({
            "parse_error": {"type": "dependency_file_not_parseable", "file_path": "/package.json", "message": "unexpected token"}
        });
        let (outcome, service) = run(job(json!({})), scenario).await;

        assert_eq!(
            outcome,
            RunOutcome::ParseFailed {
                error_type: Some("dependency_file_not_parseable")
            }
        );
        assert!(service.is_processed());
    }

    #[tokio::test]
    async fn test_each_directory_gets_its_own_pull_request() {
        let job = job(json!({
            "source": {"repo": "acme/app", "directories": ["/frontend", "/backend"]}
        }));
        let scenario = json!({
            "files": [
                {"name": "package.json", "directory": "/frontend", "content": r#"{"left-pad": "1.0.0"}"#},
                {"name": "package.json", "directory": "/backend", "content": r#"{"left-pad": "1.0.5"}"#}
            ],
            "dependencies": {
                "/frontend": [dep("left-pad", "1.0.0")],
                "/backend": [dep("left-pad", "1.0.5")]
            },
            "checks": {
                "/frontend:left-pad": {"versions": ["1.1.0"]},
                "/backend:left-pad": {"versions": ["1.2.0"]}
            }
        });
        let (_, service) = run(job, scenario).await;

        let versions: BTreeSet<String> = service
            .created_pull_requests()
            .iter()
            .flat_map(|pr| pr.dependencies.iter().filter_map(|d| d.version.clone()))
            .collect();
        assert_eq!(versions, BTreeSet::from(["1.1.0".to_string(), "1.2.0".to_string()]));
    }
}

mod grouped_updates {
    use super::*;

    fn lint_group() -> Value {
        json!([{"name": "lint", "rules": {"patterns": ["eslint*"]}}])
    }

    fn lint_scenario() -> Value {
        scenario(
            vec![
                dep("eslint", "8.0.0"),
                dep("eslint-plugin-react", "7.0.0"),
                dep("left-pad", "1.0.0"),
            ],
            json!({
                "eslint": {"versions": ["8.1.0"]},
                "eslint-plugin-react": {"versions": ["7.1.0"]},
                "left-pad": {"versions": ["1.1.0"]}
            }),
        )
    }

    fn names(pr: &depwright::service::ChangeSummary) -> BTreeSet<String> {
        pr.dependencies.iter().map(|d| d.name.clone()).collect()
    }

    #[tokio::test]
    async fn test_group_then_ungrouped_dependencies() {
        let job = job(json!({ "dependency-groups": lint_group() }));
        let (outcome, service) = run(job, lint_scenario()).await;

        assert_eq!(outcome, completed(Operation::GroupUpdateAllVersions));
        let created = service.created_pull_requests();
        assert_eq!(created.len(), 2);

        assert_eq!(created[0].dependency_group.as_deref(), Some("lint"));
        assert_eq!(
            names(&created[0]),
            BTreeSet::from(["eslint".to_string(), "eslint-plugin-react".to_string()])
        );
        assert_eq!(created[0].updated_files.len(), 1);

        assert!(created[1].dependency_group.is_none());
        assert_eq!(names(&created[1]), BTreeSet::from(["left-pad".to_string()]));
    }

    #[tokio::test]
    async fn test_group_with_open_pull_request_is_deferred() {
        let job = job(json!({
            "dependency-groups": lint_group(),
            "existing-group-pull-requests": [{
                "dependency-group-name": "lint",
                "dependencies": [{"dependency-name": "eslint", "dependency-version": "8.1.0"}]
            }]
        }));
        let (_, service) = run(job, lint_scenario()).await;

        let created = service.created_pull_requests();
        assert_eq!(created.len(), 1);
        assert_eq!(names(&created[0]), BTreeSet::from(["left-pad".to_string()]));
    }

    #[tokio::test]
    async fn test_refresh_group_pull_request() {
        let job = job(json!({
            "dependency-groups": lint_group(),
            "dependency-group-to-refresh": "lint",
            "updating-a-pull-request": true,
            "dependencies": ["eslint", "eslint-plugin-react"],
            "existing-group-pull-requests": [{
                "dependency-group-name": "lint",
                "dependencies": [
                    {"dependency-name": "eslint", "dependency-version": "8.1.0"},
                    {"dependency-name": "eslint-plugin-react", "dependency-version": "7.1.0"}
                ]
            }]
        }));
        let (outcome, service) = run(job, lint_scenario()).await;

        assert_eq!(outcome, completed(Operation::RefreshGroupUpdate));
        let updated = service.updated_pull_requests();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].dependency_group.as_deref(), Some("lint"));
        assert!(service.created_pull_requests().is_empty());
        assert!(service.closed_pull_requests().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_group_replaces_when_members_changed() {
        let job = job(json!({
            "dependency-groups": lint_group(),
            "dependency-group-to-refresh": "lint",
            "updating-a-pull-request": true,
            "dependencies": ["eslint"],
            "existing-group-pull-requests": [{
                "dependency-group-name": "lint",
                "dependencies": [{"dependency-name": "eslint", "dependency-version": "8.1.0"}]
            }]
        }));
        let (outcome, service) = run(job, lint_scenario()).await;

        assert_eq!(outcome, completed(Operation::RefreshGroupUpdate));
        assert_eq!(
            service.closed_pull_requests(),
            vec![(vec!["eslint".to_string()], CloseReason::DependenciesChanged)]
        );
        let created = service.created_pull_requests();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].dependency_group.as_deref(), Some("lint"));
        assert_eq!(
            names(&created[0]),
            BTreeSet::from(["eslint".to_string(), "eslint-plugin-react".to_string()])
        );

        let events = service.events();
        let close_at = events
            .iter()
            .position(|e| matches!(e, ServiceEvent::ClosePullRequest { .. }))
            .unwrap();
        let create_at = events
            .iter()
            .position(|e| matches!(e, ServiceEvent::CreatePullRequest { .. }))
            .unwrap();
        assert!(close_at < create_at);
    }

    #[tokio::test]
    async fn test_refresh_group_closes_when_nothing_updates() {
        let job = job(json!({
            "dependency-groups": lint_group(),
            "dependency-group-to-refresh": "lint",
            "updating-a-pull-request": true,
            "dependencies": ["eslint", "eslint-plugin-react"]
        }));
        let scenario = scenario(
            vec![dep("eslint", "8.1.0"), dep("eslint-plugin-react", "7.1.0")],
            json!({
                "eslint": {"versions": ["8.1.0"]},
                "eslint-plugin-react": {"versions": ["7.1.0"]}
            }),
        );
        let (_, service) = run(job, scenario).await;

        assert_eq!(
            service.closed_pull_requests(),
            vec![(
                vec!["eslint".to_string(), "eslint-plugin-react".to_string()],
                CloseReason::UpdateNoLongerPossible
            )]
        );
        assert!(service.created_pull_requests().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_of_removed_group_closes() {
        let job = job(json!({
            "dependency-group-to-refresh": "lint",
            "updating-a-pull-request": true,
            "dependencies": ["eslint"]
        }));
        let (outcome, service) = run(job, lint_scenario()).await;

        assert_eq!(outcome, completed(Operation::RefreshGroupUpdate));
        assert_eq!(
            service.closed_pull_requests(),
            vec![(vec!["eslint".to_string()], CloseReason::DependencyGroupEmpty)]
        );
    }
}

mod refresh_updates {
    use super::*;

    fn refresh_job() -> Value {
        job(json!({
            "updating-a-pull-request": true,
            "dependencies": ["left-pad"],
            "existing-pull-requests": [[{"dependency-name": "left-pad", "dependency-version": "1.1.0"}]]
        }))
    }

    #[tokio::test]
    async fn test_refresh_updates_matching_pull_request() {
        let scenario = scenario(vec![dep("left-pad", "1.0.0")], json!({"left-pad": {"versions": ["1.1.0"]}}));
        let (outcome, service) = run(refresh_job(), scenario).await;

        assert_eq!(outcome, completed(Operation::RefreshVersionUpdate));
        assert_eq!(service.updated_pull_requests().len(), 1);
        assert!(service.created_pull_requests().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_closes_up_to_date_pull_request() {
        let scenario = scenario(vec![dep("left-pad", "1.1.0")], json!({"left-pad": {"versions": ["1.1.0"]}}));
        let (_, service) = run(refresh_job(), scenario).await;

        assert_eq!(
            service.closed_pull_requests(),
            vec![(vec!["left-pad".to_string()], CloseReason::UpToDate)]
        );
    }

    #[tokio::test]
    async fn test_refresh_leads_with_first_requested_dependency() {
        let job = job(json!({
            "updating-a-pull-request": true,
            "dependencies": ["left-pad", "lodash"],
            "existing-pull-requests": [[
                {"dependency-name": "left-pad", "dependency-version": "1.1.0"},
                {"dependency-name": "lodash", "dependency-version": "4.17.21"}
            ]]
        }));
        // lodash is parsed first and already current
        let scenario = scenario(
            vec![dep("lodash", "4.17.21"), dep("left-pad", "1.0.0")],
            json!({
                "lodash": {"versions": ["4.17.21"]},
                "left-pad": {"versions": ["1.1.0"]}
            }),
        );
        let (outcome, service) = run(job, scenario).await;

        assert_eq!(outcome, completed(Operation::RefreshVersionUpdate));
        assert_eq!(
            service.closed_pull_requests(),
            vec![(
                vec!["left-pad".to_string(), "lodash".to_string()],
                CloseReason::DependenciesChanged
            )]
        );
        let created = service.created_pull_requests();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].dependencies.len(), 1);
        assert_eq!(created[0].dependencies[0].name, "left-pad");
        assert_eq!(created[0].dependencies[0].version.as_deref(), Some("1.1.0"));
    }

    #[tokio::test]
    async fn test_refresh_closes_when_update_no_longer_possible() {
        let scenario = scenario(
            vec![dep("left-pad", "1.0.0")],
            json!({"left-pad": {"versions": ["1.1.0"], "can_update": []}}),
        );
        let (_, service) = run(refresh_job(), scenario).await;

        assert_eq!(
            service.closed_pull_requests(),
            vec![(vec!["left-pad".to_string()], CloseReason::UpdateNoLongerPossible)]
        );
        assert!(service.created_pull_requests().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_ignores_allow_rules() {
        let mut job = refresh_job();
        job["job"]["allowed-updates"] = json!([{"dependency-name": "lodash"}]);
        let scenario = scenario(vec![dep("left-pad", "1.0.0")], json!({"left-pad": {"versions": ["1.1.0"]}}));
        let (_, service) = run(job, scenario).await;

        assert!(service.closed_pull_requests().is_empty());
        assert_eq!(service.updated_pull_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_closes_when_dependency_removed() {
        let scenario = scenario(vec![dep("lodash", "4.17.0")], json!({}));
        let (_, service) = run(refresh_job(), scenario).await;

        assert_eq!(
            service.closed_pull_requests(),
            vec![(vec!["left-pad".to_string()], CloseReason::DependencyRemoved)]
        );
    }
}

mod security_updates {
    use super::*;

    fn security_job(affected: &str, updating: bool) -> Value {
        job(json!({
            "security-updates-only": true,
            "updating-a-pull-request": updating,
            "dependencies": ["lodash"],
            "security-advisories": [{"dependency-name": "lodash", "affected-versions": [affected]}]
        }))
    }

    fn lodash_scenario() -> Value {
        scenario(
            vec![dep("lodash", "4.17.0")],
            json!({
                "lodash": {
                    "versions": ["4.17.21", "4.17.22"],
                    "lowest_security_fix_version": "4.17.21"
                }
            }),
        )
    }

    #[tokio::test]
    async fn test_creates_pull_request_with_lowest_fix() {
        let (outcome, service) = run(security_job("< 4.17.21", false), lodash_scenario()).await;

        assert_eq!(outcome, completed(Operation::CreateSecurityUpdate));
        let created = service.created_pull_requests();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].dependencies[0].name, "lodash");
        assert_eq!(created[0].dependencies[0].version.as_deref(), Some("4.17.21"));
        assert!(service.errors().is_empty());
    }

    #[tokio::test]
    async fn test_records_update_not_needed() {
        let (_, service) = run(security_job("< 4.0.0", false), lodash_scenario()).await;

        assert!(service.created_pull_requests().is_empty());
        assert_eq!(service.error_types(), vec!["security_update_not_needed".to_string()]);
    }

    #[tokio::test]
    async fn test_records_update_not_possible() {
        let scenario = scenario(
            vec![dep("lodash", "4.17.0")],
            json!({
                "lodash": {
                    "versions": ["4.17.21"],
                    "lowest_security_fix_version": "4.17.21",
                    "latest_resolvable_version": "4.17.0",
                    "can_update": []
                }
            }),
        );
        let (_, service) = run(security_job("< 4.17.21", false), scenario).await;

        assert!(service.created_pull_requests().is_empty());
        assert_eq!(service.error_types(), vec!["security_update_not_possible".to_string()]);
        let details = service
            .events()
            .into_iter()
            .find_map(|e| match e {
                ServiceEvent::RecordUpdateJobError { error_details, .. } => error_details,
                _ => None,
            })
            .unwrap();
        assert_eq!(details["dependency-name"], "lodash");
        assert_eq!(details["latest-resolvable-version"], "4.17.0");
        assert_eq!(details["lowest-non-vulnerable-version"], "4.17.21");
    }

    #[tokio::test]
    async fn test_records_existing_security_pull_request() {
        let mut job = security_job("< 4.17.21", false);
        job["job"]["existing-pull-requests"] =
            json!([[{"dependency-name": "lodash", "dependency-version": "4.17.21"}]]);
        let (_, service) = run(job, lodash_scenario()).await;

        assert!(service.created_pull_requests().is_empty());
        assert_eq!(
            service.error_types(),
            vec!["pull_request_exists_for_security_update".to_string()]
        );
    }

    #[tokio::test]
    async fn test_security_job_without_dependencies_runs_quietly() {
        let job = job(json!({
            "security-updates-only": true,
            "security-advisories": [{"dependency-name": "lodash", "affected-versions": ["< 4.17.21"]}]
        }));
        let (outcome, service) = run(job, lodash_scenario()).await;

        assert_eq!(outcome, completed(Operation::CreateSecurityUpdate));
        assert!(service.created_pull_requests().is_empty());
        assert!(service.errors().is_empty());
        assert!(service.is_processed());
    }

    #[tokio::test]
    async fn test_refresh_closes_when_no_longer_vulnerable() {
        let mut job = security_job("< 4.0.0", true);
        job["job"]["existing-pull-requests"] =
            json!([[{"dependency-name": "lodash", "dependency-version": "4.17.21"}]]);
        let (outcome, service) = run(job, lodash_scenario()).await;

        assert_eq!(outcome, completed(Operation::RefreshSecurityUpdate));
        assert_eq!(
            service.closed_pull_requests(),
            vec![(vec!["lodash".to_string()], CloseReason::UpToDate)]
        );
    }

    #[tokio::test]
    async fn test_refresh_without_dependencies_closes() {
        let job = job(json!({
            "security-updates-only": true,
            "updating-a-pull-request": true
        }));
        let (outcome, service) = run(job, lodash_scenario()).await;

        assert_eq!(outcome, completed(Operation::RefreshSecurityUpdate));
        assert_eq!(
            service.closed_pull_requests(),
            vec![(Vec::<String>::new(), CloseReason::DependenciesRemoved)]
        );
    }
}

mod job_definition {
    use super::*;

    #[test]
    fn test_unknown_update_type_is_rejected() {
        let result = Job::from_value(job(json!({
            "allowed-updates": [{"update-type": "everything"}]
        })));
        assert!(result.is_err());
    }

    #[test]
    fn test_numeric_id_is_accepted() {
        let job = Job::from_value(job(json!({}))).unwrap();
        assert_eq!(job.id, "1234");
        assert_eq!(Operation::for_job(&job), Some(Operation::UpdateAllVersions));
    }

    #[tokio::test]
    async fn test_completion_is_signalled_once() {
        let service = RecordingService::new();
        service.mark_job_as_processed("abc123").await;
        service.mark_job_as_processed("abc123").await;

        let completions = service
            .events()
            .into_iter()
            .filter(|e| matches!(e, ServiceEvent::MarkJobAsProcessed { .. }))
            .count();
        assert_eq!(completions, 1);
    }
}
