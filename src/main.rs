//! depwright - Dependency update orchestration CLI
//!
//! Replays a recorded ecosystem scenario against an update job:
//! - Decides which pull requests to create, update or close
//! - Records per-dependency errors
//! - Prints the reported events, optionally posting them to the update-job API

use anyhow::Context;
use clap::Parser;
use depwright::cli::CliArgs;
use depwright::config::{discover_config, load_config_from_path, ApiTarget, RunSettings};
use depwright::ecosystem::{ReplayEcosystem, Scenario};
use depwright::error::AppError;
use depwright::job::Job;
use depwright::logging::init_tracing;
use depwright::output::{create_formatter, RunReport};
use depwright::progress::JobProgress;
use depwright::service::{ApiClient, ApiService, ApiSettings, RecordingService};
use depwright::updater::run_job;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(args.log_json, args.log_level());

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn read_input(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path).map_err(|source| AppError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    let config = match &args.config {
        Some(path) => load_config_from_path(path)?,
        None => discover_config(Path::new("."))?.unwrap_or_default(),
    };
    let settings = RunSettings::resolve(&args, &config);

    let job = Job::from_json(&read_input(&args.job_file)?)
        .map_err(AppError::from)
        .with_context(|| format!("Invalid job file: {}", args.job_file.display()))?;
    let scenario = Scenario::from_json(&read_input(&args.scenario)?).map_err(|e| AppError::Scenario {
        path: args.scenario.clone(),
        message: e.to_string(),
    })?;

    if args.verbose {
        eprintln!("depwright v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Job: {} ({})", job.id, job.package_manager);
    }

    let ecosystem = ReplayEcosystem::new(job.package_manager, scenario);
    let files = ecosystem.dependency_files().to_vec();

    let progress = JobProgress::start(args.show_progress(), &job.id, job.package_manager);

    let (outcome, events, api_failures) = match &settings.api {
        Some(target) => {
            let service = api_service(target, &job)?;
            let outcome = run_job(&job, files, &args.base_commit, &ecosystem, &service).await;
            (outcome, service.recorded().events(), service.failures())
        }
        None => {
            let service = RecordingService::new();
            let outcome = run_job(&job, files, &args.base_commit, &ecosystem, &service).await;
            (outcome, service.events(), 0)
        }
    };
    progress.finish();

    let report = RunReport::new(job.id.clone(), outcome, events).with_api_failures(api_failures);
    let formatter = create_formatter(settings.output);

    let mut stdout = io::stdout().lock();
    formatter.format(&report, &mut stdout)?;
    stdout.flush()?;

    if report.has_errors() || report.api_failures > 0 {
        // Partial success - the run finished but reported errors
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn api_service(target: &ApiTarget, job: &Job) -> Result<ApiService, AppError> {
    let mut client = ApiClient::with_config(
        target.timeout,
        concat!("depwright/", env!("CARGO_PKG_VERSION")),
    )?
    .with_max_retries(target.max_retries);
    if let Some(token) = &target.token {
        client = client.with_token(token);
    }

    let job_id = target.job_id.clone().unwrap_or_else(|| job.id.clone());
    Ok(ApiService::new(client, ApiSettings::new(&target.api_url, job_id)))
}
