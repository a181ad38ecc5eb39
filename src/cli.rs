//! CLI argument parsing module for depwright

use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

/// Replays an update job against recorded ecosystem answers
#[derive(Parser, Debug, Clone)]
#[command(
    name = "depwright",
    version,
    about = "Dependency update orchestration engine"
)]
pub struct CliArgs {
    /// Job definition file (`{"job": {...}}`)
    pub job_file: PathBuf,

    /// Recorded ecosystem scenario to replay (files, dependencies, update checks)
    #[arg(short, long)]
    pub scenario: PathBuf,

    /// Commit the dependency files were read at
    #[arg(long, default_value = "HEAD")]
    pub base_commit: String,

    /// Settings file (default: ./depwright.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    // Reporting API
    /// Update-job API base URL; events are also posted there
    #[arg(long, env = "DEPWRIGHT_API_URL")]
    pub api_url: Option<String>,

    /// Job id used in API URLs (default: the id in the job definition)
    #[arg(long, env = "DEPWRIGHT_JOB_ID")]
    pub job_id: Option<String>,

    /// Job token sent as the Authorization header
    #[arg(long, env = "DEPWRIGHT_JOB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    // Output options
    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl CliArgs {
    /// Default log level when `RUST_LOG` is not set
    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else if self.quiet {
            Level::ERROR
        } else {
            Level::WARN
        }
    }

    /// The spinner is only drawn for plain interactive runs
    pub fn show_progress(&self) -> bool {
        !(self.quiet || self.verbose || self.json || self.log_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_default_args() {
        let args = parse(&["depwright", "job.json", "--scenario", "scenario.json"]);
        assert_eq!(args.job_file, PathBuf::from("job.json"));
        assert_eq!(args.scenario, PathBuf::from("scenario.json"));
        assert_eq!(args.base_commit, "HEAD");
        assert!(args.config.is_none());
        assert!(!args.json);
        assert!(!args.verbose);
        assert!(!args.quiet);
        assert_eq!(args.log_level(), Level::WARN);
        assert!(args.show_progress());
    }

    #[test]
    fn test_output_flags() {
        let args = parse(&[
            "depwright",
            "job.json",
            "-s",
            "scenario.json",
            "--json",
            "--verbose",
            "--base-commit",
            "abc123",
        ]);
        assert!(args.json);
        assert!(args.verbose);
        assert_eq!(args.base_commit, "abc123");
        assert_eq!(args.log_level(), Level::DEBUG);
        assert!(!args.show_progress());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = CliArgs::try_parse_from(["depwright", "job.json", "-s", "s.json", "-q", "-v"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_scenario_is_required() {
        let result = CliArgs::try_parse_from(["depwright", "job.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_api_flags() {
        let args = parse(&[
            "depwright",
            "job.json",
            "-s",
            "scenario.json",
            "--api-url",
            "http://localhost:8080",
            "--job-id",
            "42",
            "--token",
            "secret",
        ]);
        assert_eq!(args.api_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(args.job_id.as_deref(), Some("42"));
        assert_eq!(args.token.as_deref(), Some("secret"));
    }
}
