//! Output formatting for run reports
//!
//! This module provides:
//! - Text output for human-readable display
//! - JSON output for machine processing

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::service::ServiceEvent;
use crate::updater::RunOutcome;
use serde::Serialize;
use std::io::Write;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for machine processing
    Json,
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Summary only
    Quiet,
    /// Normal output
    #[default]
    Normal,
    /// Detailed output with updated files and error details
    Verbose,
}

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub verbosity: Verbosity,
    /// Whether to use colors (when supported)
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            verbosity: Verbosity::default(),
            color: true,
        }
    }
}

impl OutputConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(json: bool, verbose: bool, quiet: bool) -> Self {
        let format = if json { OutputFormat::Json } else { OutputFormat::Text };

        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };

        Self {
            format,
            verbosity,
            color: true,
        }
    }
}

/// Counts of reported events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventCounts {
    pub created: usize,
    pub updated: usize,
    pub closed: usize,
    pub errors: usize,
}

/// Everything one run reported, ready to be printed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub job_id: String,
    pub outcome: RunOutcome,
    pub events: Vec<ServiceEvent>,
    /// API posts that failed after retries
    #[serde(skip_serializing_if = "is_zero")]
    pub api_failures: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

impl RunReport {
    pub fn new(job_id: impl Into<String>, outcome: RunOutcome, events: Vec<ServiceEvent>) -> Self {
        Self {
            job_id: job_id.into(),
            outcome,
            events,
            api_failures: 0,
        }
    }

    /// Sets the number of failed API posts (builder pattern)
    pub fn with_api_failures(mut self, api_failures: usize) -> Self {
        self.api_failures = api_failures;
        self
    }

    pub fn counts(&self) -> EventCounts {
        let mut counts = EventCounts::default();
        for event in &self.events {
            match event {
                ServiceEvent::CreatePullRequest { .. } => counts.created += 1,
                ServiceEvent::UpdatePullRequest { .. } => counts.updated += 1,
                ServiceEvent::ClosePullRequest { .. } => counts.closed += 1,
                ServiceEvent::RecordUpdateJobError { .. } | ServiceEvent::CaptureException { .. } => {
                    counts.errors += 1
                }
                ServiceEvent::MarkJobAsProcessed { .. } => {}
            }
        }
        counts
    }

    /// Returns true if any error or exception was reported
    pub fn has_errors(&self) -> bool {
        self.events.iter().any(ServiceEvent::is_error)
    }
}

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format and write the whole report
    fn format(&self, report: &RunReport, writer: &mut dyn Write) -> std::io::Result<()>;

    /// Format and write a single event
    fn format_event(&self, event: &ServiceEvent, writer: &mut dyn Write) -> std::io::Result<()>;
}

/// Create an output formatter based on configuration
pub fn create_formatter(config: OutputConfig) -> Box<dyn OutputFormatter> {
    match config.format {
        OutputFormat::Text => Box::new(TextFormatter::with_color(config.verbosity, config.color)),
        OutputFormat::Json => Box::new(JsonFormatter::new(config.verbosity)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::CloseReason;
    use crate::updater::Operation;

    #[test]
    fn test_output_config_from_cli() {
        let config = OutputConfig::from_cli(true, false, false);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.verbosity, Verbosity::Normal);

        let config = OutputConfig::from_cli(false, true, false);
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.verbosity, Verbosity::Verbose);

        // quiet wins over verbose
        let config = OutputConfig::from_cli(false, true, true);
        assert_eq!(config.verbosity, Verbosity::Quiet);
    }

    #[test]
    fn test_report_counts() {
        let report = RunReport::new(
            "1",
            RunOutcome::Completed {
                operation: Operation::RefreshVersionUpdate,
            },
            vec![
                ServiceEvent::ClosePullRequest {
                    dependency_names: vec!["rails".to_string()],
                    reason: CloseReason::UpToDate,
                },
                ServiceEvent::RecordUpdateJobError {
                    error_type: "unknown_error".to_string(),
                    error_details: None,
                    dependency: None,
                },
                ServiceEvent::MarkJobAsProcessed {
                    base_commit_sha: "sha".to_string(),
                },
            ],
        );

        assert_eq!(
            report.counts(),
            EventCounts {
                created: 0,
                updated: 0,
                closed: 1,
                errors: 1
            }
        );
        assert!(report.has_errors());
    }
}
