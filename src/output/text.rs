//! Text output formatter for human-readable display
//!
//! One line per reported event, marked `+` (created), `~` (updated),
//! `-` (closed) or `!` (error), followed by a summary line.

use crate::domain::PullRequest;
use crate::output::{OutputFormatter, RunReport, Verbosity};
use crate::service::{ChangeSummary, ServiceEvent};
use crate::updater::RunOutcome;
use colored::Colorize;
use std::io::Write;

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
    color: bool,
}

impl TextFormatter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn marker(&self, marker: &str, event: &ServiceEvent) -> String {
        if !self.color {
            return marker.to_string();
        }
        match event {
            ServiceEvent::CreatePullRequest { .. } => marker.green().bold().to_string(),
            ServiceEvent::UpdatePullRequest { .. } => marker.yellow().bold().to_string(),
            ServiceEvent::ClosePullRequest { .. } => marker.red().to_string(),
            _ => marker.red().bold().to_string(),
        }
    }

    fn describe_change(&self, change: &ChangeSummary) -> String {
        let identity = PullRequest::new(change.dependencies.clone()).to_string();
        match &change.dependency_group {
            Some(group) => format!("{} (group: {})", identity, group),
            None => identity,
        }
    }

    fn write_files(&self, change: &ChangeSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity != Verbosity::Verbose {
            return Ok(());
        }
        for file in &change.updated_files {
            let file = if self.color {
                file.dimmed().to_string()
            } else {
                file.clone()
            };
            writeln!(writer, "    {}", file)?;
        }
        Ok(())
    }

    fn describe_outcome(outcome: &RunOutcome) -> String {
        match outcome {
            RunOutcome::Completed { operation } => format!("{} completed", operation),
            RunOutcome::NoOperation => "no operation applies to this job".to_string(),
            RunOutcome::ParseFailed { error_type } => format!(
                "dependency files could not be parsed ({})",
                error_type.unwrap_or("not recorded")
            ),
            RunOutcome::Halted { error_type } => format!("halted ({})", error_type),
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, report: &RunReport, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity != Verbosity::Quiet {
            for event in &report.events {
                self.format_event(event, writer)?;
            }
        }

        let counts = report.counts();
        let summary = format!(
            "Job {}: {}, {} created, {} updated, {} closed, {} errors",
            report.job_id,
            Self::describe_outcome(&report.outcome),
            counts.created,
            counts.updated,
            counts.closed,
            counts.errors
        );
        if self.color && report.has_errors() {
            writeln!(writer, "{}", summary.yellow())?;
        } else {
            writeln!(writer, "{}", summary)?;
        }

        if report.api_failures > 0 {
            writeln!(writer, "{} API calls failed", report.api_failures)?;
        }
        Ok(())
    }

    fn format_event(&self, event: &ServiceEvent, writer: &mut dyn Write) -> std::io::Result<()> {
        match event {
            ServiceEvent::CreatePullRequest { change, .. } => {
                writeln!(
                    writer,
                    "{} create pull request: {}",
                    self.marker("+", event),
                    self.describe_change(change)
                )?;
                self.write_files(change, writer)
            }
            ServiceEvent::UpdatePullRequest { change, .. } => {
                writeln!(
                    writer,
                    "{} update pull request: {}",
                    self.marker("~", event),
                    self.describe_change(change)
                )?;
                self.write_files(change, writer)
            }
            ServiceEvent::ClosePullRequest {
                dependency_names,
                reason,
            } => writeln!(
                writer,
                "{} close pull request for {}: {}",
                self.marker("-", event),
                dependency_names.join(", "),
                reason.humanized()
            ),
            ServiceEvent::RecordUpdateJobError {
                error_type,
                error_details,
                dependency,
            } => {
                let subject = dependency
                    .as_deref()
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default();
                writeln!(writer, "{} error: {}{}", self.marker("!", event), error_type, subject)?;
                if self.verbosity == Verbosity::Verbose {
                    if let Some(details) = error_details {
                        writeln!(writer, "    {}", details)?;
                    }
                }
                Ok(())
            }
            ServiceEvent::CaptureException { report } => writeln!(
                writer,
                "{} exception: {}: {}",
                self.marker("!", event),
                report.error_class,
                report.message
            ),
            ServiceEvent::MarkJobAsProcessed { base_commit_sha } => {
                if self.verbosity == Verbosity::Verbose {
                    writeln!(writer, "  marked as processed at {}", base_commit_sha)?;
                }
                Ok(())
            }
        }
    }
}
