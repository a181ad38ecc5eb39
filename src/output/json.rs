//! JSON output formatter for machine processing

use crate::output::{EventCounts, OutputFormatter, RunReport, Verbosity};
use crate::service::ServiceEvent;
use crate::updater::RunOutcome;
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Quiet output leaves out the events
    verbosity: Verbosity,
}

impl JsonFormatter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    job_id: &'a str,
    outcome: &'a RunOutcome,
    summary: EventCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<&'a [ServiceEvent]>,
    #[serde(skip_serializing_if = "is_zero")]
    api_failures: usize,
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &RunReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonOutput {
            job_id: &report.job_id,
            outcome: &report.outcome,
            summary: report.counts(),
            events: (self.verbosity != Verbosity::Quiet).then_some(report.events.as_slice()),
            api_failures: report.api_failures,
        };
        serde_json::to_writer_pretty(&mut *writer, &output)?;
        writeln!(writer)
    }

    fn format_event(&self, event: &ServiceEvent, writer: &mut dyn Write) -> std::io::Result<()> {
        serde_json::to_writer(&mut *writer, event)?;
        writeln!(writer)
    }
}
