//! Spinner shown on stderr while a job runs

use crate::domain::PackageManager;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Progress display for a single job run
///
/// Disabled runs never touch the terminal, so stdout stays clean for
/// quiet, verbose and JSON output.
pub struct JobProgress {
    spinner: Option<ProgressBar>,
}

impl JobProgress {
    /// Start a spinner for `job_id` when `enabled`
    pub fn start(enabled: bool, job_id: &str, package_manager: PackageManager) -> Self {
        if !enabled {
            return Self::disabled();
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars(TICK_CHARS)
                .template("{spinner:.cyan} {msg} [{elapsed}]")
                .expect("Invalid template"),
        );
        spinner.set_message(format!("Running job {} ({})", job_id, package_manager));
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self {
            spinner: Some(spinner),
        }
    }

    pub fn disabled() -> Self {
        Self { spinner: None }
    }

    pub fn is_active(&self) -> bool {
        self.spinner.is_some()
    }

    /// Clear the spinner before the report is printed
    pub fn finish(mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_progress_has_no_spinner() {
        let progress = JobProgress::start(false, "1", PackageManager::NpmAndYarn);
        assert!(!progress.is_active());
        progress.finish();
    }

    #[test]
    fn test_enabled_progress_spins_until_finished() {
        let progress = JobProgress::start(true, "1", PackageManager::Bundler);
        assert!(progress.is_active());
        progress.finish();
    }
}
