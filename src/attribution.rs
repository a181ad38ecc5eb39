//! Dependency selection attribution
//!
//! Records why a dependency ended up in (or was filtered out of) a change,
//! and summarises those stamps for telemetry.

use crate::domain::Dependency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Why a dependency was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// Matched the group (or was the requested dependency) directly
    Direct,
    /// Already updated by an earlier change in the same run
    AlreadyUpdated,
    /// Pulled into the change as a side effect of another update
    DependencyDrift,
    /// Updated but not a member of the group
    NotInGroup,
    /// Updated but excluded by allow or ignore configuration
    FilteredByConfig,
    /// No better reason is known
    Unknown,
}

impl SelectionReason {
    /// Returns the wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionReason::Direct => "direct",
            SelectionReason::AlreadyUpdated => "already_updated",
            SelectionReason::DependencyDrift => "dependency_drift",
            SelectionReason::NotInGroup => "not_in_group",
            SelectionReason::FilteredByConfig => "filtered_by_config",
            SelectionReason::Unknown => "unknown",
        }
    }

    /// Parses a wire name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "direct" => Some(SelectionReason::Direct),
            "already_updated" => Some(SelectionReason::AlreadyUpdated),
            "dependency_drift" => Some(SelectionReason::DependencyDrift),
            "not_in_group" => Some(SelectionReason::NotInGroup),
            "filtered_by_config" => Some(SelectionReason::FilteredByConfig),
            "unknown" => Some(SelectionReason::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Selection metadata stamped onto a dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_group: Option<String>,
    pub selection_reason: SelectionReason,
    pub directory: String,
    pub annotated_at: DateTime<Utc>,
}

/// Stamps `dependency` with its selection metadata
pub fn annotate(
    dependency: &mut Dependency,
    source_group: Option<&str>,
    reason: SelectionReason,
    directory: &str,
) {
    dependency.attribution = Some(Attribution {
        source_group: source_group.map(str::to_string),
        selection_reason: reason,
        directory: directory.to_string(),
        annotated_at: Utc::now(),
    });
}

/// Stamps `dependency` from an untyped reason; unknown reasons are ignored
///
/// Returns true if the stamp was applied.
pub fn annotate_raw(
    dependency: &mut Dependency,
    source_group: Option<&str>,
    reason: &str,
    directory: &str,
) -> bool {
    match SelectionReason::parse(reason) {
        Some(reason) => {
            annotate(dependency, source_group, reason, directory);
            true
        }
        None => {
            debug!(dependency = %dependency.name, reason, "ignoring unknown selection reason");
            false
        }
    }
}

/// Aggregate view over attribution stamps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySummary {
    pub total_dependencies: usize,
    pub attributed_dependencies: usize,
    pub attribution_coverage: f64,
    pub by_reason: BTreeMap<String, usize>,
    pub by_group: BTreeMap<String, usize>,
    pub by_directory: BTreeMap<String, usize>,
}

/// Summarises the attribution stamps of `dependencies`
pub fn telemetry_summary(dependencies: &[Dependency]) -> TelemetrySummary {
    let mut by_reason = BTreeMap::new();
    let mut by_group = BTreeMap::new();
    let mut by_directory = BTreeMap::new();
    let mut attributed = 0;

    for attribution in dependencies.iter().filter_map(|d| d.attribution.as_ref()) {
        attributed += 1;
        *by_reason
            .entry(attribution.selection_reason.as_str().to_string())
            .or_insert(0) += 1;
        if let Some(group) = &attribution.source_group {
            *by_group.entry(group.clone()).or_insert(0) += 1;
        }
        *by_directory.entry(attribution.directory.clone()).or_insert(0) += 1;
    }

    let total = dependencies.len();
    let coverage = if total == 0 {
        0.0
    } else {
        attributed as f64 / total as f64
    };

    TelemetrySummary {
        total_dependencies: total,
        attributed_dependencies: attributed,
        attribution_coverage: coverage,
        by_reason,
        by_group,
        by_directory,
    }
}
