//! Pattern specificity scoring for overlapping groups
//!
//! When a dependency matches several groups and single-group enforcement is
//! on, only the most specific groups keep it. Scores:
//!
//! - exact name pattern: 1000
//! - bare `*`: 1
//! - non-wildcard pattern that is not the name: 500
//! - wildcard pattern: `100 - 10 * wildcards + max(len - 5, 0)`
//!
//! A group scores the best of its matching patterns and 500 without patterns,
//! so a group naming the dependency exactly always wins.

use super::DependencyGroup;
use crate::job::wildcard::wildcard_count;

/// Score of an exact name match; never displaced
pub const EXACT_SCORE: u32 = 1000;
const NO_PATTERN_SCORE: u32 = 500;
const UNIVERSAL_SCORE: u32 = 1;
const WILDCARD_BASE: i64 = 100;
const WILDCARD_PENALTY: i64 = 10;

/// Scores a single pattern against a dependency name
pub fn pattern_score(pattern: &str, name: &str) -> u32 {
    if pattern.eq_ignore_ascii_case(name) {
        return EXACT_SCORE;
    }
    if pattern == "*" {
        return UNIVERSAL_SCORE;
    }
    let wildcards = wildcard_count(pattern) as i64;
    if wildcards == 0 {
        return NO_PATTERN_SCORE;
    }
    let length_bonus = (pattern.len() as i64 - 5).max(0);
    (WILDCARD_BASE - WILDCARD_PENALTY * wildcards + length_bonus).max(1) as u32
}

/// Scores how specifically `group` claims the dependency `name`
pub fn group_score(group: &DependencyGroup, name: &str) -> u32 {
    if group.rules.patterns.is_empty() {
        return NO_PATTERN_SCORE;
    }
    group
        .matching_patterns(name)
        .map(|p| pattern_score(p, name))
        .max()
        .unwrap_or(0)
}

/// Sort key: score first, then rule count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    pub score: u32,
    pub rule_count: usize,
}

impl Specificity {
    pub fn of(group: &DependencyGroup, name: &str) -> Self {
        Self {
            score: group_score(group, name),
            rule_count: group.rules.rule_count(),
        }
    }
}

/// Keeps the candidates that are not strictly less specific than another candidate
///
/// Candidates scoring [`EXACT_SCORE`] always survive. Otherwise every
/// candidate tied for the best `(score, rule_count)` survives.
pub fn most_specific(candidates: &[(usize, Specificity)]) -> Vec<usize> {
    let exact: Vec<usize> = candidates
        .iter()
        .filter(|(_, s)| s.score >= EXACT_SCORE)
        .map(|(i, _)| *i)
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    let Some(best) = candidates.iter().map(|(_, s)| *s).max() else {
        return Vec::new();
    };
    candidates
        .iter()
        .filter(|(_, s)| *s == best)
        .map(|(i, _)| *i)
        .collect()
}
