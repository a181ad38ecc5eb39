//! Lenient ordered version numbers
//!
//! Versions are split into numeric and alphanumeric segments. Alphanumeric
//! segments sort below numeric ones, so `1.0.0.rc1 < 1.0.0`, and missing
//! trailing segments compare as zero, so `1.0 == 1.0.0`.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

/// Shape of a version string a registry would publish
static CORRECT_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[vV]?[0-9]+[0-9A-Za-z]*(?:[.\-+_][0-9A-Za-z]+)*$").expect("valid regex")
});

/// Abbreviated or full git commit SHA
static GIT_SHA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{7,40}$").expect("valid regex"));

/// A single version segment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Numeric(u64),
    Text(String),
}

impl Segment {
    fn cmp_segment(&self, other: &Segment) -> Ordering {
        match (self, other) {
            (Segment::Numeric(a), Segment::Numeric(b)) => a.cmp(b),
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            (Segment::Text(_), Segment::Numeric(_)) => Ordering::Less,
            (Segment::Numeric(_), Segment::Text(_)) => Ordering::Greater,
        }
    }
}

/// A parsed version
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

impl Version {
    /// Parses a version string, returning None when it has no segments
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        let mut segments = Vec::new();
        for part in body.split(['.', '-', '+', '_']) {
            if part.is_empty() {
                continue;
            }
            let mut digits = String::new();
            let mut text = String::new();
            for ch in part.chars() {
                if ch.is_ascii_digit() {
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    digits.push(ch);
                } else if ch.is_ascii_alphanumeric() {
                    if !digits.is_empty() {
                        segments.push(Segment::Numeric(digits.parse().ok()?));
                        digits.clear();
                    }
                    text.push(ch.to_ascii_lowercase());
                } else {
                    return None;
                }
            }
            if !digits.is_empty() {
                segments.push(Segment::Numeric(digits.parse().ok()?));
            }
            if !text.is_empty() {
                segments.push(Segment::Text(text));
            }
        }

        if segments.is_empty() {
            return None;
        }

        Some(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    /// Returns true if the string looks like a registry version (not a commit SHA)
    pub fn is_correct(input: &str) -> bool {
        let input = input.trim();
        if GIT_SHA.is_match(input) && input.chars().any(|c| c.is_ascii_alphabetic()) {
            return false;
        }
        CORRECT_VERSION.is_match(input)
    }

    /// Returns the original string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the leading run of numeric segments
    pub fn release(&self) -> Vec<u64> {
        self.segments
            .iter()
            .map_while(|s| match s {
                Segment::Numeric(n) => Some(*n),
                Segment::Text(_) => None,
            })
            .collect()
    }

    /// Returns true if any segment is alphanumeric
    pub fn is_prerelease(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Text(_)))
    }

    /// Builds a version from numeric parts
    pub fn from_release(parts: &[u64]) -> Self {
        let raw = parts
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(".");
        Self {
            raw,
            segments: parts.iter().map(|p| Segment::Numeric(*p)).collect(),
        }
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let zero = Segment::Numeric(0);
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).unwrap_or(&zero);
            let b = other.segments.get(i).unwrap_or(&zero);
            match a.cmp_segment(b) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
