//! Version requirement matching
//!
//! Supports the operators found across ecosystems:
//! - `=`, `==`, `!=`, `>`, `>=`, `<`, `<=`
//! - `~>` (pessimistic), `~` (tilde), `^` (caret)
//! - wildcards such as `*`, `1.x`, `1.2.*`
//! - comma or whitespace separated conjunctions and `||` alternatives

use super::Version;
use crate::error::JobError;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// A single `operator version` token
static COMPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(~>|>=|<=|!=|==|=|>|<|\^|~)?\s*([0-9A-Za-z*][0-9A-Za-z.*+\-_]*)")
        .expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, PartialEq)]
struct Bound {
    op: Op,
    version: Version,
}

impl Bound {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    fn satisfied_by(&self, candidate: &Version) -> bool {
        match self.op {
            Op::Eq => candidate == &self.version,
            Op::Ne => candidate != &self.version,
            Op::Gt => candidate > &self.version,
            Op::Ge => candidate >= &self.version,
            Op::Lt => candidate < &self.version,
            Op::Le => candidate <= &self.version,
        }
    }
}

/// A parsed version requirement
#[derive(Debug, Clone, PartialEq)]
pub struct VersionRequirement {
    raw: String,
    alternatives: Vec<Vec<Bound>>,
}

impl VersionRequirement {
    /// Parses a requirement string
    pub fn parse(input: &str) -> Result<Self, JobError> {
        let invalid = |message: &str| JobError::InvalidRequirement {
            requirement: input.to_string(),
            message: message.to_string(),
        };

        let mut alternatives = Vec::new();
        for alternative in input.split("||") {
            let alternative = alternative.replace(',', " ");
            if alternative.trim().is_empty() {
                return Err(invalid("empty alternative"));
            }

            let mut bounds = Vec::new();
            let mut consumed = 0;
            for caps in COMPARATOR.captures_iter(&alternative) {
                let whole = caps.get(0).ok_or_else(|| invalid("unparseable comparator"))?;
                if !alternative[consumed..whole.start()].trim().is_empty() {
                    return Err(invalid("unexpected characters"));
                }
                consumed = whole.end();

                let op = caps.get(1).map(|m| m.as_str()).unwrap_or("=");
                let version = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                bounds.extend(expand(op, version).ok_or_else(|| invalid("invalid version"))?);
            }
            if !alternative[consumed..].trim().is_empty() {
                return Err(invalid("unexpected trailing characters"));
            }
            alternatives.push(bounds);
        }

        Ok(Self {
            raw: input.trim().to_string(),
            alternatives,
        })
    }

    /// Returns true if `version` satisfies the requirement
    pub fn is_satisfied_by(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|bounds| bounds.iter().all(|b| b.satisfied_by(version)))
    }

    /// Parses `version` and checks it; unparseable versions never match
    pub fn matches(&self, version: &str) -> bool {
        Version::parse(version).is_some_and(|v| self.is_satisfied_by(&v))
    }

    /// Returns the original requirement string
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Expands one comparator into plain bounds
fn expand(op: &str, version: &str) -> Option<Vec<Bound>> {
    let is_wildcard = |s: &str| s == "*" || s.eq_ignore_ascii_case("x");
    let parts: Vec<&str> = version.trim_start_matches(['v', 'V']).split('.').collect();

    if let Some(wild_at) = parts.iter().position(|p| is_wildcard(p)) {
        // `*`, `1.x`, `1.2.*`: everything under the fixed prefix
        let prefix: Vec<u64> = parts[..wild_at]
            .iter()
            .map(|p| p.parse().ok())
            .collect::<Option<_>>()?;
        if prefix.is_empty() {
            return Some(Vec::new());
        }
        return Some(prefix_range(&prefix));
    }

    let parsed = Version::parse(version)?;
    let release = parsed.release();

    let bounds = match op {
        "=" | "==" => vec![Bound::new(Op::Eq, parsed)],
        "!=" => vec![Bound::new(Op::Ne, parsed)],
        ">" => vec![Bound::new(Op::Gt, parsed)],
        ">=" => vec![Bound::new(Op::Ge, parsed)],
        "<" => vec![Bound::new(Op::Lt, parsed)],
        "<=" => vec![Bound::new(Op::Le, parsed)],
        "~>" => {
            let upper = bump(&release, release.len().saturating_sub(2))?;
            vec![Bound::new(Op::Ge, parsed), Bound::new(Op::Lt, upper)]
        }
        "~" => {
            let keep = if release.len() > 1 { 1 } else { 0 };
            let upper = bump(&release, keep)?;
            vec![Bound::new(Op::Ge, parsed), Bound::new(Op::Lt, upper)]
        }
        "^" => {
            let index = release
                .iter()
                .position(|n| *n != 0)
                .unwrap_or(release.len().saturating_sub(1));
            let upper = bump(&release, index)?;
            vec![Bound::new(Op::Ge, parsed), Bound::new(Op::Lt, upper)]
        }
        _ => return None,
    };
    Some(bounds)
}

/// `>= prefix, < prefix with its last part incremented`
fn prefix_range(prefix: &[u64]) -> Vec<Bound> {
    let lower = Version::from_release(prefix);
    let mut upper = prefix.to_vec();
    if let Some(last) = upper.last_mut() {
        *last += 1;
    }
    vec![
        Bound::new(Op::Ge, lower),
        Bound::new(Op::Lt, Version::from_release(&upper)),
    ]
}

/// Increments the part at `index` and drops everything after it
fn bump(release: &[u64], index: usize) -> Option<Version> {
    if release.is_empty() {
        return None;
    }
    let mut parts: Vec<u64> = release[..=index.min(release.len() - 1)].to_vec();
    if let Some(last) = parts.last_mut() {
        *last += 1;
    }
    Some(Version::from_release(&parts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(s: &str) -> VersionRequirement {
        VersionRequirement::parse(s).unwrap()
    }

    #[test]
    fn test_simple_operators() {
        assert!(req(">= 1.0").matches("1.0.0"));
        assert!(!req("> 1.8.0").matches("1.8.0"));
        assert!(req("> 1.8.0").matches("1.9.0"));
        assert!(req("< 2").matches("1.99"));
        assert!(req("!= 1.5.0").matches("1.4.0"));
        assert!(!req("!= 1.5.0").matches("1.5"));
        assert!(req("1.2.3").matches("1.2.3"));
    }

    #[test]
    fn test_pessimistic() {
        let r = req("~> 1.11.0");
        assert!(r.matches("1.11.0"));
        assert!(r.matches("1.11.9"));
        assert!(!r.matches("1.12.0"));
        assert!(!r.matches("1.8.0"));

        let r = req("~> 2.1");
        assert!(r.matches("2.9"));
        assert!(!r.matches("3.0"));
    }

    #[test]
    fn test_tilde_and_caret() {
        assert!(req("~1.2.3").matches("1.2.9"));
        assert!(!req("~1.2.3").matches("1.3.0"));
        assert!(req("^1.2.3").matches("1.9.0"));
        assert!(!req("^1.2.3").matches("2.0.0"));
        assert!(req("^0.2.3").matches("0.2.9"));
        assert!(!req("^0.2.3").matches("0.3.0"));
    }

    #[test]
    fn test_wildcards() {
        assert!(req("*").matches("99.0"));
        assert!(req("1.x").matches("1.4.2"));
        assert!(!req("1.x").matches("2.0.0"));
        assert!(req("1.2.*").matches("1.2.7"));
        assert!(!req("1.2.*").matches("1.3.0"));
    }

    #[test]
    fn test_conjunction_and_alternatives() {
        let r = req(">= 1.0, < 2.0");
        assert!(r.matches("1.5"));
        assert!(!r.matches("2.0"));

        let r = req(">= 1.0 < 2.0");
        assert!(r.matches("1.5"));

        let r = req("< 1.0 || >= 3.0");
        assert!(r.matches("0.9"));
        assert!(r.matches("3.1"));
        assert!(!r.matches("2.0"));
    }

    #[test]
    fn test_invalid_requirements() {
        assert!(VersionRequirement::parse("").is_err());
        assert!(VersionRequirement::parse(">= 1.0 ||").is_err());
        assert!(VersionRequirement::parse(">>> 1.0").is_err());
    }

    #[test]
    fn test_unparseable_version_never_matches() {
        assert!(!req(">= 0").matches("not a version!"));
    }
}
