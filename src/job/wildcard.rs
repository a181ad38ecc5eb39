//! Case-insensitive `*` wildcard matching for dependency names

use regex::Regex;

/// Returns true if `candidate` matches `pattern`, where `*` matches any run of characters
///
/// Everything other than `*` is literal and matching ignores case.
pub fn wildcard_match(pattern: &str, candidate: &str) -> bool {
    to_regex(pattern).is_some_and(|re| re.is_match(&candidate.to_lowercase()))
}

/// Counts the wildcards in a pattern
pub fn wildcard_count(pattern: &str) -> usize {
    pattern.matches('*').count()
}

fn to_regex(pattern: &str) -> Option<Regex> {
    let body = pattern
        .to_lowercase()
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", body)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(wildcard_match("bus", "bus"));
        assert!(!wildcard_match("bus", "business"));
    }

    #[test]
    fn test_trailing_wildcard() {
        assert!(wildcard_match("bus*", "business"));
        assert!(wildcard_match("bus*", "bus"));
        assert!(!wildcard_match("bus*", "omnibus"));
    }

    #[test]
    fn test_inner_wildcards() {
        assert!(wildcard_match("*-client-*", "pg-client-pool"));
        assert!(wildcard_match("@types/*", "@types/node"));
        assert!(wildcard_match("*", "anything"));
    }

    #[test]
    fn test_regex_characters_are_literal() {
        assert!(!wildcard_match("b.ness*", "business"));
        assert!(wildcard_match("b.ness*", "b.nessie"));
        assert!(wildcard_match("a+b", "a+b"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(wildcard_match("Rails", "rails"));
        assert!(wildcard_match("AWS-*", "aws-sdk"));
    }

    #[test]
    fn test_wildcard_count() {
        assert_eq!(wildcard_count("*-*"), 2);
        assert_eq!(wildcard_count("rails"), 0);
    }
}
