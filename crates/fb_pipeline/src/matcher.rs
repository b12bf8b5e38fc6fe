//! Display-name matching
//!
//! Free-text names typed at submission time rarely match canonical records
//! exactly ("Jane Doe" vs "Dr. Jane Doe"). The default `SubstringMatcher`
//! accepts either name containing the other, case-insensitively. It can
//! merge distinct people whose names nest ("Li" and "Ali Khan"); swap in
//! `ExactMatcher` or another `NameMatcher` where that matters.
//!
//! An empty name (after trimming) never matches anything.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub trait NameMatcher: Send + Sync {
    /// Whether `mention` (submission text) refers to `canonical` (stored
    /// identity name).
    fn matches(&self, mention: &str, canonical: &str) -> bool;
}

/// Bidirectional, case-insensitive substring match.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl NameMatcher for SubstringMatcher {
    fn matches(&self, mention: &str, canonical: &str) -> bool {
        let mention = mention.trim().to_lowercase();
        let canonical = canonical.trim().to_lowercase();
        if mention.is_empty() || canonical.is_empty() {
            return false;
        }
        canonical.contains(&mention) || mention.contains(&canonical)
    }
}

/// Trimmed, case-insensitive equality with inner whitespace collapsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl NameMatcher for ExactMatcher {
    fn matches(&self, mention: &str, canonical: &str) -> bool {
        let mention = collapse(mention);
        !mention.is_empty() && mention == collapse(canonical)
    }
}

fn collapse(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    #[default]
    Substring,
    Exact,
}

impl MatcherKind {
    pub fn build(&self) -> Arc<dyn NameMatcher> {
        match self {
            MatcherKind::Substring => Arc::new(SubstringMatcher),
            MatcherKind::Exact => Arc::new(ExactMatcher),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_matches_both_directions() {
        let m = SubstringMatcher;
        assert!(m.matches("Jane Doe", "Dr. Jane Doe"));
        assert!(m.matches("Dr. Jane Doe", "Jane Doe"));
        assert!(m.matches("  jane DOE ", "Dr. Jane Doe"));
        assert!(!m.matches("John Doe", "Dr. Jane Doe"));
    }

    #[test]
    fn empty_names_never_match() {
        let m = SubstringMatcher;
        assert!(!m.matches("", "Jane Doe"));
        assert!(!m.matches("Jane Doe", "   "));
        assert!(!ExactMatcher.matches("", ""));
    }

    #[test]
    fn exact_ignores_case_and_spacing_only() {
        let m = ExactMatcher;
        assert!(m.matches("jane   doe", "Jane Doe"));
        assert!(!m.matches("Jane Doe", "Dr. Jane Doe"));
    }

    #[test]
    fn kind_builds_matching_strategy() {
        assert!(MatcherKind::Substring.build().matches("Doe", "Jane Doe"));
        assert!(!MatcherKind::Exact.build().matches("Doe", "Jane Doe"));
    }
}
