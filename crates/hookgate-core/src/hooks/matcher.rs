//! Pattern matching for hooks
//!
//! Decides whether a configured hook entry applies to an event's subject
//! (usually a tool name). Patterns are compiled once, when the entry is built.
//!
//! # Pattern Types
//!
//! - absent or `"*"`: matches everything
//! - plain string (no regex metacharacters): exact, case-sensitive match
//! - anything else: regular expression, matched against the whole subject
//!
//! A pattern can never match an event that has no subject, except the two
//! wildcard forms above.

use regex::Regex;
use tracing::warn;

use crate::error::MatcherError;

/// Check if a pattern contains regex metacharacters
fn contains_regex_metacharacters(pattern: &str) -> bool {
    pattern.chars().any(|c| {
        matches!(
            c,
            '^' | '$' | '.' | '*' | '+' | '?' | '[' | ']' | '(' | ')' | '{' | '}' | '\\' | '|'
        )
    })
}

/// A compiled matcher pattern
#[derive(Debug, Clone)]
pub enum PatternMatcher {
    /// Absent pattern or `*`
    Any,
    /// Literal subject name
    Exact(String),
    /// Anchored regular expression
    Regex { pattern: String, regex: Regex },
    /// Pattern that failed to compile; never matches
    Invalid(MatcherError),
}

impl PatternMatcher {
    /// Compile a pattern. Invalid regex syntax yields [`PatternMatcher::Invalid`].
    pub fn compile(pattern: Option<&str>) -> Self {
        match pattern {
            None | Some("*") => PatternMatcher::Any,
            Some(p) if !contains_regex_metacharacters(p) => PatternMatcher::Exact(p.to_string()),
            Some(p) => match Regex::new(&format!("^(?:{})$", p)) {
                Ok(regex) => PatternMatcher::Regex {
                    pattern: p.to_string(),
                    regex,
                },
                Err(e) => PatternMatcher::Invalid(MatcherError::InvalidPattern {
                    pattern: p.to_string(),
                    message: e.to_string(),
                }),
            },
        }
    }

    /// Check whether this matcher applies to `subject`
    pub fn matches(&self, subject: Option<&str>) -> bool {
        match (self, subject) {
            (PatternMatcher::Any, _) => true,
            (_, None) => false,
            (PatternMatcher::Exact(expected), Some(subject)) => expected == subject,
            (PatternMatcher::Regex { regex, .. }, Some(subject)) => regex.is_match(subject),
            (PatternMatcher::Invalid(_), Some(_)) => false,
        }
    }

    /// Source pattern, `None` for the wildcard
    pub fn pattern(&self) -> Option<&str> {
        match self {
            PatternMatcher::Any => None,
            PatternMatcher::Exact(p) => Some(p),
            PatternMatcher::Regex { pattern, .. } => Some(pattern),
            PatternMatcher::Invalid(MatcherError::InvalidPattern { pattern, .. }) => Some(pattern),
        }
    }

    /// Compile error, if the pattern was invalid
    pub fn error(&self) -> Option<&MatcherError> {
        match self {
            PatternMatcher::Invalid(err) => Some(err),
            _ => None,
        }
    }

    /// Check if this is a wildcard matcher
    pub fn is_wildcard(&self) -> bool {
        matches!(self, PatternMatcher::Any)
    }
}

impl PartialEq for PatternMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.pattern() == other.pattern()
    }
}

impl Eq for PatternMatcher {}

/// Match a subject against an uncompiled pattern
///
/// Invalid patterns are logged and treated as a non-match.
///
/// ```
/// use hookgate_core::hooks::matcher::matches;
///
/// assert!(matches(None, Some("anything")));
/// assert!(matches(Some("*"), Some("Write")));
/// assert!(matches(Some("Write"), Some("Write")));
/// assert!(!matches(Some("Write"), Some("write")));
/// assert!(matches(Some("Write|Edit"), Some("Edit")));
/// assert!(matches(Some("a.c"), Some("abc")));
/// assert!(!matches(Some("a.c"), Some("xabcx")));
/// assert!(!matches(Some("Write"), None));
/// ```
pub fn matches(pattern: Option<&str>, subject: Option<&str>) -> bool {
    let matcher = PatternMatcher::compile(pattern);
    if let Some(err) = matcher.error() {
        warn!("{}; treating as non-match", err);
    }
    matcher.matches(subject)
}
