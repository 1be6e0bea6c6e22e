//! Check predicates.

use regex_lite::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Error building a predicate.
#[derive(Debug, thiserror::Error)]
pub enum PredicateError {
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("check '{0}' must set exactly one of 'contains' or 'pattern'")]
    Ambiguous(String),

    #[error("check name must not be empty")]
    EmptyName,
}

/// A compiled regular expression.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    /// Compile `source`. With `dotall` set, `.` also matches `\n`, so a
    /// wildcard can span line boundaries.
    pub fn new(source: &str, dotall: bool) -> Result<Self, PredicateError> {
        let regex = RegexBuilder::new(source)
            .dot_matches_new_line(dotall)
            .build()
            .map_err(|e| PredicateError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { regex })
    }
}

/// What a check looks for in an artifact's content.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Literal substring containment.
    Contains(String),
    /// Regular expression match anywhere in the content.
    Pattern(Pattern),
}

impl Predicate {
    pub fn contains(literal: impl Into<String>) -> Self {
        Predicate::Contains(literal.into())
    }

    pub fn pattern(source: &str, dotall: bool) -> Result<Self, PredicateError> {
        Pattern::new(source, dotall).map(Predicate::Pattern)
    }

    /// Evaluate against the full artifact content.
    pub fn evaluate(&self, content: &str) -> bool {
        match self {
            Predicate::Contains(literal) => content.contains(literal.as_str()),
            Predicate::Pattern(pattern) => pattern.regex.is_match(content),
        }
    }
}

/// Declarative form of a check, as written in configuration files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckDef {
    /// Name shown in reports
    pub name: String,

    /// Literal substring that must occur in the artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,

    /// Regular expression that must match somewhere in the artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Let `.` in `pattern` match newlines
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dotall: bool,
}

impl CheckDef {
    /// Compile into a runnable [`Check`].
    pub fn compile(&self) -> Result<Check, PredicateError> {
        if self.name.trim().is_empty() {
            return Err(PredicateError::EmptyName);
        }

        let predicate = match (&self.contains, &self.pattern) {
            (Some(literal), None) => Predicate::contains(literal.clone()),
            (None, Some(source)) => Predicate::pattern(source, self.dotall)?,
            _ => return Err(PredicateError::Ambiguous(self.name.clone())),
        };

        Ok(Check {
            name: self.name.clone(),
            predicate,
        })
    }
}

/// A named predicate belonging to one artifact.
#[derive(Debug, Clone)]
pub struct Check {
    pub name: String,
    pub predicate: Predicate,
}

impl Check {
    pub fn new(name: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }

    pub fn contains(name: impl Into<String>, literal: impl Into<String>) -> Self {
        Self::new(name, Predicate::contains(literal))
    }
}
