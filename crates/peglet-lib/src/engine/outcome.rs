//! Expression evaluation outcomes and the user-facing parse error.

use peglet_core::SourceLocation;

/// Outcome of evaluating one expression.
///
/// The success payload differs per pass: the CST pass produces nodes, the
/// value pass produces lists of child semantic values.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// Matched and produced a result.
    Success(T),
    /// Matched without consuming input or producing a result (predicates,
    /// cut).
    PredicateSuccess,
    /// Matched under `~`: the text is known but contributes nothing.
    Ignored { text: String },
    /// Backtrackable failure.
    Failure(Failure),
    /// Failure after a cut fired in the current alternative; never
    /// backtracked past the owning choice.
    CutFailure(Failure),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Outcome::Success(_) | Outcome::PredicateSuccess | Outcome::Ignored { .. }
        )
    }
}

/// Payload of a failed match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Where the match was attempted.
    pub location: SourceLocation,
    /// What would have allowed progress.
    pub expected: Vec<String>,
    /// Custom message (rule `error_message`, action errors).
    pub message: Option<String>,
}

impl Failure {
    pub fn expecting(location: SourceLocation, expected: impl Into<String>) -> Self {
        Self {
            location,
            expected: vec![expected.into()],
            message: None,
        }
    }

    pub fn message(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            location,
            expected: Vec::new(),
            message: Some(message.into()),
        }
    }
}

/// Error-recovery strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Recovery {
    /// Report the raw failure; no furthest-failure refinement.
    None,
    /// Report the furthest failure reached during backtracking.
    #[default]
    Basic,
    /// Collect diagnostics, skip to recovery points, and keep parsing.
    Advanced,
}

/// A failed parse, as surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub location: SourceLocation,
    pub expected: Vec<String>,
    pub message: Option<String>,
}

impl ParseError {
    pub(crate) fn from_failure(failure: Failure) -> Self {
        Self {
            location: failure.location,
            expected: failure.expected,
            message: failure.message,
        }
    }

    /// The expected set as display text.
    pub fn expected_list(&self) -> String {
        self.expected.join(", ")
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "syntax error at {}: ", self.location)?;
        match &self.message {
            Some(message) => write!(f, "{message}"),
            None if self.expected.is_empty() => write!(f, "unexpected input"),
            None => write!(f, "expected {}", self.expected_list()),
        }
    }
}

impl std::error::Error for ParseError {}
