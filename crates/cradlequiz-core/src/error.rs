//! Engine error types.
//!
//! Every fallible engine operation returns a [`QuizError`]. Load-time
//! failures ([`QuizError::Validation`]) are fatal and keep the engine from
//! starting; everything else is a per-request failure the caller can act on.

use std::fmt;

use thiserror::Error;

/// Errors returned by the quiz engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuizError {
    /// The corpus violates a load-time invariant.
    #[error("corpus failed validation with {} issue(s): {}", .0.len(), join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    /// The caller asked for something the corpus cannot express
    /// (unknown category, malformed difficulty mix, zero count).
    #[error("invalid quiz configuration: {0}")]
    Configuration(String),

    /// The candidate pool is smaller than the requested count.
    #[error("not enough questions: requested {requested}, only {available} available")]
    InsufficientQuestions { requested: usize, available: usize },

    /// The session is in a state that forbids the operation.
    #[error("invalid session state: {0}")]
    InvalidState(String),

    /// Unknown session id or question id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Another caller is mutating the same session, or the caller's
    /// version is stale.
    #[error("conflicting update: {0}")]
    Conflict(String),
}

impl QuizError {
    /// Returns `true` for per-request errors the caller can recover from.
    ///
    /// Only corpus validation failures are fatal.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, QuizError::Validation(_))
    }
}

/// A single corpus invariant violation found while building a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// The offending question id, if the issue is question-scoped.
    pub question_id: Option<String>,
    /// What is wrong.
    pub message: String,
}

impl ValidationIssue {
    pub fn corpus(message: impl Into<String>) -> Self {
        Self {
            question_id: None,
            message: message.into(),
        }
    }

    pub fn question(id: &str, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(id.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.question_id {
            Some(id) => write!(f, "[{id}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias used throughout the engine.
pub type QuizResult<T> = Result<T, QuizError>;
