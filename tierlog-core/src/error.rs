//! Error types for the tierlog core library.
//!
//! A failure is never the same thing as "no confident answer": only a rule
//! miss or an `Unclassified` prediction lets the router move to the next
//! tier. Every variant below propagates to the caller untouched.

use thiserror::Error;

/// Top-level error type for all classification operations.
#[derive(Error, Debug)]
pub enum TriageError {
    /// Malformed rule, missing or invalid classifier artifact, bad config
    /// file, or a tier that was requested but never configured.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The embedding provider or the trained classifier failed.
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// The LLM credential is missing or was rejected by the provider.
    #[error("LLM authentication failed: {0}")]
    Authentication(String),

    /// Network failure, timeout, non-2xx status or malformed LLM response.
    #[error("LLM service error: {0}")]
    LlmService(String),
}

impl TriageError {
    /// Whether this error is fatal at startup (as opposed to a per-call
    /// collaborator failure).
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<regex::Error> for TriageError {
    fn from(err: regex::Error) -> Self {
        Self::Config(format!("invalid rule pattern: {err}"))
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, TriageError>;
