//! LLM error types.

use thiserror::Error;
use tierlog_core::TriageError;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key was found; raised before any request is sent.
    #[error("LLM API key missing: {0}")]
    MissingCredential(String),

    /// The provider rejected the credential (HTTP 401/403).
    #[error("LLM provider rejected the credential: HTTP {status}")]
    Unauthorized {
        /// Status returned by the provider.
        status: u16,
    },

    /// HTTP request failed before a response arrived.
    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    /// Provider answered with a non-success status.
    #[error("LLM provider returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// LLM response did not have the expected shape.
    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    /// Request timed out.
    #[error("LLM request timed out after {0}ms")]
    Timeout(u64),

    /// LLM provider is unavailable.
    #[error("LLM provider unavailable: {0}")]
    Unavailable(String),

    /// Configuration error.
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            LlmError::Unavailable(err.to_string())
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}

impl From<LlmError> for TriageError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingCredential(_) | LlmError::Unauthorized { .. } => {
                TriageError::Authentication(err.to_string())
            }
            LlmError::ConfigError(msg) => TriageError::Config(msg),
            other => TriageError::LlmService(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_errors_map_to_authentication() {
        let err: TriageError = LlmError::MissingCredential("OPENAI_API_KEY is not set".into()).into();
        assert!(matches!(err, TriageError::Authentication(_)));
        let err: TriageError = LlmError::Unauthorized { status: 401 }.into();
        assert!(matches!(err, TriageError::Authentication(_)));
    }

    #[test]
    fn transport_errors_map_to_service() {
        let err: TriageError = LlmError::Timeout(5000).into();
        assert!(matches!(err, TriageError::LlmService(_)));
        let err: TriageError = LlmError::Status {
            status: 503,
            body: "overloaded".into(),
        }
        .into();
        assert!(matches!(err, TriageError::LlmService(_)));
    }
}
