//! Core types for LLM requests and responses.

use serde::{Deserialize, Serialize};

/// A request to the LLM.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    /// Optional system prompt; omitted from the wire when empty.
    pub system: String,
    /// User prompt.
    pub user: String,
    /// Optional cap on generated tokens.
    pub max_tokens: Option<u32>,
    /// Temperature (0.0 = deterministic).
    pub temperature: f32,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl LlmRequest {
    /// A single user-message request with greedy decoding.
    #[must_use]
    pub fn deterministic(user: impl Into<String>) -> Self {
        Self {
            system: String::new(),
            user: user.into(),
            max_tokens: None,
            temperature: 0.0,
            timeout_ms: 30_000,
        }
    }

    /// Set a system prompt.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Cap the number of generated tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// A response from the LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    /// The generated text, untouched.
    pub text: String,
    /// How many tokens were generated, when the provider reports it.
    pub tokens_generated: u32,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Which model was used.
    pub model: String,
}
