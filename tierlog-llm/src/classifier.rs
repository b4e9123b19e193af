//! LLM tier: few-shot prompt in, label out.

use std::sync::Arc;

use async_trait::async_trait;
use tierlog_core::config::{LlmConfig, ResponseMode};
use tierlog_core::{GenerativeClassifier, TriageError};
use tracing::{debug, warn};

use crate::client::{LlmClient, TextGenerator};
use crate::error::LlmError;
use crate::prompt::FewShotPrompt;
use crate::types::LlmRequest;

/// Classifies a log message by asking a language model.
///
/// Decoding is always greedy (temperature 0). The reply is passed back
/// as-is unless [`ResponseMode::Trimmed`] is selected; it is not checked
/// against the category list.
#[derive(Clone)]
pub struct LlmClassifier {
    generator: Arc<dyn TextGenerator>,
    prompt: FewShotPrompt,
    response_mode: ResponseMode,
    timeout_ms: u64,
    max_tokens: Option<u32>,
}

impl LlmClassifier {
    /// Wrap a generator with the built-in prompt and raw replies.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            prompt: FewShotPrompt::builtin(),
            response_mode: ResponseMode::Raw,
            timeout_ms: 30_000,
            max_tokens: None,
        }
    }

    /// Build the HTTP client and prompt described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for an unknown provider or an
    /// unreadable prompt file.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = LlmClient::from_config(config)?;
        let prompt = match &config.prompt_path {
            Some(path) => FewShotPrompt::from_file(path)?,
            None => FewShotPrompt::builtin(),
        };
        Ok(Self::new(Arc::new(client))
            .with_prompt(prompt)
            .with_response_mode(config.response_mode)
            .with_timeout(config.request_timeout_ms)
            .with_max_tokens(config.max_tokens))
    }

    /// Replace the prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: FewShotPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    /// Choose how replies are post-processed.
    #[must_use]
    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = mode;
        self
    }

    /// Per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Cap generated tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The prompt in use.
    #[must_use]
    pub fn prompt(&self) -> &FewShotPrompt {
        &self.prompt
    }

    /// The request sent for `message`.
    #[must_use]
    pub fn request_for(&self, message: &str) -> LlmRequest {
        LlmRequest::deterministic(self.prompt.render(message))
            .with_max_tokens(self.max_tokens)
            .with_timeout(self.timeout_ms)
    }

    /// Classify `message`.
    ///
    /// # Errors
    ///
    /// Any [`LlmError`] from the generator.
    pub async fn classify_message(&self, message: &str) -> Result<String, LlmError> {
        let request = self.request_for(message);
        let response = self
            .generator
            .generate(&request)
            .await
            .inspect_err(|e| warn!(model = self.generator.model(), "LLM classification failed: {e}"))?;
        debug!(
            model = %response.model,
            latency_ms = response.latency_ms,
            tokens = response.tokens_generated,
            "LLM replied"
        );

        Ok(match self.response_mode {
            ResponseMode::Raw => response.text,
            ResponseMode::Trimmed => response.text.trim().to_string(),
        })
    }
}

#[async_trait]
impl GenerativeClassifier for LlmClassifier {
    async fn classify(&self, message: &str) -> tierlog_core::Result<String> {
        self.classify_message(message)
            .await
            .map_err(TriageError::from)
    }

    fn model_name(&self) -> &str {
        self.generator.model()
    }
}
