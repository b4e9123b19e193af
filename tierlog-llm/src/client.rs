//! HTTP client for the OpenAI-compatible and Ollama backends.
//!
//! One request, one attempt: failures are reported to the caller, never
//! retried here.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use tierlog_core::config::LlmConfig;
use tracing::{debug, info, warn};

use crate::error::LlmError;
use crate::types::{LlmRequest, LlmResponse};

/// Anything that turns a prompt into free text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `request`.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] describing why no text was produced.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;
}

/// Provider backend for LLM inference.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// OpenAI chat-completions API (or any compatible server).
    OpenAiCompatible {
        /// Base URL without the `/v1/...` suffix.
        base_url: String,
        /// Bearer token; `None` fails every call before it is sent.
        api_key: Option<String>,
    },
    /// Ollama running locally.
    Ollama {
        /// Base URL without the `/api/...` suffix.
        base_url: String,
    },
    /// No LLM available; every call fails.
    None,
}

/// HTTP client for the configured provider.
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
}

impl LlmClient {
    /// Create a new LLM client.
    #[must_use]
    pub fn new(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            http: Client::new(),
            model: model.into(),
        }
    }

    /// Create a client with no LLM backend.
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new())
    }

    /// Build a client from configuration, reading the API key from the
    /// environment variable named by `api_key_env`.
    ///
    /// A missing key is not an error here; it surfaces on the first call.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for an unknown provider.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let provider = match config.provider.as_str() {
            "openai" => {
                let api_key = std::env::var(&config.api_key_env)
                    .ok()
                    .filter(|key| !key.trim().is_empty());
                if api_key.is_none() {
                    warn!(var = %config.api_key_env, "no API key in environment; LLM tier calls will fail");
                }
                LlmProvider::OpenAiCompatible { base_url, api_key }
            }
            "ollama" => LlmProvider::Ollama { base_url },
            "none" => LlmProvider::None,
            other => {
                return Err(LlmError::ConfigError(format!(
                    "unknown LLM provider: '{other}'"
                )));
            }
        };

        info!(provider = %config.provider, model = %config.model, "configured LLM client");
        Ok(Self::new(provider, config.model.clone()))
    }

    /// Check if the LLM client has a backend configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// Generate using the OpenAI chat-completions API.
    async fn generate_openai(
        &self,
        base_url: &str,
        api_key: Option<&str>,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let api_key = api_key.ok_or_else(|| {
            LlmError::MissingCredential("no API key configured for the OpenAI provider".into())
        })?;

        let url = format!("{base_url}/v1/chat/completions");
        let mut messages = Vec::new();
        if !request.system.is_empty() {
            messages.push(json!({ "role": "system", "content": request.system }));
        }
        messages.push(json!({ "role": "user", "content": request.user }));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        debug!(%url, model = %self.model, "sending chat completion");
        let start = Instant::now();
        let resp = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .timeout(Duration::from_millis(request.timeout_ms))
            .send()
            .await
            .map_err(|e| send_error(e, request.timeout_ms))?;

        let json = read_success(resp, request.timeout_ms).await?;
        let latency_ms = elapsed_ms(start);

        let text = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("response has no choices[0].message.content".into()))?
            .to_string();
        let tokens = json["usage"]["completion_tokens"].as_u64().unwrap_or(0);

        Ok(LlmResponse {
            text,
            tokens_generated: u32::try_from(tokens).unwrap_or(u32::MAX),
            latency_ms,
            model: self.model.clone(),
        })
    }

    /// Generate using Ollama's API.
    async fn generate_ollama(
        &self,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let url = format!("{base_url}/api/generate");
        let prompt = if request.system.is_empty() {
            request.user.clone()
        } else {
            format!("{}\n\n{}", request.system, request.user)
        };

        let mut body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
            }
        });
        if let Some(max_tokens) = request.max_tokens {
            body["options"]["num_predict"] = json!(max_tokens);
        }

        debug!(%url, model = %self.model, "sending Ollama generate");
        let start = Instant::now();
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .timeout(Duration::from_millis(request.timeout_ms))
            .send()
            .await
            .map_err(|e| send_error(e, request.timeout_ms))?;

        let json = read_success(resp, request.timeout_ms).await?;
        let latency_ms = elapsed_ms(start);

        let text = json["response"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("response has no 'response' field".into()))?
            .to_string();
        let tokens = json["eval_count"].as_u64().unwrap_or(0);

        Ok(LlmResponse {
            text,
            tokens_generated: u32::try_from(tokens).unwrap_or(u32::MAX),
            latency_ms,
            model: self.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match &self.provider {
            LlmProvider::None => Err(LlmError::Unavailable("No LLM provider configured".into())),
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                self.generate_openai(base_url, api_key.as_deref(), request)
                    .await
            }
            LlmProvider::Ollama { base_url } => self.generate_ollama(base_url, request).await,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Transport failure while sending or reading a response.
fn send_error(err: reqwest::Error, timeout_ms: u64) -> LlmError {
    if err.is_timeout() {
        warn!("LLM request timed out after {timeout_ms}ms");
        LlmError::Timeout(timeout_ms)
    } else {
        warn!("LLM request failed: {err}");
        LlmError::from(err)
    }
}

async fn read_success(resp: Response, timeout_ms: u64) -> Result<Value, LlmError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        warn!(%status, "LLM provider rejected the credential");
        return Err(LlmError::Unauthorized {
            status: status.as_u16(),
        });
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        warn!(%status, "LLM provider returned error");
        return Err(LlmError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let body = resp.text().await.map_err(|e| send_error(e, timeout_ms))?;
    serde_json::from_str(&body).map_err(|e| LlmError::ParseError(e.to_string()))
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn openai(base_url: &str, key: Option<&str>) -> LlmClient {
        LlmClient::new(
            LlmProvider::OpenAiCompatible {
                base_url: base_url.to_string(),
                api_key: key.map(str::to_string),
            },
            "gpt-3.5-turbo",
        )
    }

    fn request() -> LlmRequest {
        LlmRequest::deterministic("Log: Backup failed\nCategory:").with_timeout(2_000)
    }

    #[tokio::test]
    async fn openai_returns_content_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-3.5-turbo",
                "temperature": 0.0,
                "messages": [{ "role": "user", "content": "Log: Backup failed\nCategory:" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Workflow Error \n" } }],
                "usage": { "completion_tokens": 3 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = openai(&server.uri(), Some("sk-test"));
        let response = client.generate(&request()).await.expect("generate");
        assert_eq!(response.text, "Workflow Error \n");
        assert_eq!(response.tokens_generated, 3);
        assert_eq!(response.model, "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = openai(&server.uri(), None);
        let err = client.generate(&request()).await.expect_err("should fail");
        assert!(matches!(err, LlmError::MissingCredential(_)));
    }

    #[tokio::test]
    async fn rejected_key_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Incorrect API key provided" }
            })))
            .mount(&server)
            .await;

        let client = openai(&server.uri(), Some("sk-wrong"));
        let err = client.generate(&request()).await.expect_err("should fail");
        assert!(matches!(err, LlmError::Unauthorized { status: 401 }));
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let client = openai(&server.uri(), Some("sk-test"));
        let err = client.generate(&request()).await.expect_err("should fail");
        match err {
            LlmError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_content_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = openai(&server.uri(), Some("sk-test"));
        let err = client.generate(&request()).await.expect_err("should fail");
        assert!(matches!(err, LlmError::ParseError(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let client = openai(&server.uri(), Some("sk-test"));
        let err = client.generate(&request()).await.expect_err("should fail");
        assert!(matches!(err, LlmError::ParseError(_)));
    }

    #[tokio::test]
    async fn unreachable_provider_is_unavailable() {
        let client = LlmClient::new(
            LlmProvider::Ollama {
                base_url: "http://127.0.0.1:1".into(),
            },
            "qwen2.5:1.5b",
        );
        let err = client
            .generate(&request().with_timeout(2_000))
            .await
            .expect_err("should fail");
        assert!(matches!(
            err,
            LlmError::Unavailable(_) | LlmError::RequestFailed(_) | LlmError::Timeout(2_000)
        ));
    }

    #[tokio::test]
    async fn slow_ollama_times_out_with_configured_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(json!({ "response": "late" })),
            )
            .mount(&server)
            .await;

        let client = LlmClient::new(
            LlmProvider::Ollama {
                base_url: server.uri(),
            },
            "qwen2.5:1.5b",
        );
        let err = client
            .generate(&request().with_timeout(75))
            .await
            .expect_err("should time out");
        assert!(matches!(err, LlmError::Timeout(75)));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(json!({ "choices": [{ "message": { "content": "late" } }] })),
            )
            .mount(&server)
            .await;

        let client = openai(&server.uri(), Some("sk-test"));
        let err = client
            .generate(&request().with_timeout(50))
            .await
            .expect_err("should time out");
        assert!(matches!(err, LlmError::Timeout(50)));
    }

    #[tokio::test]
    async fn ollama_generate_reads_response_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({ "model": "qwen2.5:1.5b", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "Deprecation Warning",
                "eval_count": 4
            })))
            .mount(&server)
            .await;

        let client = LlmClient::new(
            LlmProvider::Ollama {
                base_url: server.uri(),
            },
            "qwen2.5:1.5b",
        );
        let response = client.generate(&request()).await.expect("generate");
        assert_eq!(response.text, "Deprecation Warning");
        assert_eq!(response.tokens_generated, 4);
    }

    #[tokio::test]
    async fn none_provider_is_unavailable() {
        let client = LlmClient::none();
        assert!(!client.is_available());
        let err = client.generate(&request()).await.expect_err("should fail");
        assert!(matches!(err, LlmError::Unavailable(_)));
    }

    #[test]
    fn from_config_rejects_unknown_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".into(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            LlmClient::from_config(&config),
            Err(LlmError::ConfigError(_))
        ));
    }

    #[test]
    fn from_config_without_key_in_env_still_builds() {
        let config = LlmConfig {
            api_key_env: "TIERLOG_TEST_KEY_THAT_IS_NEVER_SET".into(),
            base_url: "https://api.openai.com/".into(),
            ..LlmConfig::default()
        };
        let client = LlmClient::from_config(&config).expect("client");
        assert!(client.is_available());
        match &client.provider {
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                assert_eq!(base_url, "https://api.openai.com");
                assert!(api_key.is_none());
            }
            other => panic!("unexpected provider: {other:?}"),
        }
    }
}
