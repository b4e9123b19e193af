//! Configuration for the tierlog classifier.
//!
//! Maps directly to `tierlog.toml`. Every field has a default, so an empty
//! file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::embedding::{DEFAULT_DIMENSIONS, DEFAULT_EMBEDDING_MODEL};
use crate::error::{Result, TriageError};
use crate::rules::RuleSpec;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriageConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Rule tier.
    #[serde(default)]
    pub rules: RulesConfig,
    /// Embedding provider for the statistical tier.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Trained classifier artifact.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// LLM tier.
    #[serde(default)]
    pub llm: LlmConfig,
}

impl TriageConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `TriageError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| TriageError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TriageError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Render as TOML.
    ///
    /// # Errors
    /// Returns `TriageError::Config` if serialisation fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TriageError::Config(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error. `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Rule tier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Start from the built-in rules.
    #[serde(default = "default_true")]
    pub use_builtin: bool,
    /// Extra rules, tried after the built-ins in the order listed.
    #[serde(default)]
    pub custom: Vec<RuleSpec>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            use_builtin: true,
            custom: Vec::new(),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider: "fastembed", "hashing", "stub".
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// Sentence-transformer model identifier (fastembed only).
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Vector width for the hashing and stub providers.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

/// Trained classifier artifact configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Whether the embedding tier participates at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Path to the JSON logistic-regression artifact.
    #[serde(default = "default_artifact_path")]
    pub artifact_path: PathBuf,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            artifact_path: default_artifact_path(),
        }
    }
}

/// How the LLM's reply becomes a label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// The whole reply, byte for byte.
    #[default]
    Raw,
    /// The reply with surrounding whitespace removed.
    Trimmed,
}

/// LLM tier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "openai", "ollama", "none".
    #[serde(default = "default_openai")]
    pub provider: String,
    /// Base URL for the LLM API.
    #[serde(default = "default_openai_url")]
    pub base_url: String,
    /// Model identifier.
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Hard timeout for any LLM call in milliseconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,
    /// Optional cap on generated tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Reply post-processing.
    #[serde(default)]
    pub response_mode: ResponseMode,
    /// Optional TOML file overriding the built-in few-shot prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_path: Option<PathBuf>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_openai(),
            base_url: default_openai_url(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            request_timeout_ms: default_timeout(),
            max_tokens: None,
            response_mode: ResponseMode::Raw,
            prompt_path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_embedding_provider() -> String {
    let provider = if cfg!(feature = "onnx") { "fastembed" } else { "hashing" };
    provider.to_string()
}
fn default_embedding_model() -> String { DEFAULT_EMBEDDING_MODEL.to_string() }
fn default_dimensions() -> usize { DEFAULT_DIMENSIONS }
fn default_artifact_path() -> PathBuf { PathBuf::from("models/log_classifier.json") }
fn default_openai() -> String { "openai".to_string() }
fn default_openai_url() -> String { "https://api.openai.com".to_string() }
fn default_llm_model() -> String { "gpt-3.5-turbo".to_string() }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_timeout() -> u64 { 30_000 }

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config = TriageConfig::from_toml("").expect("parse");
        assert!(config.rules.use_builtin);
        assert!(config.classifier.enabled);
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.llm.response_mode, ResponseMode::Raw);
        assert_eq!(config.embedding.model, "all-MiniLM-L6-v2");
        assert_eq!(
            config.classifier.artifact_path,
            PathBuf::from("models/log_classifier.json")
        );
    }

    #[test]
    fn custom_rules_and_llm_overrides_parse() {
        let config = TriageConfig::from_toml(
            r#"
            [rules]
            use_builtin = false
            custom = [
                { pattern = "OOMKilled", label = "Resource Exhaustion" },
                { pattern = "segfault", label = "Critical Error" },
            ]

            [llm]
            provider = "ollama"
            base_url = "http://localhost:11434"
            model = "qwen2.5:1.5b"
            response_mode = "trimmed"
            "#,
        )
        .expect("parse");
        assert!(!config.rules.use_builtin);
        assert_eq!(config.rules.custom.len(), 2);
        assert_eq!(config.rules.custom[0].label, "Resource Exhaustion");
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.response_mode, ResponseMode::Trimmed);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = TriageConfig::from_toml("[llm\nmodel = 3").expect_err("should fail");
        assert!(err.is_config());
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let rendered = TriageConfig::default().to_toml().expect("render");
        let parsed = TriageConfig::from_toml(&rendered).expect("parse");
        assert_eq!(parsed.llm.base_url, "https://api.openai.com");
        assert_eq!(parsed.embedding.dimensions, DEFAULT_DIMENSIONS);
    }

    #[test]
    fn shipped_example_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../tierlog.example.toml");
        let config = TriageConfig::from_file(&path).expect("parse example");
        assert_eq!(config.embedding.provider, "hashing");
        assert_eq!(config.rules.custom.len(), 1);
        assert_eq!(config.llm.response_mode, ResponseMode::Raw);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = TriageConfig::from_file(Path::new("/nonexistent/tierlog.toml"))
            .expect_err("should fail");
        assert!(err.is_config());
    }
}
