//! # tierlog-llm: the LLM tier
//!
//! Last-resort classification through a language model:
//!   - **OpenAI-compatible API** (default, `gpt-3.5-turbo`)
//!   - **Ollama** (local)
//!
//! Every call renders the same few-shot prompt, decodes greedily and is
//! attempted exactly once. Failures surface to the caller as
//! [`tierlog_core::TriageError`] so the router never hides them.
//!
//! ```text
//! message ─▶ FewShotPrompt::render ─▶ LlmRequest (temperature 0)
//!         ─▶ TextGenerator::generate ─▶ raw reply ─▶ label
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]

pub mod classifier;
pub mod client;
pub mod error;
pub mod prompt;
pub mod types;

pub use classifier::LlmClassifier;
pub use client::{LlmClient, LlmProvider, TextGenerator};
pub use error::LlmError;
pub use prompt::{FewShotExample, FewShotPrompt};
pub use types::{LlmRequest, LlmResponse};
