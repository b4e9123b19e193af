//! # tierlog Core Library
//!
//! Classifies free-text log lines with a three-tier fallback:
//!
//! - **Rules**: ordered regular expressions, first match wins
//! - **Embedding**: sentence embedding scored by a trained classifier,
//!   committed only when the best class reaches probability 0.5
//! - **LLM**: few-shot prompt to a language model (see `tierlog-llm`)
//!
//! The [`Router`] consults the tiers in that order and stops at the first
//! definitive answer. Collaborators (embedding provider, trained model,
//! LLM) are injected, loaded once and shared read-only.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod embedding;
pub mod error;
pub mod metrics;
pub mod model;
pub mod router;
pub mod rules;
pub mod statistical;
pub mod types;

pub use config::TriageConfig;
pub use error::{Result, TriageError};
pub use router::{GenerativeClassifier, Router};
pub use rules::RuleSet;
pub use statistical::{CONFIDENCE_THRESHOLD, EmbeddingClassifier};
pub use types::*;
