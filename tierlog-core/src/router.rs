//! The classification router.
//!
//! ```text
//! message ──▶ RuleSet ──match──────────────────────────────▶ [regex]
//!                │ no match
//!                ▼
//!          EmbeddingClassifier ──p_max >= 0.5──────────────▶ [embedding]
//!                │ Unclassified
//!                ▼
//!          GenerativeClassifier ──reply──────────────────────▶ [llm]
//! ```
//!
//! Only a rule miss or an `Unclassified` prediction moves a message down
//! the chain. Collaborator errors are returned as-is.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, TriageError};
use crate::metrics::RouterCounters;
use crate::rules::RuleSet;
use crate::statistical::EmbeddingClassifier;
use crate::types::{Classification, Prediction, Tier};

/// Last-resort classifier backed by a text-generation service.
#[async_trait]
pub trait GenerativeClassifier: Send + Sync {
    /// Label for `message`, exactly as the service produced it.
    ///
    /// # Errors
    ///
    /// [`TriageError::Authentication`] for a missing or rejected credential,
    /// [`TriageError::LlmService`] for anything that goes wrong on the wire.
    async fn classify(&self, message: &str) -> Result<String>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// Tiered classifier. Collaborators are injected at construction and never
/// mutated afterwards.
pub struct Router {
    rules: RuleSet,
    embedding: Option<EmbeddingClassifier>,
    llm: Option<Arc<dyn GenerativeClassifier>>,
    counters: RouterCounters,
}

impl Router {
    /// A router with only the rule tier.
    #[must_use]
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            embedding: None,
            llm: None,
            counters: RouterCounters::new(),
        }
    }

    /// Add the embedding tier.
    #[must_use]
    pub fn with_embedding_classifier(mut self, classifier: EmbeddingClassifier) -> Self {
        self.embedding = Some(classifier);
        self
    }

    /// Add the LLM tier.
    #[must_use]
    pub fn with_llm(mut self, llm: Arc<dyn GenerativeClassifier>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Whether `tier` is wired in.
    #[must_use]
    pub fn has_tier(&self, tier: Tier) -> bool {
        match tier {
            Tier::Regex => true,
            Tier::Embedding => self.embedding.is_some(),
            Tier::Llm => self.llm.is_some(),
        }
    }

    /// Outcome counters.
    #[must_use]
    pub fn counters(&self) -> &RouterCounters {
        &self.counters
    }

    /// Run the full chain and return the first definitive answer.
    ///
    /// Unconfigured tiers are skipped. When every tier declines, the
    /// result is `Unclassified`, attributed to the last tier consulted.
    ///
    /// # Errors
    ///
    /// Propagates embedding and LLM tier errors without trying later tiers.
    pub async fn classify(&self, message: &str) -> Result<Classification> {
        self.counters.record_message();
        let result = self.chain(message).await;
        self.record(&result);
        result
    }

    /// Run a single tier on its own.
    ///
    /// A rule miss is reported as `Unclassified` from the regex tier.
    ///
    /// # Errors
    ///
    /// [`TriageError::Config`] if `tier` is not configured; otherwise the
    /// tier's own errors.
    pub async fn classify_with(&self, tier: Tier, message: &str) -> Result<Classification> {
        self.counters.record_message();
        let result = self.single(tier, message).await;
        self.record(&result);
        result
    }

    /// Classify messages one after another, keeping per-message outcomes.
    pub async fn classify_all<'a, I>(&self, messages: I) -> Vec<Result<Classification>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut results = Vec::new();
        for message in messages {
            results.push(self.classify(message).await);
        }
        results
    }

    async fn chain(&self, message: &str) -> Result<Classification> {
        if let Some(label) = self.rules.match_label(message) {
            return Ok(Classification::new(label, Tier::Regex));
        }
        debug!("no rule matched");

        let mut fallback = Classification::unclassified(Tier::Regex);

        if let Some(embedding) = &self.embedding {
            match embedding.predict(message)? {
                Prediction::Label { label, probability } => {
                    return Ok(Classification::new(label, Tier::Embedding).with_confidence(probability));
                }
                Prediction::Unclassified { best_probability } => {
                    debug!(best_probability, "embedding tier below threshold");
                    fallback =
                        Classification::unclassified(Tier::Embedding).with_confidence(best_probability);
                }
            }
        }

        if let Some(llm) = &self.llm {
            debug!(model = llm.model_name(), "falling back to LLM tier");
            let label = llm.classify(message).await?;
            return Ok(Classification::new(label, Tier::Llm));
        }

        Ok(fallback)
    }

    async fn single(&self, tier: Tier, message: &str) -> Result<Classification> {
        match tier {
            Tier::Regex => Ok(match self.rules.match_label(message) {
                Some(label) => Classification::new(label, Tier::Regex),
                None => Classification::unclassified(Tier::Regex),
            }),
            Tier::Embedding => {
                let embedding = self.embedding.as_ref().ok_or_else(|| not_configured(tier))?;
                let prediction = embedding.predict(message)?;
                Ok(Classification::new(prediction.label(), Tier::Embedding)
                    .with_confidence(prediction.probability()))
            }
            Tier::Llm => {
                let llm = self.llm.as_ref().ok_or_else(|| not_configured(tier))?;
                let label = llm.classify(message).await?;
                Ok(Classification::new(label, Tier::Llm))
            }
        }
    }

    fn record(&self, result: &Result<Classification>) {
        match result {
            Ok(c) if c.is_unclassified() => self.counters.record_unclassified(),
            Ok(c) => self.counters.record_hit(c.tier),
            Err(err) => {
                debug!(error = %err, "classification failed");
                self.counters.record_failure();
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("rules", &self.rules.len())
            .field("embedding", &self.embedding.as_ref().map(EmbeddingClassifier::embedding_model))
            .field("llm", &self.llm.as_ref().map(|llm| llm.model_name()))
            .finish_non_exhaustive()
    }
}

fn not_configured(tier: Tier) -> TriageError {
    TriageError::Config(format!("the {tier} tier is not configured"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
