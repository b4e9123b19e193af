//! Tier 2: embedding + trained classifier with a fixed confidence cut-off.

use std::sync::Arc;

use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::error::{Result, TriageError};
use crate::model::ProbabilisticClassifier;
use crate::types::Prediction;

/// Best-class probability below which the tier answers `Unclassified`.
///
/// The comparison is strict: a best probability of exactly `0.5` commits.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Embeds a message and scores it with a trained classifier.
#[derive(Clone)]
pub struct EmbeddingClassifier {
    embedder: Arc<dyn EmbeddingProvider>,
    model: Arc<dyn ProbabilisticClassifier>,
}

impl EmbeddingClassifier {
    /// Wire an embedding provider to a classifier.
    #[must_use]
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn ProbabilisticClassifier>,
    ) -> Self {
        Self { embedder, model }
    }

    /// Name of the embedding model in use.
    #[must_use]
    pub fn embedding_model(&self) -> &str {
        self.embedder.model_name()
    }

    /// Score a message and apply the confidence threshold.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::ClassifierUnavailable`] if either collaborator
    /// fails, or if no class carries a finite probability. No other tier is
    /// consulted.
    pub fn predict(&self, message: &str) -> Result<Prediction> {
        let embedding = self.embedder.embed(message).map_err(unavailable)?;
        let probabilities = self
            .model
            .predict_proba(embedding.as_slice())
            .map_err(unavailable)?;

        let prediction = match probabilities.best() {
            Some((label, p)) if p >= CONFIDENCE_THRESHOLD => Prediction::Label {
                label: label.to_string(),
                probability: p,
            },
            Some((_, p)) => Prediction::Unclassified { best_probability: p },
            None => {
                return Err(TriageError::ClassifierUnavailable(
                    "no class scored".into(),
                ))
            }
        };

        debug!(
            label = prediction.label(),
            probability = prediction.probability(),
            "embedding tier scored message"
        );
        Ok(prediction)
    }

    /// The label, or `"Unclassified"` below the threshold.
    ///
    /// # Errors
    ///
    /// See [`Self::predict`].
    pub fn classify(&self, message: &str) -> Result<String> {
        self.predict(message).map(|p| p.label().to_string())
    }
}

/// Any collaborator failure surfaces as `ClassifierUnavailable`.
fn unavailable(err: TriageError) -> TriageError {
    match err {
        TriageError::ClassifierUnavailable(_) => err,
        other => TriageError::ClassifierUnavailable(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
