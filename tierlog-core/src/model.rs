//! Trained probabilistic classifiers over sentence embeddings.
//!
//! The production artifact is a logistic-regression model exported to JSON:
//!
//! ```json
//! {
//!   "classes": ["Critical Error", "Error", "HTTP Status", "Security Alert"],
//!   "coefficients": [[0.12, -0.4, ...], ...],
//!   "intercepts": [0.3, ...],
//!   "embedding_model": "all-MiniLM-L6-v2"
//! }
//! ```
//!
//! Multinomial models carry one coefficient row per class and are scored
//! with softmax. Binary models carry a single row for `classes[1]` and are
//! scored with the logistic sigmoid.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TriageError};
use crate::types::ClassProbabilities;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A trained multi-class classifier exposing per-class probabilities.
///
/// Loaded once at startup and shared read-only.
pub trait ProbabilisticClassifier: Send + Sync {
    /// Candidate labels in the classifier's native order.
    fn classes(&self) -> &[String];

    /// Probability per class for one embedding.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::ClassifierUnavailable`] if the input cannot be
    /// scored (e.g. wrong dimensionality).
    fn predict_proba(&self, features: &[f32]) -> Result<ClassProbabilities>;

    /// Most probable label, with the deterministic tie-break of
    /// [`ClassProbabilities::best`].
    ///
    /// # Errors
    ///
    /// Propagates [`Self::predict_proba`] errors; returns
    /// [`TriageError::ClassifierUnavailable`] if no class could be scored.
    fn predict(&self, features: &[f32]) -> Result<String> {
        let probabilities = self.predict_proba(features)?;
        probabilities
            .best()
            .map(|(label, _)| label.to_string())
            .ok_or_else(|| TriageError::ClassifierUnavailable("no class scored".into()))
    }
}

// ---------------------------------------------------------------------------
// Logistic regression artifact
// ---------------------------------------------------------------------------

/// Logistic-regression classifier loaded from a JSON artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    classes: Vec<String>,
    coefficients: Vec<Vec<f32>>,
    intercepts: Vec<f32>,
    /// Embedding model the artifact was trained against, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding_model: Option<String>,
}

impl LogisticModel {
    /// Build and validate a model from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Config`] if the shapes are inconsistent.
    pub fn new(
        classes: Vec<String>,
        coefficients: Vec<Vec<f32>>,
        intercepts: Vec<f32>,
    ) -> Result<Self> {
        let model = Self {
            classes,
            coefficients,
            intercepts,
            embedding_model: None,
        };
        model.validate()?;
        Ok(model)
    }

    /// Parse and validate a JSON artifact.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Config`] if the JSON is invalid or the shapes
    /// are inconsistent.
    pub fn from_json(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)
            .map_err(|e| TriageError::Config(format!("invalid classifier artifact: {e}")))?;
        model.validate()?;
        Ok(model)
    }

    /// Load the artifact from disk.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Config`] if the file is missing, unreadable or
    /// invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TriageError::Config(format!(
                "cannot read classifier artifact {}: {e}",
                path.display()
            ))
        })?;
        let model = Self::from_json(&content)?;
        info!(
            path = %path.display(),
            classes = model.classes.len(),
            dims = model.dimensions(),
            "loaded classifier artifact"
        );
        Ok(model)
    }

    /// Serialise the artifact to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Config`] if serialisation fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| TriageError::Config(e.to_string()))
    }

    /// Record which embedding model produced the training features.
    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Embedding model recorded in the artifact.
    #[must_use]
    pub fn embedding_model(&self) -> Option<&str> {
        self.embedding_model.as_deref()
    }

    /// Expected input width.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.coefficients.first().map_or(0, Vec::len)
    }

    /// Whether this is a single-row binary model.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.classes.len() == 2 && self.coefficients.len() == 1
    }

    /// Ensure the artifact matches the embedding provider it will be fed by.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Config`] on a width or model-name mismatch.
    pub fn check_compatible(&self, dimensions: usize, model_name: &str) -> Result<()> {
        if self.dimensions() != dimensions {
            return Err(TriageError::Config(format!(
                "classifier expects {}-dimensional embeddings, provider '{model_name}' produces {dimensions}",
                self.dimensions()
            )));
        }
        if let Some(trained_on) = &self.embedding_model {
            if trained_on != model_name {
                return Err(TriageError::Config(format!(
                    "classifier was trained on '{trained_on}' embeddings, provider is '{model_name}'"
                )));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.classes.len() < 2 {
            return Err(TriageError::Config(
                "classifier artifact needs at least two classes".into(),
            ));
        }
        for (i, class) in self.classes.iter().enumerate() {
            if self.classes[..i].contains(class) {
                return Err(TriageError::Config(format!("duplicate class label: '{class}'")));
            }
        }

        let rows = if self.is_binary() { 1 } else { self.classes.len() };
        if self.coefficients.len() != rows {
            return Err(TriageError::Config(format!(
                "expected {rows} coefficient rows for {} classes, found {}",
                self.classes.len(),
                self.coefficients.len()
            )));
        }
        if self.intercepts.len() != rows {
            return Err(TriageError::Config(format!(
                "expected {rows} intercepts, found {}",
                self.intercepts.len()
            )));
        }

        let width = self.dimensions();
        if width == 0 {
            return Err(TriageError::Config("coefficient rows are empty".into()));
        }
        if self.coefficients.iter().any(|row| row.len() != width) {
            return Err(TriageError::Config("coefficient rows differ in width".into()));
        }
        Ok(())
    }

    fn decision(&self, row: usize, features: &[f32]) -> f32 {
        let dot: f32 = self.coefficients[row]
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum();
        dot + self.intercepts[row]
    }
}

impl ProbabilisticClassifier for LogisticModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, features: &[f32]) -> Result<ClassProbabilities> {
        if features.len() != self.dimensions() {
            return Err(TriageError::ClassifierUnavailable(format!(
                "expected {}-dimensional input, got {}",
                self.dimensions(),
                features.len()
            )));
        }

        let probabilities = if self.is_binary() {
            let positive = sigmoid(self.decision(0, features));
            vec![1.0 - positive, positive]
        } else {
            let scores: Vec<f32> = (0..self.classes.len())
                .map(|row| self.decision(row, features))
                .collect();
            softmax(&scores)
        };
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(TriageError::ClassifierUnavailable(
                "classifier produced non-finite scores".into(),
            ));
        }

        Ok(ClassProbabilities::from_parts(&self.classes, &probabilities))
    }
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

// ---------------------------------------------------------------------------
// Fixed-output classifier (for tests & benches)
// ---------------------------------------------------------------------------

/// A classifier that ignores its input and returns fixed probabilities.
pub struct FixedProbabilities {
    classes: Vec<String>,
    probabilities: Vec<f32>,
}

impl FixedProbabilities {
    /// Create from (label, probability) pairs.
    #[must_use]
    pub fn new(pairs: &[(&str, f32)]) -> Self {
        Self {
            classes: pairs.iter().map(|(l, _)| (*l).to_string()).collect(),
            probabilities: pairs.iter().map(|(_, p)| *p).collect(),
        }
    }
}

impl ProbabilisticClassifier for FixedProbabilities {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, _features: &[f32]) -> Result<ClassProbabilities> {
        Ok(ClassProbabilities::from_parts(
            &self.classes,
            &self.probabilities,
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
