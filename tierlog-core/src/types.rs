//! Core type definitions shared by every tier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Label returned when no tier can commit to a category.
pub const UNCLASSIFIED: &str = "Unclassified";

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// One of the three classification strategies, in router priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Deterministic pattern rules.
    Regex,
    /// Sentence embedding + trained probabilistic classifier.
    Embedding,
    /// Few-shot prompt to a language model.
    Llm,
}

impl Tier {
    /// All tiers in the order the router consults them.
    #[must_use]
    pub fn all() -> &'static [Tier] {
        &[Self::Regex, Self::Embedding, Self::Llm]
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regex => "regex",
            Self::Embedding => "embedding",
            Self::Llm => "llm",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regex" | "rules" => Ok(Self::Regex),
            "embedding" | "ml" | "bert" => Ok(Self::Embedding),
            "llm" => Ok(Self::Llm),
            _ => Err(format!("unknown tier: '{s}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// The router's answer for one log message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    /// Category label, or [`UNCLASSIFIED`].
    pub label: String,
    /// Tier that produced the label.
    pub tier: Tier,
    /// Classifier probability, only set by the embedding tier.
    pub confidence: Option<f32>,
}

impl Classification {
    /// A label produced by `tier` without a confidence score.
    #[must_use]
    pub fn new(label: impl Into<String>, tier: Tier) -> Self {
        Self {
            label: label.into(),
            tier,
            confidence: None,
        }
    }

    /// The `Unclassified` sentinel attributed to `tier`.
    #[must_use]
    pub fn unclassified(tier: Tier) -> Self {
        Self::new(UNCLASSIFIED, tier)
    }

    /// Attach a confidence score.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Whether the label is the `Unclassified` sentinel.
    #[must_use]
    pub fn is_unclassified(&self) -> bool {
        self.label == UNCLASSIFIED
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.confidence {
            Some(p) => write!(f, "[{}] {} (p={p:.2})", self.tier, self.label),
            None => write!(f, "[{}] {}", self.tier, self.label),
        }
    }
}

// ---------------------------------------------------------------------------
// Embedding tier data
// ---------------------------------------------------------------------------

/// A fixed-dimension sentence embedding. Produced per call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector(pub Vec<f32>);

impl EmbeddingVector {
    /// Number of dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector has no dimensions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw values.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Per-class probabilities in the classifier's native class order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassProbabilities(Vec<(String, f32)>);

impl ClassProbabilities {
    /// Wrap ordered (label, probability) pairs.
    #[must_use]
    pub fn new(pairs: Vec<(String, f32)>) -> Self {
        Self(pairs)
    }

    /// Build from parallel label / probability slices.
    #[must_use]
    pub fn from_parts(labels: &[String], probabilities: &[f32]) -> Self {
        Self(
            labels
                .iter()
                .cloned()
                .zip(probabilities.iter().copied())
                .collect(),
        )
    }

    /// Iterate the pairs in class order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(label, p)| (label.as_str(), *p))
    }

    /// Number of candidate labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no candidate labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Probability of a specific label, if present.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<f32> {
        self.iter().find(|(l, _)| *l == label).map(|(_, p)| p)
    }

    /// The most probable label.
    ///
    /// Ties on the maximum resolve to the lexicographically smallest label,
    /// so the answer never depends on the classifier's class order.
    /// Non-finite probabilities are skipped.
    #[must_use]
    pub fn best(&self) -> Option<(&str, f32)> {
        self.iter()
            .filter(|(_, p)| p.is_finite())
            .fold(None, |best, (label, p)| match best {
                Some((best_label, best_p))
                    if p < best_p || (p == best_p && label >= best_label) =>
                {
                    Some((best_label, best_p))
                }
                _ => Some((label, p)),
            })
    }
}

/// Outcome of the embedding tier after thresholding.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// The classifier was confident enough to commit.
    Label {
        /// Winning label.
        label: String,
        /// Its probability (at least the confidence threshold).
        probability: f32,
    },
    /// The best probability fell below the confidence threshold.
    Unclassified {
        /// The discarded best probability (0.0 when no classes were scored).
        best_probability: f32,
    },
}

impl Prediction {
    /// The label, or [`UNCLASSIFIED`].
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Label { label, .. } => label,
            Self::Unclassified { .. } => UNCLASSIFIED,
        }
    }

    /// The winning (or discarded) probability.
    #[must_use]
    pub fn probability(&self) -> f32 {
        match self {
            Self::Label { probability, .. } => *probability,
            Self::Unclassified { best_probability } => *best_probability,
        }
    }

    /// Whether the tier declined to commit.
    #[must_use]
    pub fn is_unclassified(&self) -> bool {
        matches!(self, Self::Unclassified { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
