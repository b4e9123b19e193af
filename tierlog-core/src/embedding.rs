//! Sentence embedding abstraction layer.
//!
//! Provides a trait-based interface for turning a log line into a
//! fixed-length vector that the trained classifier can score.
//!
//! The production implementation uses ONNX Runtime (via `fastembed-rs`)
//! with the `all-MiniLM-L6-v2` model, behind the `onnx` feature. A
//! feature-hashing provider needs no model download, and a stub provider
//! is available for tests.

use crate::error::{Result, TriageError};
use crate::types::EmbeddingVector;

/// Model identifier the bundled classifier artifacts are trained against.
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

/// Output width of `all-MiniLM-L6-v2`.
pub const DEFAULT_DIMENSIONS: usize = 384;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Generate vector embeddings from text.
///
/// Implementations are constructed once at startup and shared read-only,
/// so they must be `Send + Sync`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string.
    ///
    /// Returns a vector of `dimensions()` floats.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::ClassifierUnavailable`] if the model fails to
    /// produce an embedding.
    fn embed(&self, text: &str) -> Result<EmbeddingVector>;

    /// Embed a batch of texts.
    ///
    /// Default implementation calls `embed` in a loop.  High-throughput
    /// providers should override this with a native batch API.
    ///
    /// # Errors
    ///
    /// Returns an error if any embedding in the batch fails.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// The dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// A human-readable name for the model (e.g. `"all-MiniLM-L6-v2"`).
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Stub / zero-vector provider (for tests)
// ---------------------------------------------------------------------------

/// A stub embedding provider that returns zero-vectors.
pub struct StubEmbeddingProvider {
    dims: usize,
}

impl StubEmbeddingProvider {
    /// Create a new stub provider with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dims: dimensions }
    }
}

impl Default for StubEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl EmbeddingProvider for StubEmbeddingProvider {
    fn embed(&self, _text: &str) -> Result<EmbeddingVector> {
        Ok(EmbeddingVector(vec![0.0; self.dims]))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "stub-zero-vector"
    }
}

// ---------------------------------------------------------------------------
// Feature-hashing provider
// ---------------------------------------------------------------------------

/// Deterministic bag-of-words embedding via the hashing trick.
///
/// Lowercased alphanumeric tokens are hashed (FNV-1a) into `dims` buckets
/// with a hash-derived sign, then L2-normalised. Classifier artifacts must
/// be trained against the same provider and width.
pub struct HashingEmbeddingProvider {
    dims: usize,
}

impl HashingEmbeddingProvider {
    /// Create a new hashing provider.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dims: dimensions.max(1),
        }
    }

    fn fnv1a(token: &str) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl EmbeddingProvider for HashingEmbeddingProvider {
    #[allow(clippy::cast_possible_truncation)]
    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let mut v = vec![0.0_f32; self.dims];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = Self::fnv1a(token);
            let bucket = (hash % self.dims as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }

        let mag: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if mag >= f32::EPSILON {
            for x in &mut v {
                *x /= mag;
            }
        }
        Ok(EmbeddingVector(v))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "hashing-bow"
    }
}

// ---------------------------------------------------------------------------
// ONNX provider (fastembed)
// ---------------------------------------------------------------------------

/// Sentence-transformer embeddings through `fastembed` / ONNX Runtime.
///
/// The model is downloaded on first use and cached by `fastembed`.
#[cfg(feature = "onnx")]
pub struct FastEmbedProvider {
    model: fastembed::TextEmbedding,
    name: String,
    dims: usize,
}

#[cfg(feature = "onnx")]
impl FastEmbedProvider {
    /// Load a supported sentence-transformer model.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Config`] for an unknown model identifier and
    /// [`TriageError::ClassifierUnavailable`] if the model cannot be loaded.
    pub fn new(model_name: &str) -> Result<Self> {
        use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

        let (model, dims) = match model_name {
            "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
                (EmbeddingModel::AllMiniLML6V2, 384)
            }
            "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
            other => {
                return Err(TriageError::Config(format!(
                    "unsupported embedding model: '{other}'"
                )));
            }
        };

        let model = TextEmbedding::try_new(InitOptions::new(model)).map_err(|e| {
            TriageError::ClassifierUnavailable(format!("failed to load {model_name}: {e}"))
        })?;

        tracing::info!(model = model_name, dims, "loaded embedding model");
        Ok(Self {
            model,
            name: model_name.to_string(),
            dims,
        })
    }
}

#[cfg(feature = "onnx")]
impl EmbeddingProvider for FastEmbedProvider {
    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| TriageError::ClassifierUnavailable("model returned no embedding".into()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingVector>> {
        let embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| TriageError::ClassifierUnavailable(format!("embedding failed: {e}")))?;
        Ok(embeddings.into_iter().map(EmbeddingVector).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

/// Build the provider named in configuration.
///
/// # Errors
///
/// Returns [`TriageError::Config`] for an unknown provider, or for
/// `"fastembed"` when the crate was built without the `onnx` feature.
pub fn provider_from_config(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "stub" => Ok(Box::new(StubEmbeddingProvider::new(config.dimensions))),
        "hashing" => Ok(Box::new(HashingEmbeddingProvider::new(config.dimensions))),
        #[cfg(feature = "onnx")]
        "fastembed" => Ok(Box::new(FastEmbedProvider::new(&config.model)?)),
        #[cfg(not(feature = "onnx"))]
        "fastembed" => Err(TriageError::Config(
            "embedding provider 'fastembed' requires the `onnx` feature".to_string(),
        )),
        other => Err(TriageError::Config(format!(
            "unknown embedding provider: '{other}'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
