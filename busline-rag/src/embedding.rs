//! Embedding providers and the fixed-width [`Embedder`] used by the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ndarray::Array2;
use tracing::debug;

use crate::error::{RagError, Result};

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends (a local ONNX model, a
/// hashing embedder for tests) behind a unified async interface. The default
/// [`embed_batch`](EmbeddingProvider::embed_batch) implementation calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends that support
/// native batching should override it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the native dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}

/// Truncate or zero-pad `vector` on the right so it has exactly `dimensions` entries.
///
/// This is a compatibility shim, not a projection: truncated components are lost.
pub fn coerce_dimensions(mut vector: Vec<f32>, dimensions: usize) -> Vec<f32> {
    vector.resize(dimensions, 0.0);
    vector
}

/// Fixed-width embedding pipeline shared by the build step and query time.
///
/// Every vector leaving the embedder has exactly [`dimensions`](Embedder::dimensions)
/// components, whatever the provider's native width. Stored rows and query
/// vectors therefore go through identical coercion.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    dimensions: usize,
    width_logged: Arc<AtomicBool>,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("dimensions", &self.dimensions)
            .field("native_dimensions", &self.provider.dimensions())
            .finish()
    }
}

impl Embedder {
    /// Wrap a provider, coercing its output to `dimensions`.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimensions: usize) -> Self {
        Self { provider, dimensions, width_logged: Arc::new(AtomicBool::new(false)) }
    }

    /// The fixed output width.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed a batch of texts into an `n × dimensions` matrix, one row per text.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the provider fails or returns a
    /// different number of vectors than texts.
    pub async fn embed(&self, texts: &[&str]) -> Result<Array2<f32>> {
        if texts.is_empty() {
            return Ok(Array2::zeros((0, self.dimensions)));
        }

        let vectors = self.provider.embed_batch(texts).await?;
        if vectors.len() != texts.len() {
            return Err(RagError::EmbeddingError {
                provider: "Embedder".into(),
                message: format!("expected {} embeddings, got {}", texts.len(), vectors.len()),
            });
        }

        let mut flat = Vec::with_capacity(texts.len() * self.dimensions);
        for vector in vectors {
            flat.extend(self.coerce(vector));
        }

        Array2::from_shape_vec((texts.len(), self.dimensions), flat).map_err(|e| {
            RagError::EmbeddingError { provider: "Embedder".into(), message: e.to_string() }
        })
    }

    /// Embed a single query text into a vector of exactly `dimensions` entries.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.provider.embed(text).await?;
        Ok(self.coerce(vector))
    }

    fn coerce(&self, vector: Vec<f32>) -> Vec<f32> {
        if vector.len() != self.dimensions && !self.width_logged.swap(true, Ordering::Relaxed) {
            debug!(
                native = vector.len(),
                target = self.dimensions,
                "coercing embedding width"
            );
        }
        coerce_dimensions(vector, self.dimensions)
    }
}
