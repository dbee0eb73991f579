//! Local sentence-embedding provider using the `fastembed` crate.
//!
//! This module is only available when the `fastembed` feature is enabled.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Native width of AllMiniLML6V2.
const MINILM_DIMENSIONS: usize = 384;

/// An [`EmbeddingProvider`] backed by a local AllMiniLML6V2 ONNX model.
///
/// The model is loaded on first use, at most once per provider. Concurrent
/// first calls wait on the same initialization. Inference runs on the
/// blocking thread pool.
///
/// # Example
///
/// ```rust,ignore
/// use busline_rag::local::FastEmbedProvider;
///
/// let provider = FastEmbedProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// ```
#[derive(Default)]
pub struct FastEmbedProvider {
    model: OnceCell<Arc<Mutex<TextEmbedding>>>,
}

impl FastEmbedProvider {
    /// Create a provider. The model is not loaded until the first embedding call.
    pub fn new() -> Self {
        Self::default()
    }

    async fn model(&self) -> Result<Arc<Mutex<TextEmbedding>>> {
        self.model
            .get_or_try_init(|| async {
                let model = tokio::task::spawn_blocking(|| {
                    TextEmbedding::try_new(
                        InitOptions::new(EmbeddingModel::AllMiniLML6V2)
                            .with_show_download_progress(false),
                    )
                })
                .await
                .map_err(|e| embedding_error(format!("model loader panicked: {e}")))?
                .map_err(|e| {
                    error!(provider = "FastEmbed", error = %e, "model load failed");
                    embedding_error(format!("failed to load model: {e}"))
                })?;
                info!(provider = "FastEmbed", model = "AllMiniLML6V2", "embedding model loaded");
                Ok::<_, RagError>(Arc::new(Mutex::new(model)))
            })
            .await
            .cloned()
    }
}

fn embedding_error(message: String) -> RagError {
    RagError::EmbeddingError { provider: "FastEmbed".into(), message }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| embedding_error("model returned no embedding".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model().await?;
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        tokio::task::spawn_blocking(move || {
            let mut model =
                model.lock().map_err(|_| embedding_error("model mutex poisoned".into()))?;
            model.embed(owned, None).map_err(|e| embedding_error(e.to_string()))
        })
        .await
        .map_err(|e| embedding_error(format!("inference task panicked: {e}")))?
    }

    fn dimensions(&self) -> usize {
        MINILM_DIMENSIONS
    }
}
