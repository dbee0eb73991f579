//! Vector store trait for similarity search over embedded chunks.

use async_trait::async_trait;

use crate::document::SearchHit;
use crate::error::Result;

/// A read-only store answering nearest-neighbour queries by text.
///
/// The generator depends only on this trait, so an index-backed store can
/// replace the exhaustive scan without touching callers.
///
/// # Example
///
/// ```rust,ignore
/// use busline_rag::{FileVectorStore, VectorStore};
///
/// let store = FileVectorStore::new("vectorstore/simple", embedder).load()?;
/// let hits = store.similarity_search("fare to Daulatpur", 4).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Return at most `k` hits ordered by descending cosine similarity.
    ///
    /// Equal scores keep ascending storage order.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;

    /// Number of stored chunks.
    fn len(&self) -> usize;

    /// Whether the store holds no chunks.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
