//! In-memory store handle using exhaustive cosine similarity.
//!
//! [`InMemoryVectorStore`] holds a loaded embedding matrix, a row-normalized
//! copy computed once at construction, and the parallel chunk list. A query
//! reduces to one matrix-vector product over every row, O(n · dim), which
//! suits the small corpora this crate is built for.

use async_trait::async_trait;
use ndarray::{Array1, Array2};
use tracing::{debug, warn};

use crate::document::{Chunk, SearchHit};
use crate::embedding::{Embedder, coerce_dimensions};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Guards the query normalization against zero vectors.
const QUERY_NORM_EPSILON: f32 = 1e-12;

/// A read-only, loaded vector store.
///
/// Row `i` of the matrix belongs to chunk `i`. All operations take `&self`,
/// so one instance can be shared behind an `Arc` for the process lifetime.
#[derive(Debug)]
pub struct InMemoryVectorStore {
    embeddings: Array2<f32>,
    normed: Array2<f32>,
    chunks: Vec<Chunk>,
    embedder: Embedder,
}

impl InMemoryVectorStore {
    /// Build a handle over `embeddings` (one row per chunk).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ShapeMismatch`] if the row count differs from the
    /// number of chunks.
    pub fn new(embeddings: Array2<f32>, chunks: Vec<Chunk>, embedder: Embedder) -> Result<Self> {
        if embeddings.nrows() != chunks.len() {
            return Err(RagError::ShapeMismatch {
                rows: embeddings.nrows(),
                chunks: chunks.len(),
            });
        }
        if embeddings.ncols() != embedder.dimensions() {
            warn!(
                stored = embeddings.ncols(),
                embedder = embedder.dimensions(),
                "stored width differs from embedder width; queries will be coerced"
            );
        }

        let normed = normalize_rows(&embeddings);
        Ok(Self { embeddings, normed, chunks, embedder })
    }

    /// The raw embedding matrix as loaded.
    pub fn embeddings(&self) -> &Array2<f32> {
        &self.embeddings
    }

    /// The stored chunks, in row order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Width of the stored vectors.
    pub fn dimensions(&self) -> usize {
        self.embeddings.ncols()
    }

    /// Rank stored rows against an already-embedded query vector.
    ///
    /// A query of a different width is truncated or zero-padded to the stored
    /// width first.
    pub fn search_vector(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        if k == 0 || self.chunks.is_empty() {
            return Vec::new();
        }

        let query = coerce_dimensions(query.to_vec(), self.dimensions());
        let norm = query.iter().map(|x| x * x).sum::<f32>().sqrt();
        let query = Array1::from(query) / (norm + QUERY_NORM_EPSILON);
        // Clamp before ranking so scores that compare equal also sort equal.
        // Adding zero folds -0.0 into 0.0 for `total_cmp`.
        let sims = self.normed.dot(&query).mapv(|s| s.clamp(-1.0, 1.0) + 0.0);

        let mut order: Vec<usize> = (0..sims.len()).collect();
        order.sort_by(|&a, &b| sims[b].total_cmp(&sims[a]).then(a.cmp(&b)));
        order.truncate(k);

        order
            .into_iter()
            .map(|i| SearchHit {
                score: sims[i],
                text: self.chunks[i].text.clone(),
            })
            .collect()
    }
}

/// Divide each row by its L2 norm; all-zero rows are left as zeros.
fn normalize_rows(embeddings: &Array2<f32>) -> Array2<f32> {
    let mut normed = embeddings.clone();
    for mut row in normed.rows_mut() {
        let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm = if norm == 0.0 { 1.0 } else { norm };
        row.mapv_inplace(|x| x / norm);
    }
    normed
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_query(query).await?;
        let hits = self.search_vector(&query_embedding, k);
        debug!(k, hit_count = hits.len(), top_score = hits.first().map(|h| h.score), "searched");
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ndarray::array;

    use super::*;
    use crate::hashing::HashingEmbeddingProvider;

    fn store(embeddings: Array2<f32>, texts: &[&str]) -> InMemoryVectorStore {
        let dims = embeddings.ncols();
        let embedder = Embedder::new(Arc::new(HashingEmbeddingProvider::new(dims)), dims);
        let chunks = texts.iter().map(|t| Chunk::new(*t)).collect();
        InMemoryVectorStore::new(embeddings, chunks, embedder).unwrap()
    }

    #[test]
    fn zero_rows_normalize_without_nan() {
        let s = store(array![[0.0, 0.0], [3.0, 4.0]], &["zero", "row"]);
        assert_eq!(s.normed.row(0).to_vec(), vec![0.0, 0.0]);
        assert_eq!(s.normed.row(1).to_vec(), vec![0.6, 0.8]);
    }

    #[test]
    fn ranks_by_cosine_and_keeps_ties_in_order() {
        let s = store(
            array![[1.0, 0.0], [0.0, 1.0], [2.0, 0.0], [-1.0, 0.0]],
            &["a", "b", "c", "d"],
        );
        let hits = s.search_vector(&[1.0, 0.0], 4);
        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "c", "b", "d"]);
        assert_eq!(hits[0].score, 1.0);
        assert_eq!(hits[3].score, -1.0);
    }

    #[test]
    fn parallel_rows_of_different_magnitude_tie_in_storage_order() {
        let s = store(array![[1.0, 2.0, 1.0, 2.0], [13.0, 26.0, 13.0, 26.0]], &["first", "second"]);
        let hits = s.search_vector(&[1.0, 2.0, 1.0, 2.0], 2);
        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(hits[0].score, hits[1].score);
        assert!(hits.iter().all(|h| h.score <= 1.0));
    }

    #[test]
    fn result_is_bounded_by_k_and_size() {
        let s = store(array![[1.0, 0.0], [0.0, 1.0]], &["a", "b"]);
        assert_eq!(s.search_vector(&[1.0, 1.0], 1).len(), 1);
        assert_eq!(s.search_vector(&[1.0, 1.0], 10).len(), 2);
        assert!(s.search_vector(&[1.0, 1.0], 0).is_empty());
    }

    #[test]
    fn narrow_query_is_padded_to_store_width() {
        let s = store(array![[0.0, 0.0, 1.0], [1.0, 0.0, 0.0]], &["z", "x"]);
        let hits = s.search_vector(&[1.0], 1);
        assert_eq!(hits[0].text, "x");
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let embedder = Embedder::new(Arc::new(HashingEmbeddingProvider::new(2)), 2);
        let err =
            InMemoryVectorStore::new(array![[1.0, 0.0]], vec![], embedder).unwrap_err();
        assert!(matches!(err, RagError::ShapeMismatch { rows: 1, chunks: 0 }));
    }

    #[tokio::test]
    async fn empty_store_returns_nothing() {
        let s = store(Array2::zeros((0, 4)), &[]);
        assert!(s.similarity_search("anything", 3).await.unwrap().is_empty());
        assert!(s.is_empty());
    }
}
