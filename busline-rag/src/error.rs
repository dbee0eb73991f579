//! Error types for the `busline-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building or loading the retrieval store.
///
/// Answer generation never surfaces these to its caller; see
/// [`RagGenerator::generate_answer`](crate::RagGenerator::generate_answer).
#[derive(Debug, Error)]
pub enum RagError {
    /// A domain source file is missing or malformed.
    #[error("Source error ({}): {message}", path.display())]
    SourceError {
        /// The source file that failed to load.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// The chunk builder produced nothing to embed.
    #[error("No chunks found")]
    EmptyChunks,

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// One or both persisted store files are absent.
    #[error("Vector store missing in {}; run the build step first", dir.display())]
    StoreMissing {
        /// The store directory that was searched.
        dir: PathBuf,
    },

    /// The generator has no store to search.
    #[error("Vector store not ready: {reason}")]
    NotReady {
        /// Why the store could not be loaded.
        reason: String,
    },

    /// The persisted files exist but do not form a consistent pair.
    #[error("Vector store corrupt in {}: {message}", dir.display())]
    StoreCorrupt {
        /// The store directory holding the bad pair.
        dir: PathBuf,
        /// A description of the inconsistency.
        message: String,
    },

    /// An embedding matrix and its chunk list disagree on length.
    #[error("Shape mismatch: {rows} embedding rows for {chunks} chunks")]
    ShapeMismatch {
        /// Rows in the embedding matrix.
        rows: usize,
        /// Entries in the chunk list.
        chunks: usize,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Filesystem failure while reading or replacing store files.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The metadata file could not be encoded or decoded.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The embedding matrix could not be read.
    #[error("Matrix read error: {0}")]
    NpyRead(#[from] ndarray_npy::ReadNpyError),

    /// The embedding matrix could not be written.
    #[error("Matrix write error: {0}")]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),
}

impl RagError {
    /// Whether this error means "the store has not been built yet".
    pub fn is_not_ready(&self) -> bool {
        matches!(self, RagError::StoreMissing { .. } | RagError::NotReady { .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
