//! # busline-rag
//!
//! Local retrieval engine behind the Busline travel assistant.
//!
//! ## Overview
//!
//! - [`sources`] turns district fares, provider coverage, and privacy policies
//!   into self-contained sentences ([`Chunk`]s).
//! - [`Embedder`] wraps an [`EmbeddingProvider`] and fixes the output width.
//! - [`FileVectorStore`] persists embeddings (`.npy`) and metadata (JSON) and
//!   loads them into an [`InMemoryVectorStore`] for exhaustive cosine search.
//! - [`RagGenerator`] retrieves context, picks a grounded or open prompt, and
//!   calls a [`GenerationBackend`] with exponential backoff.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use busline_rag::{
//!     Embedder, FileVectorStore, HashingEmbeddingProvider, RagConfig, RagGenerator,
//!     gemini::GeminiBackend, prepare_chunks,
//! };
//!
//! let config = RagConfig::default();
//! let embedder = Embedder::new(Arc::new(HashingEmbeddingProvider::new(384)), config.dimensions);
//! let store = FileVectorStore::new("vectorstore/simple", embedder);
//! store.create(&prepare_chunks("data")?).await?;
//!
//! let generator = RagGenerator::builder()
//!     .config(config)
//!     .load_result(store.load())
//!     .backend(Arc::new(GeminiBackend::from_env()))
//!     .build()?;
//! println!("{}", generator.generate_answer("Which companies go to Sylhet?").await);
//! ```
//!
//! ## Features
//!
//! - `gemini` (default): [`gemini::GeminiBackend`] over `reqwest`
//! - `fastembed`: [`local::FastEmbedProvider`], a local AllMiniLML6V2 model

pub mod backend;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filestore;
pub mod generator;
pub mod hashing;
pub mod inmemory;
pub mod sources;
pub mod vectorstore;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "fastembed")]
pub mod local;

pub use backend::{Completion, GenerationBackend, UnconfiguredBackend};
pub use config::{DEFAULT_DIMENSIONS, RagConfig, RagConfigBuilder};
pub use document::{Chunk, SearchHit};
pub use embedding::{Embedder, EmbeddingProvider, coerce_dimensions};
pub use error::{RagError, Result};
pub use filestore::{EMBEDDINGS_FILE, FileVectorStore, METADATA_FILE};
pub use generator::{
    FAILURE_MESSAGE, NOT_CONFIGURED_MESSAGE, NOT_READY_MESSAGE, PromptPlan, RagGenerator,
    RagGeneratorBuilder, clean_output,
};
pub use hashing::HashingEmbeddingProvider;
pub use inmemory::InMemoryVectorStore;
pub use sources::{ChunkSource, TravelDataset, prepare_chunks};
pub use vectorstore::VectorStore;
