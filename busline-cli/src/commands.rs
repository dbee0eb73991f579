//! Command handlers.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use busline_rag::{
    Embedder, EmbeddingProvider, FileVectorStore, GenerationBackend, HashingEmbeddingProvider,
    RagConfig, RagGenerator, VectorStore, prepare_chunks,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;

use crate::cli::{EmbedderKind, StoreArgs};

fn embedder(kind: EmbedderKind, config: &RagConfig) -> Result<Embedder> {
    let provider: Arc<dyn EmbeddingProvider> = match kind {
        EmbedderKind::Hashing => Arc::new(HashingEmbeddingProvider::new(config.dimensions)),
        #[cfg(feature = "fastembed")]
        EmbedderKind::Local => Arc::new(busline_rag::local::FastEmbedProvider::new()),
        #[cfg(not(feature = "fastembed"))]
        EmbedderKind::Local => {
            anyhow::bail!("the local embedder needs a build with the `fastembed` feature")
        }
    };
    Ok(Embedder::new(provider, config.dimensions))
}

#[cfg(feature = "gemini")]
fn backend() -> Arc<dyn GenerationBackend> {
    let backend = busline_rag::gemini::GeminiBackend::from_env();
    if !backend.is_configured() {
        tracing::warn!("GEMINI_API_KEY is not set; answers will report the model as unconfigured");
    }
    Arc::new(backend)
}

#[cfg(not(feature = "gemini"))]
fn backend() -> Arc<dyn GenerationBackend> {
    Arc::new(busline_rag::UnconfiguredBackend)
}

fn file_store(args: &StoreArgs, config: &RagConfig) -> Result<FileVectorStore> {
    Ok(FileVectorStore::new(&args.store_dir, embedder(args.embedder, config)?))
}

fn generator(args: &StoreArgs) -> Result<RagGenerator> {
    let config = args.rag_config()?;
    let store = file_store(args, &config)?;
    let generator =
        RagGenerator::builder().config(config).load_result(store.load()).backend(backend()).build()?;
    Ok(generator)
}

/// Rebuild the store from the files in `data_dir`.
pub async fn build(args: &StoreArgs, data_dir: &Path) -> Result<()> {
    let config = args.rag_config()?;
    let chunks = prepare_chunks(data_dir)
        .with_context(|| format!("failed to read travel data from {}", data_dir.display()))?;
    let store = file_store(args, &config)?;
    store.create(&chunks).await.context("failed to build vector store")?;

    info!(chunks = chunks.len(), dir = %store.dir().display(), "vector store rebuilt");
    println!("Vectorstore built with {} chunks at {}", chunks.len(), store.dir().display());
    Ok(())
}

pub async fn ask(args: &StoreArgs, question: &str) -> Result<()> {
    let generator = generator(args)?;
    println!("{}", generator.generate_answer(question).await);
    Ok(())
}

/// Print hits as one JSON object per line.
pub async fn search(args: &StoreArgs, query: &str, k: Option<usize>) -> Result<()> {
    let config = args.rag_config()?;
    let store = file_store(args, &config)?.load().context("vector store is not ready")?;
    let hits = store.similarity_search(query, k.unwrap_or(config.top_k)).await?;
    for hit in hits {
        println!("{}", serde_json::to_string(&hit)?);
    }
    Ok(())
}

pub fn chunks(data_dir: &Path) -> Result<()> {
    for chunk in prepare_chunks(data_dir)? {
        println!("{}", chunk.text);
    }
    Ok(())
}

pub async fn chat(args: &StoreArgs) -> Result<()> {
    let generator = generator(args)?;
    let mut editor = DefaultEditor::new()?;
    println!("Ask about fares, bus companies, or privacy policies. Type 'exit' to quit.");

    loop {
        match editor.readline("you> ") {
            Ok(line) => {
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }
                if matches!(question, "exit" | "quit") {
                    break;
                }
                let _ = editor.add_history_entry(question);
                println!("{}", generator.generate_answer(question).await);
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
