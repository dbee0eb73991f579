//! Command-line arguments.

use std::path::PathBuf;

use busline_rag::{RagConfig, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "busline")]
#[command(version)]
#[command(about = "Build and query the Busline travel-assistant retrieval store", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Log output format.
    #[arg(long, global = true, env = "BUSLINE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Chunk the source data, embed it, and replace the persisted store.
    Build {
        #[arg(long, env = "BUSLINE_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,
    },
    /// Answer one question.
    Ask {
        /// The question to answer.
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Print the nearest chunks for a query as JSON lines.
    Search {
        /// The search query.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Number of hits to print; defaults to the configured top-k.
        #[arg(short)]
        k: Option<usize>,
    },
    /// Print the chunks the build step would embed.
    Chunks {
        #[arg(long, env = "BUSLINE_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,
    },
    /// Interactive question loop.
    Chat,
}

#[derive(Args)]
pub struct StoreArgs {
    /// Directory holding embeddings.npy and metas.json.
    #[arg(long, global = true, env = "BUSLINE_STORE_DIR", default_value = "vectorstore/simple")]
    pub store_dir: PathBuf,

    /// Fixed embedding width.
    #[arg(long, global = true, env = "BUSLINE_DIMENSIONS")]
    pub dimensions: Option<usize>,

    /// Nearest chunks fetched per question.
    #[arg(long, global = true, env = "BUSLINE_TOP_K")]
    pub top_k: Option<usize>,

    /// Minimum cosine similarity for a chunk to be used as context.
    #[arg(long, global = true, env = "BUSLINE_SIMILARITY_THRESHOLD", allow_negative_numbers = true)]
    pub similarity_threshold: Option<f32>,

    /// Embedding backend.
    #[arg(long, global = true, env = "BUSLINE_EMBEDDER", value_enum, default_value_t = EmbedderKind::default())]
    pub embedder: EmbedderKind,
}

impl StoreArgs {
    /// Overlay the flags on the default configuration.
    pub fn rag_config(&self) -> Result<RagConfig> {
        let defaults = RagConfig::default();
        RagConfig::builder()
            .dimensions(self.dimensions.unwrap_or(defaults.dimensions))
            .top_k(self.top_k.unwrap_or(defaults.top_k))
            .similarity_threshold(self.similarity_threshold.unwrap_or(defaults.similarity_threshold))
            .build()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// Feature-hashing bag of words; no model download.
    Hashing,
    /// Local AllMiniLML6V2 model; needs the `fastembed` feature.
    Local,
}

impl Default for EmbedderKind {
    #[cfg(feature = "fastembed")]
    fn default() -> Self {
        EmbedderKind::Local
    }

    #[cfg(not(feature = "fastembed"))]
    fn default() -> Self {
        EmbedderKind::Hashing
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}
