//! Retrieval-augmented answer generator.
//!
//! The [`RagGenerator`] answers a question in four steps:
//!
//! 1. search the vector store for the `top_k` nearest chunks
//! 2. keep hits scoring at least `similarity_threshold`
//! 3. build a grounded prompt from the surviving hits, or an open-domain
//!    prompt when none survive
//! 4. call the generation backend with exponential backoff between attempts
//!
//! [`generate_answer`](RagGenerator::generate_answer) never fails: a missing
//! store, an unconfigured backend, and exhausted retries each resolve to a
//! fixed, human-readable message.
//!
//! # Example
//!
//! ```rust,ignore
//! use busline_rag::{RagConfig, RagGenerator};
//!
//! let generator = RagGenerator::builder()
//!     .config(RagConfig::default())
//!     .load_result(file_store.load())
//!     .backend(Arc::new(GeminiBackend::from_env()))
//!     .build()?;
//!
//! let answer = generator.generate_answer("How much is a ticket to Daulatpur?").await;
//! ```

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{error, info, warn};

use crate::backend::{Completion, GenerationBackend};
use crate::config::RagConfig;
use crate::document::SearchHit;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Returned for every question while no store is loaded.
pub const NOT_READY_MESSAGE: &str = "Vectorstore is not ready. Please rebuild it first.";

/// Returned when the generation backend has no credential.
pub const NOT_CONFIGURED_MESSAGE: &str = "AI model is not configured on the server.";

/// Returned when every generation attempt failed.
pub const FAILURE_MESSAGE: &str =
    "I'm having some trouble answering right now. Please try again shortly.";

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_`#>-]").expect("unreachable error: invalid markup pattern"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("unreachable error: invalid whitespace pattern"));

/// Strip markdown symbols and normalize spacing.
///
/// Each of `* _ ` # > -` becomes a space, whitespace runs collapse to a single
/// space, and the ends are trimmed.
pub fn clean_output(text: &str) -> String {
    let stripped = MARKUP.replace_all(text, " ");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Prompt asking the backend to answer only from the given context hits.
pub fn grounded_prompt(question: &str, hits: &[SearchHit]) -> String {
    let context: Vec<String> = hits.iter().map(|h| format!("- {}", h.text)).collect();
    format!(
        "You are a helpful assistant for bus travel in Bangladesh. \
         Answer using only the facts in the context below. \
         If the context does not cover the question, politely ask the user to clarify. \
         Write plain sentences without markdown symbols such as *, -, _ or #.\n\n\
         Context:\n{}\n\n\
         Question: {question}\n\n\
         Answer:",
        context.join("\n")
    )
}

/// Prompt for an open-domain conversational reply.
pub fn open_prompt(question: &str) -> String {
    format!(
        "You are a friendly conversational assistant. \
         The question below is not covered by the travel data, so reply naturally and helpfully. \
         Write plain sentences without markdown symbols such as *, -, _ or #. \
         If the question is unclear, ask one short follow-up question.\n\n\
         User: {question}\n\
         Reply:"
    )
}

/// The prompt chosen for a question.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPlan {
    /// At least one hit passed the threshold.
    Grounded {
        /// The assembled prompt.
        prompt: String,
        /// The hits used as context.
        hits: Vec<SearchHit>,
    },
    /// No hit passed the threshold.
    Open {
        /// The assembled prompt.
        prompt: String,
    },
}

impl PromptPlan {
    /// The prompt text to send to the backend.
    pub fn prompt(&self) -> &str {
        match self {
            PromptPlan::Grounded { prompt, .. } | PromptPlan::Open { prompt } => prompt,
        }
    }

    /// Whether retrieved context backs this prompt.
    pub fn is_grounded(&self) -> bool {
        matches!(self, PromptPlan::Grounded { .. })
    }
}

enum StoreState {
    Ready(Arc<dyn VectorStore>),
    NotReady { reason: String },
}

/// The retrieval-augmented answer generator.
///
/// Whether a store is available is decided once, at construction, and holds
/// for the generator's lifetime. Construct one via [`RagGenerator::builder()`].
pub struct RagGenerator {
    config: RagConfig,
    state: StoreState,
    backend: Arc<dyn GenerationBackend>,
}

impl RagGenerator {
    /// Create a new [`RagGeneratorBuilder`].
    pub fn builder() -> RagGeneratorBuilder {
        RagGeneratorBuilder::default()
    }

    /// Return a reference to the generator configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Whether a store was loaded.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, StoreState::Ready(_))
    }

    fn store(&self) -> Result<&Arc<dyn VectorStore>> {
        match &self.state {
            StoreState::Ready(store) => Ok(store),
            StoreState::NotReady { reason } => Err(RagError::NotReady { reason: reason.clone() }),
        }
    }

    /// Search and apply the similarity threshold.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] without a store, or the search error.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchHit>> {
        let hits = self.store()?.similarity_search(question, self.config.top_k).await?;
        let threshold = self.config.similarity_threshold;
        Ok(hits.into_iter().filter(|h| h.score >= threshold).collect())
    }

    /// Choose and assemble the prompt for `question`.
    ///
    /// A failed search is logged and treated as finding nothing relevant.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] without a store.
    pub async fn plan(&self, question: &str) -> Result<PromptPlan> {
        self.store()?;
        let hits = match self.retrieve(question).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "search failed; answering without context");
                Vec::new()
            }
        };

        if hits.is_empty() {
            info!(grounded = false, "no relevant context");
            Ok(PromptPlan::Open { prompt: open_prompt(question) })
        } else {
            info!(grounded = true, context_count = hits.len(), "using retrieved context");
            Ok(PromptPlan::Grounded { prompt: grounded_prompt(question, &hits), hits })
        }
    }

    /// Answer `question`. Always returns displayable text.
    pub async fn generate_answer(&self, question: &str) -> String {
        let plan = match self.plan(question).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "answering without a vector store");
                return NOT_READY_MESSAGE.to_string();
            }
        };
        self.generate(plan.prompt()).await
    }

    /// Run the backend with retries and clean its output.
    async fn generate(&self, prompt: &str) -> String {
        let max_attempts = self.config.max_attempts;
        for attempt in 1..=max_attempts {
            let reason = match self
                .backend
                .complete(prompt, self.config.max_output_tokens, self.config.temperature)
                .await
            {
                Completion::Text(text) => {
                    let cleaned = clean_output(&text);
                    if !cleaned.is_empty() {
                        info!(attempt, answer_len = cleaned.len(), "answer generated");
                        return cleaned;
                    }
                    "response was empty after cleanup".to_string()
                }
                Completion::Unconfigured => {
                    warn!("generation backend is not configured");
                    return NOT_CONFIGURED_MESSAGE.to_string();
                }
                Completion::Empty => "response was empty".to_string(),
                Completion::Failed(detail) => detail,
            };

            let wait = self.config.backoff_after(attempt);
            warn!(
                attempt,
                max_attempts,
                wait_ms = wait.as_millis() as u64,
                reason = %reason,
                "generation attempt failed; backing off"
            );
            tokio::time::sleep(wait).await;
        }

        error!(attempts = max_attempts, "generation failed after all attempts");
        FAILURE_MESSAGE.to_string()
    }
}

/// Builder for constructing a [`RagGenerator`].
///
/// A store source (`store`, `load_result`, or `not_ready`) and a backend are
/// required. The config defaults to [`RagConfig::default()`].
#[derive(Default)]
pub struct RagGeneratorBuilder {
    config: Option<RagConfig>,
    state: Option<StoreState>,
    backend: Option<Arc<dyn GenerationBackend>>,
}

impl RagGeneratorBuilder {
    /// Set the generator configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use an already-loaded store.
    pub fn store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.state = Some(StoreState::Ready(store));
        self
    }

    /// Use the outcome of a store load; an error leaves the generator not ready.
    pub fn load_result<S: VectorStore + 'static>(mut self, result: Result<S>) -> Self {
        self.state = Some(match result {
            Ok(store) => StoreState::Ready(Arc::new(store)),
            Err(e) => {
                warn!(error = %e, "vector store unavailable; answers will report not ready");
                StoreState::NotReady { reason: e.to_string() }
            }
        });
        self
    }

    /// Mark the generator as having no store.
    pub fn not_ready(mut self, reason: impl Into<String>) -> Self {
        self.state = Some(StoreState::NotReady { reason: reason.into() });
        self
    }

    /// Set the generation backend.
    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Build the [`RagGenerator`], validating the configuration and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the store source or backend is
    /// missing, or the config is invalid.
    pub fn build(self) -> Result<RagGenerator> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let state =
            self.state.ok_or_else(|| RagError::ConfigError("store is required".to_string()))?;
        let backend =
            self.backend.ok_or_else(|| RagError::ConfigError("backend is required".to_string()))?;

        Ok(RagGenerator { config, state, backend })
    }
}
