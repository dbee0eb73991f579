//! Generation backend adapter boundary.
//!
//! A [`GenerationBackend`] turns a prompt into text. It never returns an
//! error: every outcome, including transport failures, is a [`Completion`]
//! variant, and the generator's retry loop decides what to do with it.

use async_trait::async_trait;

/// The outcome of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The backend produced text.
    Text(String),
    /// The backend answered but produced no text.
    Empty,
    /// The call failed in transport or on the backend side.
    Failed(String),
    /// No credential is configured; no request was attempted.
    Unconfigured,
}

impl Completion {
    /// Build a completion from raw backend text, mapping blank text to [`Completion::Empty`].
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() { Completion::Empty } else { Completion::Text(text) }
    }

    /// Whether retrying could change the outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Completion::Empty | Completion::Failed(_))
    }
}

/// A remote text-generation service.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text for `prompt`.
    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Completion;
}

/// A backend with no credential. Every call reports [`Completion::Unconfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredBackend;

#[async_trait]
impl GenerationBackend for UnconfiguredBackend {
    async fn complete(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Completion {
        Completion::Unconfigured
    }
}
