//! Gemini generation backend using the `generateContent` REST endpoint.
//!
//! This module is only available when the `gemini` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{Completion, GenerationBackend};

/// The default Gemini API base URL.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default model for answer generation.
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Per-request timeout for generation calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A [`GenerationBackend`] backed by the Gemini API.
///
/// Without an API key the backend stays usable but every call returns
/// [`Completion::Unconfigured`] without network I/O.
///
/// # Configuration
///
/// - `api_key` – from the constructor or `GEMINI_API_KEY` / `GOOGLE_API_KEY`.
/// - `model` – defaults to `gemini-2.5-flash`, or `GEMINI_MODEL` when set.
///
/// # Example
///
/// ```rust,ignore
/// use busline_rag::gemini::GeminiBackend;
///
/// let backend = GeminiBackend::from_env();
/// let completion = backend.complete("Say hello", 64, 0.4).await;
/// ```
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    /// Create a backend with the given API key. A blank key leaves it unconfigured.
    pub fn new(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self::with_key((!api_key.trim().is_empty()).then_some(api_key))
    }

    /// Create a backend from `GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`.
    pub fn from_env() -> Self {
        let api_key = ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|key| !key.trim().is_empty());
        let backend = Self::with_key(api_key);
        match std::env::var("GEMINI_MODEL") {
            Ok(model) if !model.trim().is_empty() => backend.with_model(model),
            _ => backend,
        }
    }

    /// Create a backend with no credential.
    pub fn unconfigured() -> Self {
        Self::with_key(None)
    }

    fn with_key(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, api_key, model: DEFAULT_MODEL.into(), base_url: GEMINI_API_BASE.into() }
    }

    /// Set the model name (e.g. `gemini-2.5-pro`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the backend at a different API base (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether an API key is present.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// The model requests are sent to.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn build_request(prompt: &str, max_tokens: u32, temperature: f32) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: [Content { role: "user", parts: [RequestPart { text: prompt }] }],
        generation_config: GenerationConfig { max_output_tokens: max_tokens, temperature },
    }
}

/// Concatenate the text parts of the first candidate.
fn response_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default()
}

// ── GenerationBackend implementation ───────────────────────────────

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Completion {
        let Some(api_key) = &self.api_key else {
            return Completion::Unconfigured;
        };

        debug!(provider = "Gemini", model = %self.model, prompt_len = prompt.len(), "generating");

        let response = match self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&build_request(prompt, max_tokens, temperature))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = "Gemini", error = %e, "request failed");
                return Completion::Failed(format!("request failed: {e}"));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            warn!(provider = "Gemini", %status, "API error");
            return Completion::Failed(format!("API returned {status}: {detail}"));
        }

        match response.json::<GenerateResponse>().await {
            Ok(body) => Completion::from_text(response_text(body)),
            Err(e) => {
                warn!(provider = "Gemini", error = %e, "failed to parse response");
                Completion::Failed(format!("failed to parse response: {e}"))
            }
        }
    }
}
