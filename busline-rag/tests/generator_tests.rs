//! Behaviour of the answer generator: readiness, prompt selection, retries.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use busline_rag::{
    Chunk, Completion, Embedder, FAILURE_MESSAGE, FileVectorStore, GenerationBackend,
    HashingEmbeddingProvider, NOT_CONFIGURED_MESSAGE, NOT_READY_MESSAGE, PromptPlan, RagConfig,
    RagError, RagGenerator, Result, SearchHit, VectorStore,
};
use tokio::time::Instant;

const DIM: usize = 384;

/// Replays a fixed script of completions and records every prompt it receives.
#[derive(Default)]
struct ScriptedBackend {
    script: Mutex<VecDeque<Completion>>,
    prompts: Mutex<Vec<String>>,
    call_times: Mutex<Vec<Instant>>,
}

impl ScriptedBackend {
    fn new(script: impl IntoIterator<Item = Completion>) -> Arc<Self> {
        Arc::new(Self { script: Mutex::new(script.into_iter().collect()), ..Default::default() })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn gaps(&self) -> Vec<Duration> {
        let times = self.call_times.lock().unwrap();
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn complete(&self, prompt: &str, _max_tokens: u32, _temperature: f32) -> Completion {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.call_times.lock().unwrap().push(Instant::now());
        self.script.lock().unwrap().pop_front().unwrap_or(Completion::Empty)
    }
}

fn embedder() -> Embedder {
    Embedder::new(Arc::new(HashingEmbeddingProvider::new(DIM)), DIM)
}

async fn built_store(dir: &std::path::Path, texts: &[&str]) -> FileVectorStore {
    let store = FileVectorStore::new(dir, embedder());
    let chunks: Vec<Chunk> = texts.iter().map(|t| Chunk::new(*t)).collect();
    store.create(&chunks).await.unwrap();
    store
}

fn generator(
    store: &FileVectorStore,
    config: RagConfig,
    backend: Arc<ScriptedBackend>,
) -> RagGenerator {
    RagGenerator::builder().config(config).load_result(store.load()).backend(backend).build().unwrap()
}

#[tokio::test]
async fn unbuilt_store_reports_not_ready_without_calling_backend() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileVectorStore::new(dir.path().join("missing"), embedder());
    let backend = ScriptedBackend::new([Completion::Text("unused".into())]);
    let generator = generator(&store, RagConfig::default(), backend.clone());

    assert!(!generator.is_ready());
    assert_eq!(generator.generate_answer("any fares?").await, NOT_READY_MESSAGE);
    assert_eq!(generator.generate_answer("still nothing?").await, NOT_READY_MESSAGE);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn relevant_chunk_selects_grounded_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let store = built_store(dir.path(), &["Fare to Daulatpur is 100 BDT."]).await;
    let backend = ScriptedBackend::new([Completion::Text("It costs **100 BDT**.".into())]);
    let config = RagConfig::builder().similarity_threshold(0.0).build().unwrap();
    let generator = generator(&store, config, backend.clone());

    let plan = generator.plan("cost to Daulatpur").await.unwrap();
    assert!(plan.is_grounded());

    let answer = generator.generate_answer("cost to Daulatpur").await;
    assert_eq!(answer, "It costs 100 BDT.");
    let prompts = backend.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("- Fare to Daulatpur is 100 BDT."));
    assert!(prompts[0].contains("cost to Daulatpur"));
}

#[tokio::test]
async fn unrelated_question_selects_open_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let store = built_store(dir.path(), &["Fare to Daulatpur is 100 BDT."]).await;
    let backend = ScriptedBackend::new([Completion::Text("Hello!".into())]);
    let generator = generator(&store, RagConfig::default(), backend.clone());

    match generator.plan("tell me a joke").await.unwrap() {
        PromptPlan::Open { prompt } => assert!(!prompt.contains("Daulatpur")),
        other => panic!("expected open prompt, got {other:?}"),
    }
    assert_eq!(generator.generate_answer("tell me a joke").await, "Hello!");
}

/// A loaded store whose every search fails.
struct BrokenStore;

#[async_trait]
impl VectorStore for BrokenStore {
    async fn similarity_search(&self, _query: &str, _k: usize) -> Result<Vec<SearchHit>> {
        Err(RagError::EmbeddingError { provider: "Broken".into(), message: "offline".into() })
    }

    fn len(&self) -> usize {
        1
    }
}

#[tokio::test]
async fn search_failure_falls_back_to_open_prompt() {
    let backend = ScriptedBackend::new([Completion::Text("Happy to help!".into())]);
    let generator = RagGenerator::builder()
        .store(Arc::new(BrokenStore))
        .backend(backend.clone())
        .build()
        .unwrap();

    assert!(generator.is_ready());
    assert!(generator.retrieve("fare to Sylhet").await.is_err());
    match generator.plan("fare to Sylhet").await.unwrap() {
        PromptPlan::Open { prompt } => assert!(prompt.contains("User: fare to Sylhet")),
        other => panic!("expected open prompt, got {other:?}"),
    }

    assert_eq!(generator.generate_answer("fare to Sylhet").await, "Happy to help!");
    let prompts = backend.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("User: fare to Sylhet"));
}

#[tokio::test]
async fn retrieve_applies_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let store = built_store(dir.path(), &["Hanif runs to Sylhet.", "Green Line runs to Cox."]).await;
    let config = RagConfig::builder().similarity_threshold(0.32).build().unwrap();
    let generator = generator(&store, config, ScriptedBackend::new([]));

    let hits = generator.retrieve("Hanif runs to Sylhet.").await.unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.score >= 0.32));
    assert_eq!(hits[0].text, "Hanif runs to Sylhet.");
}

#[tokio::test(start_paused = true)]
async fn recovers_after_three_failures_with_backoff() {
    let dir = tempfile::tempdir().unwrap();
    let store = built_store(dir.path(), &["Fare to Daulatpur is 100 BDT."]).await;
    let backend = ScriptedBackend::new([
        Completion::Failed("connection reset".into()),
        Completion::Empty,
        Completion::Text("  ##  ".into()),
        Completion::Text("# Ticket costs 100 BDT".into()),
    ]);
    let generator = generator(&store, RagConfig::default(), backend.clone());

    let start = Instant::now();
    let answer = generator.generate_answer("cost to Daulatpur").await;
    let elapsed = start.elapsed();

    assert_eq!(answer, "Ticket costs 100 BDT");
    assert_eq!(backend.calls(), 4);
    assert_eq!(
        backend.gaps(),
        vec![Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(8)]
    );
    assert!(elapsed >= Duration::from_secs(14) && elapsed < Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_four_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let store = built_store(dir.path(), &["Fare to Daulatpur is 100 BDT."]).await;
    let backend = ScriptedBackend::new(std::iter::repeat_n(Completion::Empty, 10));
    let generator = generator(&store, RagConfig::default(), backend.clone());

    let start = Instant::now();
    let answer = generator.generate_answer("cost to Daulatpur").await;

    assert_eq!(answer, FAILURE_MESSAGE);
    assert_eq!(backend.calls(), 4);
    assert!(start.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn unconfigured_backend_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let store = built_store(dir.path(), &["Fare to Daulatpur is 100 BDT."]).await;
    let backend = ScriptedBackend::new([Completion::Unconfigured, Completion::Text("no".into())]);
    let generator = generator(&store, RagConfig::default(), backend.clone());

    let start = Instant::now();
    assert_eq!(generator.generate_answer("hello").await, NOT_CONFIGURED_MESSAGE);
    assert_eq!(backend.calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn attempt_count_follows_config() {
    let dir = tempfile::tempdir().unwrap();
    let store = built_store(dir.path(), &["Fare to Daulatpur is 100 BDT."]).await;
    let backend = ScriptedBackend::new([]);
    let config = RagConfig::builder()
        .max_attempts(2)
        .backoff_unit(Duration::from_millis(10))
        .build()
        .unwrap();
    let generator = generator(&store, config, backend.clone());

    assert_eq!(generator.generate_answer("hello").await, FAILURE_MESSAGE);
    assert_eq!(backend.calls(), 2);
    assert_eq!(backend.gaps(), vec![Duration::from_millis(20)]);
}
