//! End-to-end coverage for the Deep Research state machine: a fake
//! `LlmProvider` that dispatches on which system prompt it was given, and a
//! fake `VectorStore` that can be told to fail for one specific query,
//! stand in for a real model and a real DuckDB table.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use deepwiki_application::ResearchPipeline;
use deepwiki_domain::entities::{CodeChunk, SearchResult};
use deepwiki_domain::error::{IndexError, ProviderError};
use deepwiki_domain::ports::{GenerateStream, LlmProvider, VectorStore, VectorStoreStats};
use deepwiki_domain::value_objects::{ChunkType, DeepResearchConfig, Language};

fn decomposition_reply(count: usize) -> String {
    let questions: Vec<String> = (0..count)
        .map(|i| format!(r#"{{"question": "sub question {i}", "category": "flow"}}"#))
        .collect();
    format!(r#"{{"sub_questions": [{}]}}"#, questions.join(","))
}

/// Dispatches on the system prompt's content rather than modeling a real
/// chat template: the pipeline's three system prompts are distinguishable
/// by a single keyword each.
struct ScriptedLlm {
    sub_question_count: usize,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(sub_question_count: usize) -> Self {
        ScriptedLlm { sub_question_count, calls: AtomicUsize::new(0) }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, _prompt: &str, system_prompt: Option<&str>, _max_tokens: u32, _temperature: f64) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let system_prompt = system_prompt.unwrap_or_default();
        if system_prompt.contains("sub_questions") {
            Ok(decomposition_reply(self.sub_question_count))
        } else if system_prompt.contains("gaps") {
            Ok(r#"{"gaps": [], "follow_up_queries": []}"#.to_string())
        } else {
            Ok("synthesized answer".to_string())
        }
    }

    async fn generate_stream(&self, _prompt: &str, _system_prompt: Option<&str>, _max_tokens: u32, _temperature: f64) -> Result<GenerateStream, ProviderError> {
        unimplemented!("not exercised by the research pipeline")
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Returns one hit per query except for `failing_query`, which returns a
/// `VectorStoreIo` error. Records every query it was asked to search so
/// tests can assert which sub-questions actually reached the store.
struct SelectivelyFailingVectorStore {
    failing_query: Option<String>,
    seen_queries: Mutex<Vec<String>>,
}

impl SelectivelyFailingVectorStore {
    fn new(failing_query: Option<&str>) -> Self {
        SelectivelyFailingVectorStore {
            failing_query: failing_query.map(str::to_string),
            seen_queries: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.seen_queries.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl VectorStore for SelectivelyFailingVectorStore {
    async fn create_or_update_table(&self, _chunks: Vec<CodeChunk>) -> Result<usize, IndexError> {
        Ok(0)
    }

    async fn add_chunks(&self, _chunks: Vec<CodeChunk>) -> Result<usize, IndexError> {
        Ok(0)
    }

    async fn search(&self, query: &str, _limit: usize, _language: Option<Language>, _chunk_type: Option<ChunkType>) -> Result<Vec<SearchResult>, IndexError> {
        self.seen_queries.lock().unwrap().push(query.to_string());
        if self.failing_query.as_deref() == Some(query) {
            return Err(IndexError::VectorStoreIo(format!("simulated failure for {query}")));
        }
        let chunk = CodeChunk::new(format!("{query}.py"), Language::Python, ChunkType::Function, query, "pass", 1, 1);
        Ok(vec![SearchResult { chunk, score: 0.75 }])
    }

    async fn get_chunk_by_id(&self, _id: &str) -> Result<Option<CodeChunk>, IndexError> {
        Ok(None)
    }

    async fn get_chunks_by_file(&self, _rel_path: &str) -> Result<Vec<CodeChunk>, IndexError> {
        Ok(Vec::new())
    }

    async fn delete_chunks_by_file(&self, _rel_path: &str) -> Result<usize, IndexError> {
        Ok(0)
    }

    async fn stats(&self) -> Result<VectorStoreStats, IndexError> {
        Ok(VectorStoreStats::default())
    }
}

#[tokio::test]
async fn decomposition_is_capped_at_max_sub_questions() {
    let llm = Arc::new(ScriptedLlm::new(10));
    let store = Arc::new(SelectivelyFailingVectorStore::new(None));
    let mut config = DeepResearchConfig::default();
    config.max_sub_questions = 4;

    let pipeline = ResearchPipeline::new(llm, store, config);
    let result = pipeline.ask("how does the indexer work?", None, None).await.unwrap();

    assert_eq!(result.sub_questions.len(), 4);
    assert_eq!(result.sub_questions[0].question, "sub question 0");
    assert_eq!(result.sub_questions[3].question, "sub question 3");
}

#[tokio::test]
async fn one_failing_sub_query_does_not_fail_the_whole_retrieval() {
    let llm = Arc::new(ScriptedLlm::new(4));
    let failing_query = "sub question 2".to_string();
    let store = Arc::new(SelectivelyFailingVectorStore::new(Some(&failing_query)));
    let mut config = DeepResearchConfig::default();
    config.max_sub_questions = 4;

    let pipeline = ResearchPipeline::new(llm, store.clone(), config);
    let result = pipeline.ask("how does the indexer work?", None, None).await.unwrap();

    // 4 sub-questions searched, one failed and contributed no chunks.
    assert_eq!(store.call_count(), 4);
    let names: std::collections::HashSet<_> = result.sources.iter().map(|s| s.name.clone()).collect();
    assert!(names.contains("sub question 0"));
    assert!(names.contains("sub question 1"));
    assert!(names.contains("sub question 3"));
    assert!(!names.contains("sub question 2"));
    assert_eq!(result.sources.len(), 3);
}

#[tokio::test]
async fn cancellation_before_retrieval_stops_the_pipeline_before_any_search() {
    let llm = Arc::new(ScriptedLlm::new(2));
    let store = Arc::new(SelectivelyFailingVectorStore::new(None));
    let pipeline = ResearchPipeline::new(llm.clone(), store.clone(), DeepResearchConfig::default());

    let calls = AtomicUsize::new(0);
    let cancel = move || calls.fetch_add(1, Ordering::SeqCst) > 0;

    let err = pipeline.ask("how does the indexer work?", None, Some(&cancel)).await.unwrap_err();

    match err {
        deepwiki_domain::error::ResearchError::Cancelled { step } => assert_eq!(step, "retrieve"),
        other => panic!("expected Cancelled at retrieve, got {other:?}"),
    }
    assert_eq!(store.call_count(), 0, "cancellation before retrieval must not reach the vector store");
    assert_eq!(llm.call_count(), 1, "only the decomposition call should have run before cancellation");
}
