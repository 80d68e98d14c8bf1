//! §4.8 Research Pipeline: turns one question into an answer with
//! citations through the fixed five-state machine (decompose → retrieve →
//! gap_analysis → [follow_up_retrieve] → synthesize).

mod json_extract;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use deepwiki_domain::entities::{
    CodeChunk, DeepResearchResult, ResearchProgress, ResearchStep, SearchResult, SourceReference, SubQuestion,
};
use deepwiki_domain::error::ResearchError;
use deepwiki_domain::ports::{LlmProvider, VectorStore};
use deepwiki_domain::value_objects::{DeepResearchConfig, ResearchProgressType, ResearchStepType, SubQuestionCategory};
use futures::future::join_all;
use tracing::warn;

use json_extract::extract_first_json_object;

/// Checked at each state boundary; returning `true` raises
/// `ResearchError::Cancelled` at that checkpoint.
pub type CancelPredicate = dyn Fn() -> bool + Send + Sync;

/// Invoked around each pipeline state. A panicking hook is caught and
/// logged, never propagated.
pub type ProgressHook = dyn Fn(&ResearchProgress) + Send + Sync;

const DECOMPOSE_SYSTEM_PROMPT: &str = "You are a senior engineer helping decompose a question about a codebase into a small set of focused sub-questions. Respond with a single JSON object of the shape {\"sub_questions\": [{\"question\": string, \"category\": \"structure\"|\"flow\"|\"dependencies\"|\"impact\"|\"comparison\"}]} and nothing else.";

const GAP_ANALYSIS_SYSTEM_PROMPT: &str = "You are reviewing retrieved code context for gaps before answering a question. Respond with a single JSON object of the shape {\"gaps\": [string], \"follow_up_queries\": [string]} and nothing else.";

const SYNTHESIS_SYSTEM_PROMPT: &str = "You are a senior engineer answering a question about a codebase using only the provided source excerpts. Cite files and names you rely on. If the context is insufficient, say so plainly.";

fn report_progress(hook: Option<&ProgressHook>, event: ResearchProgress) {
    let Some(hook) = hook else { return };
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| hook(&event)));
    if result.is_err() {
        warn!("research progress hook panicked, continuing");
    }
}

fn check_cancelled(cancel: Option<&CancelPredicate>, step: &str) -> Result<(), ResearchError> {
    if let Some(cancel) = cancel {
        if cancel() {
            return Err(ResearchError::Cancelled { step: step.to_string() });
        }
    }
    Ok(())
}

/// Orchestrates one question end-to-end. Holds only port references and
/// the configured bounds — no mutable state survives between calls to
/// `ask`.
pub struct ResearchPipeline {
    llm: Arc<dyn LlmProvider>,
    vector_store: Arc<dyn VectorStore>,
    config: DeepResearchConfig,
}

impl ResearchPipeline {
    pub fn new(llm: Arc<dyn LlmProvider>, vector_store: Arc<dyn VectorStore>, config: DeepResearchConfig) -> Self {
        ResearchPipeline { llm, vector_store, config }
    }

    pub async fn ask(
        &self,
        question: &str,
        progress: Option<&ProgressHook>,
        cancel: Option<&CancelPredicate>,
    ) -> Result<DeepResearchResult, ResearchError> {
        report_progress(progress, ResearchProgress::new(1, ResearchProgressType::Started, "starting research"));

        check_cancelled(cancel, "decompose")?;
        let (sub_questions, decompose_trace) = self.decompose(question).await;
        report_progress(
            progress,
            with_sub_question_count(
                ResearchProgress::new(2, ResearchProgressType::DecompositionComplete, "decomposed question"),
                sub_questions.len(),
            ),
        );

        check_cancelled(cancel, "retrieve")?;
        let queries: Vec<String> = if sub_questions.is_empty() {
            vec![question.to_string()]
        } else {
            sub_questions.iter().map(|sq| sq.question.clone()).collect()
        };
        let (initial_results, retrieve_trace) = self.retrieve(&queries, self.config.chunks_per_subquestion).await;
        report_progress(
            progress,
            with_chunk_count(
                ResearchProgress::new(3, ResearchProgressType::RetrievalComplete, "retrieved initial context"),
                initial_results.len(),
            ),
        );

        check_cancelled(cancel, "gap_analysis")?;
        let (follow_up_queries, gap_trace) = self
            .gap_analysis(question, &sub_questions, &initial_results)
            .await;
        report_progress(
            progress,
            with_follow_up_count(
                ResearchProgress::new(4, ResearchProgressType::GapAnalysisComplete, "analyzed gaps"),
                follow_up_queries.len(),
            ),
        );

        let mut additional_results = Vec::new();
        let mut follow_up_trace = None;
        if !follow_up_queries.is_empty() {
            check_cancelled(cancel, "follow_up_retrieve")?;
            let limit = std::cmp::max(3, self.config.chunks_per_subquestion.saturating_sub(2));
            let (results, trace) = self.retrieve(&follow_up_queries, limit).await;
            report_progress(
                progress,
                with_chunk_count(
                    ResearchProgress::new(5, ResearchProgressType::FollowupComplete, "retrieved follow-up context"),
                    results.len(),
                ),
            );
            additional_results = results;
            follow_up_trace = Some(trace);
        }

        let prepared = prepare_chunks(initial_results, additional_results, self.config.max_total_chunks);

        check_cancelled(cancel, "synthesize")?;
        report_progress(progress, ResearchProgress::new(6, ResearchProgressType::SynthesisStarted, "synthesizing answer"));
        let (answer, synthesis_trace, llm_calls_in_synthesis) = self.synthesize(question, &sub_questions, &prepared).await;

        let sources: Vec<SourceReference> = prepared
            .iter()
            .map(|r| SourceReference {
                file_path: r.chunk.file_path.clone(),
                start_line: r.chunk.start_line,
                end_line: r.chunk.end_line,
                chunk_type: r.chunk.chunk_type,
                name: r.chunk.name.clone(),
                relevance_score: r.score,
            })
            .collect();

        let mut reasoning_trace = vec![decompose_trace, retrieve_trace, gap_trace];
        if let Some(trace) = follow_up_trace {
            reasoning_trace.push(trace);
        }
        reasoning_trace.push(synthesis_trace);

        let total_chunks_analyzed = prepared.len();
        report_progress(progress, ResearchProgress::new(7, ResearchProgressType::Complete, "research complete"));

        Ok(DeepResearchResult {
            question: question.to_string(),
            answer,
            sub_questions,
            sources,
            reasoning_trace,
            total_chunks_analyzed,
            total_llm_calls: 2 + llm_calls_in_synthesis,
        })
    }

    async fn decompose(&self, question: &str) -> (Vec<SubQuestion>, ResearchStep) {
        let start = Instant::now();
        let prompt = format!("Question: {question}\n\nDecompose this into focused sub-questions.");
        let sub_questions = match self.llm.generate(&prompt, Some(DECOMPOSE_SYSTEM_PROMPT), 1024, 0.2).await {
            Ok(reply) => parse_sub_questions(&reply, self.config.max_sub_questions),
            Err(e) => {
                warn!(error = %e, "decomposition call failed, proceeding with the original question only");
                Vec::new()
            }
        };
        let step = ResearchStep {
            step_type: ResearchStepType::Decomposition,
            description: format!("decomposed into {} sub-questions", sub_questions.len()),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        (sub_questions, step)
    }

    async fn retrieve(&self, queries: &[String], limit: usize) -> (Vec<SearchResult>, ResearchStep) {
        let start = Instant::now();
        let searches = queries.iter().map(|q| {
            let vector_store = self.vector_store.clone();
            let query = q.clone();
            async move { vector_store.search(&query, limit, None, None).await }
        });

        let mut results = Vec::new();
        for outcome in join_all(searches).await {
            match outcome {
                Ok(hits) => results.extend(hits),
                Err(e) => warn!(error = %e, "sub-query search failed, skipping"),
            }
        }

        let step = ResearchStep {
            step_type: ResearchStepType::Retrieval,
            description: format!("retrieved {} chunks across {} queries", results.len(), queries.len()),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        (results, step)
    }

    async fn gap_analysis(
        &self,
        question: &str,
        sub_questions: &[SubQuestion],
        initial_results: &[SearchResult],
    ) -> (Vec<String>, ResearchStep) {
        let start = Instant::now();

        let follow_ups = if initial_results.is_empty() {
            vec![question.to_string()]
        } else {
            let summary = summarize_by_file(initial_results);
            let sub_question_list = sub_questions
                .iter()
                .map(|sq| format!("- {} ({:?})", sq.question, sq.category))
                .collect::<Vec<_>>()
                .join("\n");
            let prompt = format!(
                "Original question: {question}\n\nSub-questions:\n{sub_question_list}\n\nRetrieved context summary:\n{summary}\n\nIdentify gaps in this context and propose follow-up search queries."
            );

            match self.llm.generate(&prompt, Some(GAP_ANALYSIS_SYSTEM_PROMPT), 1024, 0.2).await {
                Ok(reply) => parse_follow_up_queries(&reply, self.config.max_follow_up_queries),
                Err(e) => {
                    warn!(error = %e, "gap analysis call failed, no follow-up queries");
                    Vec::new()
                }
            }
        };

        let step = ResearchStep {
            step_type: ResearchStepType::GapAnalysis,
            description: format!("identified {} follow-up queries", follow_ups.len()),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        (follow_ups, step)
    }

    async fn synthesize(
        &self,
        question: &str,
        sub_questions: &[SubQuestion],
        prepared: &[SearchResult],
    ) -> (String, ResearchStep, u32) {
        let start = Instant::now();

        if prepared.is_empty() {
            let step = ResearchStep {
                step_type: ResearchStepType::Synthesis,
                description: "no context available, returned canned response".to_string(),
                duration_ms: start.elapsed().as_millis() as u64,
            };
            return (
                "I could not find relevant context in the indexed codebase to answer this question.".to_string(),
                step,
                0,
            );
        }

        let unique_files: std::collections::HashSet<&str> =
            prepared.iter().map(|r| r.chunk.file_path.as_str()).collect();
        let sub_question_list = sub_questions
            .iter()
            .map(|sq| format!("- {}", sq.question))
            .collect::<Vec<_>>()
            .join("\n");
        let context = prepared.iter().map(render_chunk_frame).collect::<Vec<_>>().join("\n\n---\n\n");

        let prompt = format!(
            "Question: {question}\n\nSub-questions considered:\n{sub_question_list}\n\nContext spans {file_count} files and {chunk_count} chunks:\n\n{context}",
            file_count = unique_files.len(),
            chunk_count = prepared.len(),
        );

        let answer = match self
            .llm
            .generate(&prompt, Some(SYNTHESIS_SYSTEM_PROMPT), self.config.synthesis_max_tokens, self.config.synthesis_temperature)
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!(error = %e, "synthesis call failed");
                format!("Unable to synthesize an answer: {e}")
            }
        };

        let step = ResearchStep {
            step_type: ResearchStepType::Synthesis,
            description: format!("synthesized answer from {} chunks across {} files", prepared.len(), unique_files.len()),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        (answer, step, 1)
    }
}

fn with_sub_question_count(mut progress: ResearchProgress, count: usize) -> ResearchProgress {
    progress.sub_question_count = Some(count);
    progress
}

fn with_chunk_count(mut progress: ResearchProgress, count: usize) -> ResearchProgress {
    progress.chunk_count = Some(count);
    progress
}

fn with_follow_up_count(mut progress: ResearchProgress, count: usize) -> ResearchProgress {
    progress.follow_up_query_count = Some(count);
    progress
}

fn render_chunk_frame(result: &SearchResult) -> String {
    let chunk = &result.chunk;
    format!(
        "File: {}:{}-{} | Type: {} | Name: {}\n```\n{}\n```",
        chunk.file_path, chunk.start_line, chunk.end_line, chunk.chunk_type, chunk.name, chunk.content
    )
}

fn summarize_by_file(results: &[SearchResult]) -> String {
    let mut by_file: BTreeMap<&str, Vec<&CodeChunk>> = BTreeMap::new();
    for result in results {
        by_file.entry(result.chunk.file_path.as_str()).or_default().push(&result.chunk);
    }

    let mut out = String::new();
    for (file, chunks) in by_file.iter().take(10) {
        out.push_str(&format!("File: {file}\n"));
        for chunk in chunks.iter().take(3) {
            out.push_str(&format!("  - {} ({})\n", chunk.name, chunk.chunk_type));
        }
    }
    out
}

fn parse_sub_questions(reply: &str, max: usize) -> Vec<SubQuestion> {
    let Some(json_text) = extract_first_json_object(reply) else {
        return Vec::new();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(json_text) else {
        return Vec::new();
    };
    let Some(raw) = value["sub_questions"].as_array() else {
        return Vec::new();
    };

    raw.iter()
        .filter_map(|item| {
            let question = item["question"].as_str()?.to_string();
            let category = item["category"].as_str().map(SubQuestionCategory::normalize).unwrap_or_default();
            Some(SubQuestion { question, category })
        })
        .take(max)
        .collect()
}

fn parse_follow_up_queries(reply: &str, max: usize) -> Vec<String> {
    let Some(json_text) = extract_first_json_object(reply) else {
        return Vec::new();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(json_text) else {
        return Vec::new();
    };
    let Some(raw) = value["follow_up_queries"].as_array() else {
        return Vec::new();
    };

    raw.iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .take(max)
        .collect()
}

/// Merges initial and follow-up results, deduplicating by chunk id (keeping
/// the highest score), sorting by score descending, and truncating to
/// `max_total_chunks`.
fn prepare_chunks(initial: Vec<SearchResult>, additional: Vec<SearchResult>, max_total_chunks: usize) -> Vec<SearchResult> {
    let mut best: HashMap<String, SearchResult> = HashMap::new();
    for result in initial.into_iter().chain(additional) {
        best.entry(result.chunk.id.clone())
            .and_modify(|existing| {
                if result.score > existing.score {
                    *existing = result.clone();
                }
            })
            .or_insert(result);
    }

    let mut merged: Vec<SearchResult> = best.into_values().collect();
    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(max_total_chunks);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, score: f64) -> SearchResult {
        use deepwiki_domain::value_objects::{ChunkType, Language};
        SearchResult {
            chunk: CodeChunk::new(
                format!("{id}.py"),
                Language::Python,
                ChunkType::Function,
                id,
                "pass",
                1,
                1,
            ),
            score,
        }
    }

    fn with_id(mut result: SearchResult, id: &str) -> SearchResult {
        result.chunk.id = id.to_string();
        result
    }

    #[test]
    fn prepare_dedups_keeping_the_higher_score() {
        let initial = vec![with_id(chunk("a", 0.4), "dup"), with_id(chunk("b", 0.9), "other")];
        let additional = vec![with_id(chunk("a2", 0.8), "dup")];

        let merged = prepare_chunks(initial, additional, 10);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].score, 0.9);
        let dup = merged.iter().find(|r| r.chunk.id == "dup").unwrap();
        assert_eq!(dup.score, 0.8);
    }

    #[test]
    fn prepare_truncates_to_max_total_chunks() {
        let initial: Vec<SearchResult> = (0..5).map(|i| with_id(chunk(&i.to_string(), i as f64 / 10.0), &i.to_string())).collect();
        let merged = prepare_chunks(initial, Vec::new(), 3);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].score, 0.4);
    }

    #[test]
    fn parse_sub_questions_normalizes_unknown_categories() {
        let reply = r#"{"sub_questions": [{"question": "how does auth work?", "category": "bogus"}]}"#;
        let parsed = parse_sub_questions(reply, 4);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].category, SubQuestionCategory::Structure);
    }

    #[test]
    fn parse_sub_questions_truncates_to_max() {
        let reply = r#"{"sub_questions": [{"question": "a", "category": "flow"}, {"question": "b", "category": "flow"}]}"#;
        assert_eq!(parse_sub_questions(reply, 1).len(), 1);
    }

    #[test]
    fn parse_sub_questions_returns_empty_on_unparseable_reply() {
        assert!(parse_sub_questions("not json at all", 4).is_empty());
    }

    #[test]
    fn parse_follow_up_queries_filters_blank_entries() {
        let reply = r#"{"gaps": ["missing auth details"], "follow_up_queries": ["", "how is auth configured?"]}"#;
        let parsed = parse_follow_up_queries(reply, 3);
        assert_eq!(parsed, vec!["how is auth configured?".to_string()]);
    }
}
