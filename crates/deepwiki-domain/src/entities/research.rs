use serde::{Deserialize, Serialize};

use crate::value_objects::{ChunkType, ResearchProgressType, ResearchStepType, SubQuestionCategory};

/// A narrower question produced by the decomposition step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQuestion {
    pub question: String,
    pub category: SubQuestionCategory,
}

/// One entry in the reasoning trace attached to the final result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchStep {
    pub step_type: ResearchStepType,
    pub description: String,
    pub duration_ms: u64,
}

/// A point-in-time progress event, emitted before and after each pipeline
/// state so a caller-supplied callback can render live status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchProgress {
    pub step: u32,
    pub step_type: ResearchProgressType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_question_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_query_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ResearchProgress {
    pub fn new(step: u32, step_type: ResearchProgressType, message: impl Into<String>) -> Self {
        ResearchProgress {
            step,
            step_type,
            message: message.into(),
            sub_question_count: None,
            chunk_count: None,
            follow_up_query_count: None,
            duration_ms: None,
        }
    }
}

/// A citation attached to a synthesized answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReference {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub chunk_type: ChunkType,
    pub name: String,
    pub relevance_score: f64,
}

/// The final output of the deep research pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepResearchResult {
    pub question: String,
    pub answer: String,
    pub sub_questions: Vec<SubQuestion>,
    pub sources: Vec<SourceReference>,
    pub reasoning_trace: Vec<ResearchStep>,
    pub total_chunks_analyzed: usize,
    pub total_llm_calls: u32,
}
