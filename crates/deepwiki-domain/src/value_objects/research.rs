use serde::{Deserialize, Serialize};

/// Category of a decomposed sub-question. Unknown values encountered when
/// parsing an LLM response normalize to `Structure` rather than failing the
/// whole decomposition step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubQuestionCategory {
    Structure,
    Flow,
    Dependencies,
    Impact,
    Comparison,
}

impl SubQuestionCategory {
    /// Parses a free-form category string from an LLM response, normalizing
    /// anything outside the closed set to `Structure`.
    pub fn normalize(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "structure" => SubQuestionCategory::Structure,
            "flow" => SubQuestionCategory::Flow,
            "dependencies" => SubQuestionCategory::Dependencies,
            "impact" => SubQuestionCategory::Impact,
            "comparison" => SubQuestionCategory::Comparison,
            _ => SubQuestionCategory::Structure,
        }
    }
}

impl Default for SubQuestionCategory {
    fn default() -> Self {
        SubQuestionCategory::Structure
    }
}

/// The fixed states of the research pipeline's reasoning trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStepType {
    Decomposition,
    Retrieval,
    GapAnalysis,
    Synthesis,
}

impl ResearchStepType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResearchStepType::Decomposition => "decomposition",
            ResearchStepType::Retrieval => "retrieval",
            ResearchStepType::GapAnalysis => "gap_analysis",
            ResearchStepType::Synthesis => "synthesis",
        }
    }
}

/// Fine-grained progress events emitted around each pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchProgressType {
    Started,
    DecompositionComplete,
    RetrievalComplete,
    GapAnalysisComplete,
    FollowupComplete,
    SynthesisStarted,
    Complete,
}
