//! Reranker candidates and results.

use serde::Serialize;

use super::degradation::Degradation;

/// A document moving through the reranking stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankCandidate {
    pub document: String,
    /// Relevance on a 0-10 scale once the fine stage has run.
    pub score: f32,
    pub metadata: Option<serde_json::Value>,
    /// Position of this document in the caller's original input.
    pub original_index: usize,
}

/// Ranked candidates plus any fallbacks taken to produce them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RerankOutcome {
    pub results: Vec<RerankCandidate>,
    /// Whether the embedding stage ran. False when it was skipped or unavailable.
    pub coarse_stage_applied: bool,
    pub degradations: Vec<Degradation>,
}

impl RerankOutcome {
    pub fn original_indices(&self) -> Vec<usize> {
        self.results.iter().map(|c| c.original_index).collect()
    }
}
