//! Execution plan produced once per request by the task planner.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::domains::Domain;

/// Five-tier classification of a request's expected cost/complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TaskLevel {
    /// Greeting or acknowledgement.
    #[serde(rename = "L0")]
    Greeting,
    /// Short or lookup-style request.
    #[serde(rename = "L1")]
    Quick,
    /// Request that belongs to a specific domain.
    #[serde(rename = "L2")]
    Domain,
    /// Multi-step or long request.
    #[serde(rename = "L3")]
    Complex,
    /// Expert-level request that warrants the strongest models.
    #[serde(rename = "L4")]
    Expert,
}

impl TaskLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "L0",
            Self::Quick => "L1",
            Self::Domain => "L2",
            Self::Complex => "L3",
            Self::Expert => "L4",
        }
    }
}

impl fmt::Display for TaskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output shape requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Table,
    Json,
}

impl OutputFormat {
    /// Instruction appended to the last user message.
    pub const fn hint(self) -> &'static str {
        match self {
            Self::Markdown => "[Output format] Structure the answer in Markdown with headings and bullet points.",
            Self::Table => "[Output format] Present the key results as a Markdown table.",
            Self::Json => "[Output format] Respond with a single valid JSON object and nothing else.",
        }
    }

    /// Format explicitly asked for in the request text, if any.
    pub fn requested_in(lowercase_text: &str) -> Option<Self> {
        if lowercase_text.contains("json") {
            Some(Self::Json)
        } else if lowercase_text.contains("表格") || lowercase_text.contains("table") {
            Some(Self::Table)
        } else {
            None
        }
    }
}

/// What the executor should do with a scored response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Keep the response.
    Accept,
    /// Try the same model again.
    Retry,
    /// Move to the next model in the chain.
    Escalate { next_model: String },
    /// Retries and escalation are used up; keep the best response so far.
    Exhausted,
}

/// Immutable plan for a single request.
///
/// Built only by [`TaskPlanner`](crate::services::TaskPlanner); fields are
/// read through accessors so a plan cannot change after classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskPlan {
    pub(crate) level: TaskLevel,
    pub(crate) label: String,
    pub(crate) model_chain: Vec<String>,
    pub(crate) system_prompt: String,
    pub(crate) rag_query: String,
    pub(crate) rag_collections: BTreeSet<String>,
    pub(crate) output_format: Option<OutputFormat>,
    pub(crate) quality_gate: bool,
    pub(crate) quality_min_score: f32,
    pub(crate) escalation: bool,
    pub(crate) max_retries: u32,
    pub(crate) temperature: f32,
    pub(crate) domain: Domain,
    pub(crate) thinking: bool,
    pub(crate) log_for_training: bool,
}

impl TaskPlan {
    pub const fn level(&self) -> TaskLevel {
        self.level
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Model ids in fallback order. Never empty.
    pub fn model_chain(&self) -> &[String] {
        &self.model_chain
    }

    /// First model to try.
    pub fn primary_model(&self) -> &str {
        self.model_chain.first().map_or("", String::as_str)
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Retrieval query; empty means no retrieval.
    pub fn rag_query(&self) -> &str {
        &self.rag_query
    }

    pub fn needs_retrieval(&self) -> bool {
        !self.rag_query.is_empty()
    }

    pub const fn rag_collections(&self) -> &BTreeSet<String> {
        &self.rag_collections
    }

    pub const fn output_format(&self) -> Option<OutputFormat> {
        self.output_format
    }

    pub const fn quality_gate(&self) -> bool {
        self.quality_gate
    }

    /// Minimum acceptable score. Only meaningful when the gate is enabled.
    pub const fn quality_min_score(&self) -> f32 {
        self.quality_min_score
    }

    pub const fn escalation(&self) -> bool {
        self.escalation
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub const fn temperature(&self) -> f32 {
        self.temperature
    }

    pub const fn domain(&self) -> Domain {
        self.domain
    }

    pub const fn thinking(&self) -> bool {
        self.thinking
    }

    pub const fn log_for_training(&self) -> bool {
        self.log_for_training
    }

    /// Decide what to do with a response scored `score` that was produced by
    /// `current_model` after `retries_used` retries on that model.
    pub fn gate(&self, score: f32, retries_used: u32, current_model: &str) -> GateDecision {
        if !self.quality_gate || score >= self.quality_min_score {
            return GateDecision::Accept;
        }

        if retries_used < self.max_retries {
            return GateDecision::Retry;
        }

        if self.escalation {
            let next = self
                .model_chain
                .iter()
                .position(|m| m == current_model)
                .and_then(|pos| self.model_chain.get(pos + 1));
            if let Some(next_model) = next {
                return GateDecision::Escalate {
                    next_model: next_model.clone(),
                };
            }
        }

        GateDecision::Exhausted
    }
}
