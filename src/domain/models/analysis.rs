//! Output of the training analyzer.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Aggregate telemetry for one domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainStats {
    pub domain: String,
    pub calls: usize,
    pub avg_duration_ms: f64,
    /// Calls per model id.
    pub models: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPriority {
    Medium,
    High,
}

impl fmt::Display for SuggestionPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Medium => f.write_str("medium"),
            Self::High => f.write_str("high"),
        }
    }
}

/// An actionable optimization hint. Never applied automatically.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Suggestion {
    /// Enough traffic to justify a specialised fine-tuned model.
    FineTune {
        domain: String,
        calls: usize,
        priority: SuggestionPriority,
    },
    /// Latency is high enough that a smaller model should be tried.
    RouteToFasterModel {
        domain: String,
        avg_duration_ms: f64,
        calls: usize,
    },
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FineTune {
                domain,
                calls,
                priority,
            } => write!(
                f,
                "[{priority}] fine-tune a specialised model for '{domain}' ({calls} calls in window)"
            ),
            Self::RouteToFasterModel {
                domain,
                avg_duration_ms,
                calls,
            } => write!(
                f,
                "route '{domain}' to a smaller/faster model (avg {avg_duration_ms:.0}ms over {calls} calls)"
            ),
        }
    }
}

/// Full analysis over the telemetry window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub window_days: u32,
    pub total_calls: usize,
    /// Sorted by call count descending, then domain id.
    pub domains: Vec<DomainStats>,
    pub suggestions: Vec<Suggestion>,
}
