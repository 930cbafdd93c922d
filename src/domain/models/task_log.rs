//! Routing telemetry records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed request, as reported back by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub label: String,
    pub domain: String,
    pub model_used: String,
    pub duration_ms: u64,
    /// Bounded, secret-scrubbed prefix of the query.
    pub query: String,
    /// Bounded, secret-scrubbed prefix of the response.
    pub response: String,
    pub quality_gate: bool,
}
