//! Records of fail-soft fallbacks taken while serving a request.

use serde::Serialize;

use crate::domain::errors::DomainError;

/// A downstream failure that was absorbed by falling back to a cheaper path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// Vector store unreachable or returned an error.
    RetrievalUnavailable { reason: String },
    /// Embedding provider failed; similarity ranking was skipped.
    EmbeddingUnavailable { reason: String },
    /// Text generation failed for reasons other than a timeout.
    GenerationUnavailable { reason: String },
    /// Entity extraction returned output that is not the expected JSON.
    ExtractionParseFailure { reason: String },
    /// A relevance score could not be parsed; the neutral default was used.
    ScoringParseFailure { index: usize, raw: String },
    /// A downstream call exceeded its deadline.
    Timeout { operation: String, after_ms: u64 },
}

impl Degradation {
    /// Map a failed embedding call.
    pub fn embedding(err: &DomainError) -> Self {
        Self::from_error("embed", err, |reason| Self::EmbeddingUnavailable { reason })
    }

    /// Map a failed vector store call.
    pub fn retrieval(err: &DomainError) -> Self {
        Self::from_error("vector_query", err, |reason| Self::RetrievalUnavailable { reason })
    }

    /// Map a failed generation call.
    pub fn generation(operation: &str, err: &DomainError) -> Self {
        Self::from_error(operation, err, |reason| Self::GenerationUnavailable { reason })
    }

    fn from_error(operation: &str, err: &DomainError, other: impl FnOnce(String) -> Self) -> Self {
        match err {
            DomainError::Timeout(after_ms) => Self::Timeout {
                operation: operation.to_string(),
                after_ms: *after_ms,
            },
            err => other(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_are_classified_as_timeouts() {
        let d = Degradation::embedding(&DomainError::Timeout(10_000));
        assert_eq!(
            d,
            Degradation::Timeout {
                operation: "embed".to_string(),
                after_ms: 10_000
            }
        );
    }

    #[test]
    fn test_other_errors_keep_their_message() {
        let d = Degradation::retrieval(&DomainError::Unavailable("connection refused".to_string()));
        assert!(matches!(d, Degradation::RetrievalUnavailable { reason } if reason.contains("connection refused")));
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let d = Degradation::ScoringParseFailure {
            index: 2,
            raw: "very relevant".to_string(),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "scoring_parse_failure");
        assert_eq!(json["index"], 2);
    }
}
