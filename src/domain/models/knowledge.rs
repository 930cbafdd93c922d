//! Knowledge store entries and search results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::degradation::Degradation;

/// An ingested piece of knowledge. Append-only: never rewritten or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    /// Entry text, capped at `knowledge.max_entry_chars`.
    pub text: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl KnowledgeEntry {
    /// Collection the entry was filed under, if its metadata names one.
    pub fn collection(&self) -> Option<&str> {
        self.metadata.get("collection").and_then(serde_json::Value::as_str)
    }
}

/// Which stage of the retrieval fallback chain produced the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalTier {
    /// Persistent vector database.
    VectorStore,
    /// In-process embedding similarity over recent entries.
    Embedding,
    /// Word-overlap scoring over recent entries.
    Keyword,
    /// Nothing matched.
    None,
}

/// A single retrieved document before rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedDocument {
    pub text: String,
    pub source: String,
    pub score: f32,
}

/// Result of a knowledge search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    /// Rendered, budget-bounded text block ready for prompt injection.
    pub text: String,
    pub tier: RetrievalTier,
    pub documents: Vec<RetrievedDocument>,
    pub degradations: Vec<Degradation>,
}

impl SearchOutcome {
    pub fn empty(degradations: Vec<Degradation>) -> Self {
        Self {
            text: String::new(),
            tier: RetrievalTier::None,
            documents: Vec::new(),
            degradations,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Result of ingesting one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub entry: KnowledgeEntry,
    /// Whether the entry also reached the vector store.
    pub indexed: bool,
    pub degradations: Vec<Degradation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_from_metadata() {
        let entry = KnowledgeEntry {
            id: "1".to_string(),
            text: "t".to_string(),
            source: "s".to_string(),
            timestamp: Utc::now(),
            metadata: serde_json::json!({"collection": "legal_cases"}),
        };
        assert_eq!(entry.collection(), Some("legal_cases"));

        let bare = KnowledgeEntry {
            metadata: serde_json::Value::Null,
            ..entry
        };
        assert_eq!(bare.collection(), None);
    }

    #[test]
    fn test_entry_tolerates_missing_metadata() {
        let json = r#"{"id":"a","text":"t","source":"s","timestamp":"2026-01-01T00:00:00Z"}"#;
        let entry: KnowledgeEntry = serde_json::from_str(json).unwrap();
        assert!(entry.metadata.is_null());
    }
}
