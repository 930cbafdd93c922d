//! Output formatting utilities for the CLI.

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

use crate::domain::models::Degradation;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Borderless list table with upper-case headers.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Truncate to `max_chars` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// One "degraded: ..." line per fallback taken, for human output.
pub fn degradation_lines(degradations: &[Degradation]) -> Vec<String> {
    degradations
        .iter()
        .map(|d| {
            let detail = match d {
                Degradation::RetrievalUnavailable { reason } => format!("vector store unavailable ({reason})"),
                Degradation::EmbeddingUnavailable { reason } => format!("embeddings unavailable ({reason})"),
                Degradation::GenerationUnavailable { reason } => format!("generation unavailable ({reason})"),
                Degradation::ExtractionParseFailure { reason } => format!("extraction unparseable ({reason})"),
                Degradation::ScoringParseFailure { index, raw } => {
                    format!("score for document {index} unparseable ({raw:?})")
                }
                Degradation::Timeout { operation, after_ms } => {
                    format!("{operation} timed out after {after_ms}ms")
                }
            };
            format!("degraded: {detail}")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("鋼筋混凝土結構", 5), "鋼筋...");
    }

    #[test]
    fn test_degradation_lines() {
        let lines = degradation_lines(&[Degradation::Timeout {
            operation: "embed".to_string(),
            after_ms: 10_000,
        }]);
        assert_eq!(lines, vec!["degraded: embed timed out after 10000ms".to_string()]);
    }
}
