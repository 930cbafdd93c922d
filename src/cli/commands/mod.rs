//! CLI command implementations.

pub mod analyze;
pub mod config;
pub mod graph;
pub mod ingest;
pub mod plan;
pub mod rerank;
pub mod search;
