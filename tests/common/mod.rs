//! Common test utilities for integration tests
//!
//! Provides shared fixtures, helpers, and test utilities used across
//! multiple integration test files.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use switchyard::adapters::embeddings::HashEmbeddingProvider;
use switchyard::adapters::generation::ScriptedGenerator;
use switchyard::{Config, DomainError, DomainResult, EmbeddingProvider, Pipeline};
use tempfile::TempDir;

/// Create a temporary directory for test isolation
///
/// Returns a TempDir that will be cleaned up when dropped.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Default configuration with every storage path inside `dir`.
pub fn config_in(dir: &TempDir) -> Config {
    let path = |name: &str| dir.path().join(name).display().to_string();

    let mut config = Config::default();
    config.knowledge.entries_path = path("knowledge.jsonl");
    config.knowledge.vector_path = None;
    config.graph.path = path("graph.json");
    config.telemetry.task_log_path = path("task_log.jsonl");
    config
}

/// Open a pipeline backed by feature-hashing embeddings.
pub async fn open_pipeline(dir: &TempDir, generator: ScriptedGenerator) -> Pipeline {
    open_pipeline_with(dir, generator, Arc::new(HashEmbeddingProvider::default())).await
}

pub async fn open_pipeline_with(
    dir: &TempDir,
    generator: ScriptedGenerator,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Pipeline {
    Pipeline::open(config_in(dir), Arc::new(generator), embedder, None)
        .await
        .expect("Failed to open pipeline")
}

/// Replies to extraction prompts with `extraction` and to scoring
/// prompts with `score`.
pub fn extraction_and_score(extraction: &'static str, score: &'static str) -> ScriptedGenerator {
    ScriptedGenerator::new(move |_, options| {
        Ok(if options.json_mode { extraction } else { score }.to_string())
    })
}

/// Embedding provider that always fails.
pub struct OfflineEmbedder;

#[async_trait]
impl EmbeddingProvider for OfflineEmbedder {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn dimension(&self) -> usize {
        8
    }

    async fn embed(&self, _text: &str) -> DomainResult<Vec<f32>> {
        Err(DomainError::Unavailable("embedding service down".to_string()))
    }
}

/// Build owned documents from string slices.
pub fn docs(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}
