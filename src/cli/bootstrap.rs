//! Wires concrete adapters into a [`Pipeline`] from configuration.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::embeddings::{HashEmbeddingProvider, OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
use crate::adapters::generation::{OpenAiChatConfig, OpenAiChatGenerator, ScriptedGenerator};
use crate::adapters::vector::FileVectorStore;
use crate::domain::models::{Config, EmbeddingBackend};
use crate::domain::ports::{EmbeddingProvider, NullEmbeddingProvider, TextGenerator, VectorStore};
use crate::infrastructure::config::ConfigLoader;
use crate::services::Pipeline;

/// Load configuration from `path`, or from the project directory.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

pub fn build_generator(config: &Config, offline: bool) -> Result<Arc<dyn TextGenerator>> {
    if offline {
        return Ok(Arc::new(ScriptedGenerator::unavailable()));
    }
    let generator = OpenAiChatGenerator::new(OpenAiChatConfig::from(&config.llm))
        .context("Failed to create generation client")?;
    Ok(Arc::new(generator))
}

pub fn build_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(match config.embedding.backend {
        EmbeddingBackend::OpenAi => Arc::new(
            OpenAiEmbeddingProvider::new(OpenAiEmbeddingConfig::from(&config.embedding))
                .context("Failed to create embedding client")?,
        ),
        EmbeddingBackend::Hashing => Arc::new(HashEmbeddingProvider::new(config.embedding.dimension)),
        EmbeddingBackend::None => Arc::new(NullEmbeddingProvider),
    })
}

pub async fn build_vector_store(config: &Config) -> Result<Option<Arc<dyn VectorStore>>> {
    let Some(path) = &config.knowledge.vector_path else {
        return Ok(None);
    };
    let store = FileVectorStore::open(path)
        .await
        .with_context(|| format!("Failed to open vector store at {path}"))?;
    Ok(Some(Arc::new(store)))
}

pub async fn open_pipeline(config: Config, offline: bool) -> Result<Pipeline> {
    let generator = build_generator(&config, offline)?;
    let embedder = build_embedder(&config)?;
    let vector_store = build_vector_store(&config).await?;

    Pipeline::open(config, generator, embedder, vector_store)
        .await
        .context("Failed to open pipeline")
}
