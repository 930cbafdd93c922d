//! Null embedding provider implementation.
//!
//! Used when no embedding backend is configured. Every call reports the
//! provider as unavailable so retrieval falls through to keyword scoring.

use async_trait::async_trait;

use super::embedding::EmbeddingProvider;
use crate::domain::errors::{DomainError, DomainResult};

/// An embedding provider that is never available.
#[derive(Debug, Clone, Default)]
pub struct NullEmbeddingProvider;

impl NullEmbeddingProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    fn name(&self) -> &'static str {
        "null"
    }

    fn dimension(&self) -> usize {
        0
    }

    async fn embed(&self, _text: &str) -> DomainResult<Vec<f32>> {
        Err(DomainError::Unavailable(
            "no embedding backend configured".to_string(),
        ))
    }

    async fn embed_batch(&self, _texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        Err(DomainError::Unavailable(
            "no embedding backend configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_provider_is_unavailable() {
        let provider = NullEmbeddingProvider::new();
        assert!(matches!(
            provider.embed("anything").await,
            Err(DomainError::Unavailable(_))
        ));
        assert!(provider.embed_batch(&["a".to_string()]).await.is_err());
    }
}
