//! Vector store port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::VectorMatch;

/// Persistent nearest-neighbour index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store name for diagnostics.
    fn name(&self) -> &'static str;

    /// Insert or replace records. All slices must have the same length.
    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
        metadata: &[serde_json::Value],
    ) -> DomainResult<()>;

    /// The `n` records closest to `vector`, nearest first.
    async fn query(&self, vector: &[f32], n: usize) -> DomainResult<Vec<VectorMatch>>;

    /// Number of stored records.
    async fn count(&self) -> DomainResult<usize>;
}
