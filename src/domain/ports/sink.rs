//! Durable append-only record sink.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Accepts one JSON record per call. Records are never rewritten.
#[async_trait]
pub trait AppendOnlySink: Send + Sync {
    /// Append a single record.
    async fn append(&self, record: &serde_json::Value) -> DomainResult<()>;

    /// Read back every readable record, oldest first.
    async fn read_all(&self) -> DomainResult<Vec<serde_json::Value>>;

    /// Flush buffered writes to durable storage.
    async fn flush(&self) -> DomainResult<()> {
        Ok(())
    }
}
