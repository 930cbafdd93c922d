//! In-memory vector store using brute-force cosine search.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{cosine_similarity, VectorMatch, VectorRecord};
use crate::domain::ports::VectorStore;

/// Vector store held entirely in memory.
#[derive(Default)]
pub struct InMemoryVectorStore {
    records: RwLock<Vec<VectorRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records; later duplicates replace earlier ones.
    pub fn from_records(records: impl IntoIterator<Item = VectorRecord>) -> Self {
        let mut stored: Vec<VectorRecord> = Vec::new();
        for record in records {
            insert_or_replace(&mut stored, record);
        }
        Self {
            records: RwLock::new(stored),
        }
    }
}

pub(crate) fn insert_or_replace(records: &mut Vec<VectorRecord>, record: VectorRecord) {
    match records.iter_mut().find(|existing| existing.id == record.id) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

/// Zip upsert arguments into records, rejecting mismatched lengths.
pub(crate) fn zip_records(
    ids: &[String],
    vectors: &[Vec<f32>],
    documents: &[String],
    metadata: &[serde_json::Value],
) -> DomainResult<Vec<VectorRecord>> {
    if ids.len() != vectors.len() || ids.len() != documents.len() || ids.len() != metadata.len() {
        return Err(DomainError::ValidationFailed(format!(
            "upsert length mismatch: {} ids, {} vectors, {} documents, {} metadata",
            ids.len(),
            vectors.len(),
            documents.len(),
            metadata.len()
        )));
    }

    Ok(ids
        .iter()
        .zip(vectors)
        .zip(documents)
        .zip(metadata)
        .map(|(((id, vector), document), metadata)| VectorRecord {
            id: id.clone(),
            vector: vector.clone(),
            document: document.clone(),
            metadata: metadata.clone(),
        })
        .collect())
}

pub(crate) fn nearest(records: &[VectorRecord], vector: &[f32], n: usize) -> Vec<VectorMatch> {
    let mut matches: Vec<VectorMatch> = records
        .iter()
        .map(|record| VectorMatch {
            id: record.id.clone(),
            document: record.document.clone(),
            metadata: record.metadata.clone(),
            distance: 1.0 - cosine_similarity(vector, &record.vector),
        })
        .collect();
    // Stable sort: equal distances keep insertion order.
    matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    matches.truncate(n);
    matches
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
        metadata: &[serde_json::Value],
    ) -> DomainResult<()> {
        let new_records = zip_records(ids, vectors, documents, metadata)?;
        let mut records = self.records.write().await;
        for record in new_records {
            insert_or_replace(&mut records, record);
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], n: usize) -> DomainResult<Vec<VectorMatch>> {
        let records = self.records.read().await;
        Ok(nearest(&records, vector, n))
    }

    async fn count(&self) -> DomainResult<usize> {
        Ok(self.records.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_query_orders_by_distance() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(
                &ids(&["far", "near"]),
                &[vec![0.0, 1.0], vec![1.0, 0.1]],
                &ids(&["far doc", "near doc"]),
                &[json!({}), json!({})],
            )
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].id, "near");
        assert_eq!(hits[1].id, "far");
        assert!(hits[0].distance < hits[1].distance);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(&ids(&["a"]), &[vec![1.0]], &ids(&["v1"]), &[json!({})])
            .await
            .unwrap();
        store
            .upsert(&ids(&["a"]), &[vec![1.0]], &ids(&["v2"]), &[json!({})])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.query(&[1.0], 5).await.unwrap();
        assert_eq!(hits[0].document, "v2");
    }

    #[tokio::test]
    async fn test_length_mismatch_rejected() {
        let store = InMemoryVectorStore::new();
        let err = store
            .upsert(&ids(&["a", "b"]), &[vec![1.0]], &ids(&["x"]), &[json!({})])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_query_truncates() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(
                &ids(&["a", "b", "c"]),
                &[vec![1.0], vec![1.0], vec![1.0]],
                &ids(&["a", "b", "c"]),
                &[json!({}), json!({}), json!({})],
            )
            .await
            .unwrap();
        assert_eq!(store.query(&[1.0], 2).await.unwrap().len(), 2);
    }
}
