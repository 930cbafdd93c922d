//! JSONL-backed vector store.
//!
//! Every upsert appends one line per record; on open, later lines for the
//! same id override earlier ones.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::memory::{insert_or_replace, nearest, zip_records};
use crate::domain::errors::DomainResult;
use crate::domain::models::{VectorMatch, VectorRecord};
use crate::domain::ports::VectorStore;

/// Vector store persisted to a JSONL file.
pub struct FileVectorStore {
    path: PathBuf,
    // Single lock covers both the in-memory view and the file append.
    records: Mutex<Vec<VectorRecord>>,
}

impl FileVectorStore {
    /// Open (or create on first write) the store at `path`.
    pub async fn open(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut records = Vec::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                for (line_no, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<VectorRecord>(line) {
                        Ok(record) => insert_or_replace(&mut records, record),
                        Err(e) => tracing::warn!(
                            path = %path.display(),
                            line = line_no + 1,
                            error = %e,
                            "Skipping malformed vector record"
                        ),
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(path = %path.display(), records = records.len(), "Opened vector store");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl VectorStore for FileVectorStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
        metadata: &[serde_json::Value],
    ) -> DomainResult<()> {
        let new_records = zip_records(ids, vectors, documents, metadata)?;

        let mut buffer = String::new();
        for record in &new_records {
            buffer.push_str(&serde_json::to_string(record)?);
            buffer.push('\n');
        }

        let mut records = self.records.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(buffer.as_bytes()).await?;
        file.flush().await?;

        for record in new_records {
            insert_or_replace(&mut records, record);
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], n: usize) -> DomainResult<Vec<VectorMatch>> {
        let records = self.records.lock().await;
        Ok(nearest(&records, vector, n))
    }

    async fn count(&self) -> DomainResult<usize> {
        Ok(self.records.lock().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reopen_restores_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.jsonl");

        let store = FileVectorStore::open(&path).await.unwrap();
        store
            .upsert(
                &["a".to_string()],
                &[vec![1.0, 0.0]],
                &["first".to_string()],
                &[json!({"collection": "general"})],
            )
            .await
            .unwrap();
        store
            .upsert(
                &["a".to_string()],
                &[vec![1.0, 0.0]],
                &["second".to_string()],
                &[json!({"collection": "general"})],
            )
            .await
            .unwrap();
        drop(store);

        let reopened = FileVectorStore::open(&path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
        let hits = reopened.query(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].document, "second");
        assert_eq!(hits[0].metadata["collection"], "general");
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileVectorStore::open(dir.path().join("none.jsonl")).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_lines_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.jsonl");
        std::fs::write(
            &path,
            "not json\n{\"id\":\"x\",\"vector\":[1.0],\"document\":\"ok\"}\n",
        )
        .unwrap();

        let store = FileVectorStore::open(&path).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
