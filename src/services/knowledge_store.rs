//! Append-only knowledge with tiered retrieval.
//!
//! Entries are written once to a durable JSONL log and mirrored into a
//! bounded in-memory active view (newest `max_entries`). Search walks a
//! fallback chain and reports which tier answered:
//!
//! 1. vector store nearest neighbours
//! 2. embedding similarity over the active view
//! 3. word-overlap scoring over the active view
//!
//! When reranking is enabled the chosen tier over-fetches and the
//! [`HybridReranker`] trims back to `limit`.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    cosine_similarity, Degradation, Domain, IngestOutcome, KnowledgeConfig, KnowledgeEntry,
    RetrievalTier, RetrievedDocument, SearchOutcome,
};
use crate::domain::ports::{AppendOnlySink, EmbeddingProvider, VectorStore};
use crate::domain::text::{token_set, truncate_chars};
use crate::services::call_guard::CallGuard;
use crate::services::reranker::HybridReranker;

/// Entries embedded per guarded call when filling in missing vectors.
const BACKFILL_CHUNK: usize = 32;

struct ActiveEntry {
    entry: KnowledgeEntry,
    vector: Option<Vec<f32>>,
}

/// Candidate produced by one retrieval tier, before reranking.
struct Candidate {
    text: String,
    source: String,
    score: f32,
    metadata: serde_json::Value,
}

pub struct KnowledgeStore {
    config: KnowledgeConfig,
    log: Arc<dyn AppendOnlySink>,
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Option<Arc<dyn VectorStore>>,
    reranker: Option<Arc<HybridReranker>>,
    embed_guard: CallGuard,
    active: RwLock<VecDeque<ActiveEntry>>,
}

impl KnowledgeStore {
    /// Open the store, reloading the active view from the tail of the log.
    pub async fn open(
        config: KnowledgeConfig,
        log: Arc<dyn AppendOnlySink>,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Option<Arc<dyn VectorStore>>,
        embed_guard: CallGuard,
    ) -> DomainResult<Self> {
        let records = log.read_all().await?;
        let skip = records.len().saturating_sub(config.max_entries);
        let active: VecDeque<ActiveEntry> = records
            .into_iter()
            .skip(skip)
            .filter_map(|value| match serde_json::from_value::<KnowledgeEntry>(value) {
                Ok(entry) => Some(ActiveEntry { entry, vector: None }),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping knowledge record with unexpected shape");
                    None
                }
            })
            .collect();

        tracing::info!(
            entries = active.len(),
            vector_store = vector_store.as_ref().map(|s| s.name()),
            embedder = embedder.name(),
            "knowledge store opened"
        );

        Ok(Self {
            config,
            log,
            embedder,
            vector_store,
            reranker: None,
            embed_guard,
            active: RwLock::new(active),
        })
    }

    #[must_use]
    pub fn with_reranker(mut self, reranker: Arc<HybridReranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Entries currently in the active view.
    pub async fn len(&self) -> usize {
        self.active.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.active.read().await.is_empty()
    }

    pub async fn flush(&self) -> DomainResult<()> {
        self.log.flush().await
    }

    /// Ingest one entry.
    ///
    /// The durable log write is the only hard failure. Embedding and vector
    /// store failures leave the entry searchable by keyword and are reported
    /// as degradations.
    pub async fn add(
        &self,
        text: &str,
        source: &str,
        metadata: serde_json::Value,
    ) -> DomainResult<IngestOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::ValidationFailed(
                "knowledge text cannot be empty".to_string(),
            ));
        }

        let metadata = match metadata {
            serde_json::Value::Null => json!({}),
            serde_json::Value::Object(map) => serde_json::Value::Object(map),
            other => {
                return Err(DomainError::ValidationFailed(format!(
                    "metadata must be a JSON object, got {other}"
                )))
            }
        };
        if let Some(collection) = metadata.get("collection").and_then(serde_json::Value::as_str) {
            validate_collection(collection)?;
        }

        let entry = KnowledgeEntry {
            id: Uuid::new_v4().to_string(),
            text: truncate_chars(text, self.config.max_entry_chars),
            source: source.to_string(),
            timestamp: Utc::now(),
            metadata,
        };
        {
            // The view mirrors the log tail, so both change in one step.
            let mut active = self.active.write().await;
            self.log.append(&serde_json::to_value(&entry)?).await?;
            active.push_back(ActiveEntry {
                entry: entry.clone(),
                vector: None,
            });
            while active.len() > self.config.max_entries {
                active.pop_front();
            }
        }

        let mut degradations = Vec::new();
        let mut indexed = false;
        let vector = match self.embed_guard.run(self.embedder.embed(&entry.text)).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                degradations.push(Degradation::embedding(&e));
                None
            }
        };

        if let (Some(store), Some(vector)) = (&self.vector_store, &vector) {
            let mut store_metadata = entry.metadata.clone();
            if let Some(map) = store_metadata.as_object_mut() {
                map.insert("source".to_string(), json!(entry.source));
            }
            match store
                .upsert(
                    std::slice::from_ref(&entry.id),
                    std::slice::from_ref(vector),
                    std::slice::from_ref(&entry.text),
                    std::slice::from_ref(&store_metadata),
                )
                .await
            {
                Ok(()) => indexed = true,
                Err(e) => degradations.push(Degradation::retrieval(&e)),
            }
        }

        if let Some(vector) = vector {
            let mut active = self.active.write().await;
            if let Some(slot) = active.iter_mut().rev().find(|a| a.entry.id == entry.id) {
                slot.vector = Some(vector);
            }
        }

        tracing::info!(
            id = %entry.id,
            source = %entry.source,
            chars = entry.text.chars().count(),
            indexed,
            degradations = degradations.len(),
            "knowledge entry added"
        );
        Ok(IngestOutcome {
            entry,
            indexed,
            degradations,
        })
    }

    /// Search all knowledge. Never fails; degraded tiers are reported on
    /// the outcome.
    pub async fn search(&self, query: &str, limit: usize) -> SearchOutcome {
        self.search_filtered(query, limit, &[]).await
    }

    /// Search entries filed under `collection`.
    ///
    /// Unknown collection ids are a caller error.
    pub async fn search_collection(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
    ) -> DomainResult<SearchOutcome> {
        self.search_collections(&[collection], query, limit).await
    }

    /// Search entries filed under any of `collections`. An empty list
    /// searches everything.
    pub async fn search_collections(
        &self,
        collections: &[&str],
        query: &str,
        limit: usize,
    ) -> DomainResult<SearchOutcome> {
        for collection in collections {
            validate_collection(collection)?;
        }
        Ok(self.search_filtered(query, limit, collections).await)
    }

    async fn search_filtered(
        &self,
        query: &str,
        limit: usize,
        scope: &[&str],
    ) -> SearchOutcome {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return SearchOutcome::empty(Vec::new());
        }

        let rerank = self.config.use_reranker && self.reranker.is_some();
        let fetch = if rerank {
            limit.saturating_mul(self.config.overfetch_factor.max(1))
        } else {
            limit
        };
        let mut degradations = Vec::new();
        let mut embedding_failed = false;

        let query_vector = match self.embed_guard.run(self.embedder.embed(query)).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                embedding_failed = true;
                degradations.push(Degradation::embedding(&e));
                None
            }
        };

        let mut tier = RetrievalTier::None;
        let mut candidates = Vec::new();

        if let (Some(store), Some(vector)) = (&self.vector_store, &query_vector) {
            match self.vector_candidates(store.as_ref(), vector, fetch, scope).await {
                Ok(found) if !found.is_empty() => {
                    tier = RetrievalTier::VectorStore;
                    candidates = found;
                }
                Ok(_) => {}
                Err(e) => degradations.push(Degradation::retrieval(&e)),
            }
        }

        if candidates.is_empty() {
            if let Some(vector) = &query_vector {
                if let Err(e) = self.backfill_vectors().await {
                    embedding_failed = true;
                    degradations.push(Degradation::embedding(&e));
                }
                let found = self.embedding_candidates(vector, fetch, scope).await;
                if !found.is_empty() {
                    tier = RetrievalTier::Embedding;
                    candidates = found;
                }
            }
        }

        // Keyword scoring stands in for an unavailable embedder, not for an
        // embedder that found nothing similar.
        if candidates.is_empty() && embedding_failed {
            candidates = self.keyword_candidates(query, fetch, scope).await;
            if !candidates.is_empty() {
                tier = RetrievalTier::Keyword;
            }
        }

        if rerank && candidates.len() > limit {
            if let Some(reranker) = &self.reranker {
                candidates = rerank_candidates(reranker, query, candidates, limit, &mut degradations).await;
            }
        }
        candidates.truncate(limit);

        let (text, documents) = render(candidates, self.config.max_context_chars);
        tracing::debug!(
            tier = ?tier,
            results = documents.len(),
            chars = text.chars().count(),
            degraded = !degradations.is_empty(),
            "knowledge search"
        );

        SearchOutcome {
            text,
            tier,
            documents,
            degradations,
        }
    }

    async fn vector_candidates(
        &self,
        store: &dyn VectorStore,
        vector: &[f32],
        fetch: usize,
        scope: &[&str],
    ) -> DomainResult<Vec<Candidate>> {
        // Filtering happens after the query, so scan everything when filtering.
        let n = if scope.is_empty() {
            fetch
        } else {
            store.count().await?
        };
        let matches = store.query(vector, n).await?;

        Ok(matches
            .into_iter()
            .filter(|m| {
                in_scope(
                    m.metadata.get("collection").and_then(serde_json::Value::as_str),
                    scope,
                )
            })
            .take(fetch)
            .map(|m| Candidate {
                source: m
                    .metadata
                    .get("source")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                score: 1.0 - m.distance,
                text: m.document,
                metadata: m.metadata,
            })
            .collect())
    }

    /// Embed active entries that have no cached vector, newest first, one
    /// guarded call per chunk. Stops at the first failed chunk; vectors from
    /// earlier chunks stay cached for later searches.
    async fn backfill_vectors(&self) -> DomainResult<()> {
        let missing: Vec<(String, String)> = {
            let active = self.active.read().await;
            active
                .iter()
                .rev()
                .filter(|a| a.vector.is_none())
                .map(|a| (a.entry.id.clone(), a.entry.text.clone()))
                .collect()
        };

        for chunk in missing.chunks(BACKFILL_CHUNK) {
            let texts: Vec<String> = chunk.iter().map(|(_, text)| text.clone()).collect();
            let vectors = self.embed_guard.run(self.embedder.embed_batch(&texts)).await?;
            let mut by_id: HashMap<&str, Vec<f32>> = chunk
                .iter()
                .map(|(id, _)| id.as_str())
                .zip(vectors)
                .collect();

            let mut active = self.active.write().await;
            for slot in active.iter_mut().filter(|a| a.vector.is_none()) {
                if let Some(vector) = by_id.remove(slot.entry.id.as_str()) {
                    slot.vector = Some(vector);
                }
            }
            tracing::debug!(embedded = chunk.len(), "active view vectors backfilled");
        }
        Ok(())
    }

    /// Cosine ranking over active entries that have a cached vector.
    async fn embedding_candidates(
        &self,
        query_vector: &[f32],
        fetch: usize,
        scope: &[&str],
    ) -> Vec<Candidate> {
        let active = self.active.read().await;
        let mut scored: Vec<Candidate> = active
            .iter()
            .rev()
            .filter(|a| in_scope(a.entry.collection(), scope))
            .filter_map(|a| {
                let score = cosine_similarity(query_vector, a.vector.as_deref()?);
                (score > 0.0).then(|| Candidate {
                    text: a.entry.text.clone(),
                    source: a.entry.source.clone(),
                    score,
                    metadata: a.entry.metadata.clone(),
                })
            })
            .collect();
        // Stable sort over newest-first order: ties favour recent entries.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(fetch);
        scored
    }

    /// Share of query words that appear in each entry.
    async fn keyword_candidates(
        &self,
        query: &str,
        fetch: usize,
        scope: &[&str],
    ) -> Vec<Candidate> {
        let query_words = token_set(query);
        if query_words.is_empty() {
            return Vec::new();
        }

        let active = self.active.read().await;
        let mut scored: Vec<Candidate> = active
            .iter()
            .rev()
            .filter(|a| in_scope(a.entry.collection(), scope))
            .filter_map(|a| {
                let overlap = token_set(&a.entry.text).intersection(&query_words).count();
                (overlap > 0).then(|| Candidate {
                    text: a.entry.text.clone(),
                    source: a.entry.source.clone(),
                    score: overlap as f32 / query_words.len() as f32,
                    metadata: a.entry.metadata.clone(),
                })
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(fetch);
        scored
    }
}

fn validate_collection(collection: &str) -> DomainResult<()> {
    if Domain::known_collections().contains(&collection) {
        Ok(())
    } else {
        Err(DomainError::UnknownCollection(collection.to_string()))
    }
}

fn in_scope(collection: Option<&str>, scope: &[&str]) -> bool {
    scope.is_empty() || collection.is_some_and(|c| scope.contains(&c))
}

async fn rerank_candidates(
    reranker: &HybridReranker,
    query: &str,
    candidates: Vec<Candidate>,
    limit: usize,
    degradations: &mut Vec<Degradation>,
) -> Vec<Candidate> {
    let documents: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
    let metadatas: Vec<serde_json::Value> = candidates.iter().map(|c| c.metadata.clone()).collect();
    let outcome = reranker.rerank(query, &documents, limit, Some(&metadatas)).await;
    degradations.extend(outcome.degradations);

    let mut slots: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();
    outcome
        .results
        .into_iter()
        .filter_map(|ranked| {
            let mut candidate = slots.get_mut(ranked.original_index)?.take()?;
            candidate.score = ranked.score;
            Some(candidate)
        })
        .collect()
}

/// Concatenate whole candidates until the running length passes
/// `max_chars`. The candidate that crosses the budget is kept.
fn render(candidates: Vec<Candidate>, max_chars: usize) -> (String, Vec<RetrievedDocument>) {
    let mut text = String::new();
    let mut used = 0;
    let mut documents = Vec::new();

    for (i, candidate) in candidates.into_iter().enumerate() {
        if used > max_chars {
            break;
        }
        let block = if candidate.source.is_empty() {
            format!("[{}] {}", i + 1, candidate.text)
        } else {
            format!("[{}] ({}) {}", i + 1, candidate.source, candidate.text)
        };
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        used += block.chars().count();
        text.push_str(&block);
        documents.push(RetrievedDocument {
            text: candidate.text,
            source: candidate.source,
            score: candidate.score,
        });
    }

    (text, documents)
}
