//! Two-stage hybrid reranking.
//!
//! Stage 1 (coarse) keeps the `coarse_multiplier * top_k` documents closest
//! to the query by embedding cosine similarity. Stage 2 (fine) asks the
//! utility model for a 0-10 relevance score per survivor. Stage 1 is
//! skipped when there are no more documents than `top_k`, and bypassed when
//! embeddings are unavailable. A score that cannot be obtained or parsed
//! becomes the neutral score, so ranking degrades instead of failing.

use std::sync::{Arc, LazyLock};

use futures::future::join_all;
use regex::Regex;

use crate::domain::models::{
    cosine_similarity, Degradation, RerankCandidate, RerankOutcome, RerankerConfig,
};
use crate::domain::ports::{EmbeddingProvider, GenerationOptions, TextGenerator};
use crate::domain::text::truncate_chars;
use crate::services::call_guard::CallGuard;

static SCORE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").unwrap());

/// Raw replies longer than this are cut in degradation records.
const RAW_REPLY_CHARS: usize = 80;

/// Parse the first number in a model reply and clamp it to 0-10.
pub fn parse_score(reply: &str) -> Option<f32> {
    SCORE_PATTERN
        .find(reply)
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .filter(|score| score.is_finite())
        .map(|score| score.clamp(0.0, 10.0))
}

pub struct HybridReranker {
    config: RerankerConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn TextGenerator>,
    embed_guard: CallGuard,
    llm_guard: CallGuard,
    scoring_model: Option<String>,
}

impl HybridReranker {
    pub fn new(
        config: RerankerConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn TextGenerator>,
        embed_guard: CallGuard,
        llm_guard: CallGuard,
    ) -> Self {
        Self {
            config,
            embedder,
            generator,
            embed_guard,
            llm_guard,
            scoring_model: None,
        }
    }

    /// Score with a specific model instead of the generator default.
    #[must_use]
    pub fn with_scoring_model(mut self, model: impl Into<String>) -> Self {
        self.scoring_model = Some(model.into());
        self
    }

    /// Rank `documents` for `query` and keep at most `top_k`.
    ///
    /// Each result's `original_index` points into `documents`. Results are
    /// sorted by score descending; equal scores keep input order.
    pub async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_k: usize,
        metadatas: Option<&[serde_json::Value]>,
    ) -> RerankOutcome {
        let mut outcome = RerankOutcome::default();
        if documents.is_empty() || top_k == 0 {
            return outcome;
        }

        let candidates: Vec<RerankCandidate> = documents
            .iter()
            .enumerate()
            .map(|(index, document)| RerankCandidate {
                document: document.clone(),
                score: 0.0,
                metadata: metadatas.and_then(|m| m.get(index)).cloned(),
                original_index: index,
            })
            .collect();

        let survivors = if documents.len() > top_k {
            let keep = top_k.saturating_mul(self.config.coarse_multiplier.max(1));
            match self.coarse_stage(query, candidates.clone(), keep).await {
                Ok(kept) => {
                    outcome.coarse_stage_applied = true;
                    kept
                }
                Err(degradation) => {
                    tracing::warn!(?degradation, "coarse rerank stage unavailable; scoring all documents");
                    outcome.degradations.push(degradation);
                    candidates
                }
            }
        } else {
            candidates
        };

        let mut scored = self.fine_stage(query, survivors, &mut outcome.degradations).await;
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.original_index.cmp(&b.original_index))
        });
        scored.truncate(top_k);

        tracing::debug!(
            documents = documents.len(),
            top_k,
            returned = scored.len(),
            coarse = outcome.coarse_stage_applied,
            degradations = outcome.degradations.len(),
            "reranked"
        );
        outcome.results = scored;
        outcome
    }

    async fn coarse_stage(
        &self,
        query: &str,
        candidates: Vec<RerankCandidate>,
        keep: usize,
    ) -> Result<Vec<RerankCandidate>, Degradation> {
        let mut texts = Vec::with_capacity(candidates.len() + 1);
        texts.push(query.to_string());
        texts.extend(candidates.iter().map(|c| c.document.clone()));

        let vectors = self
            .embed_guard
            .run(self.embedder.embed_batch(&texts))
            .await
            .map_err(|e| Degradation::embedding(&e))?;
        if vectors.len() != texts.len() {
            return Err(Degradation::EmbeddingUnavailable {
                reason: format!("expected {} vectors, got {}", texts.len(), vectors.len()),
            });
        }

        let query_vector = &vectors[0];
        let mut ranked: Vec<(f32, RerankCandidate)> = candidates
            .into_iter()
            .zip(&vectors[1..])
            .map(|(candidate, vector)| (cosine_similarity(query_vector, vector), candidate))
            .collect();
        ranked.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then(a.1.original_index.cmp(&b.1.original_index))
        });
        ranked.truncate(keep);

        Ok(ranked.into_iter().map(|(_, candidate)| candidate).collect())
    }

    async fn fine_stage(
        &self,
        query: &str,
        candidates: Vec<RerankCandidate>,
        degradations: &mut Vec<Degradation>,
    ) -> Vec<RerankCandidate> {
        let scores = join_all(
            candidates
                .iter()
                .map(|c| self.score_one(query, &c.document, c.original_index)),
        )
        .await;

        candidates
            .into_iter()
            .zip(scores)
            .map(|(mut candidate, (score, degradation))| {
                candidate.score = score;
                degradations.extend(degradation);
                candidate
            })
            .collect()
    }

    async fn score_one(&self, query: &str, document: &str, index: usize) -> (f32, Option<Degradation>) {
        let prompt = format!(
            "Rate how relevant the document is to the query on a scale from 0 to 10.\n\
             Reply with a single number only.\n\n\
             Query: {query}\n\n\
             Document: {}\n\n\
             Score:",
            truncate_chars(document, self.config.document_chars)
        );
        let options = GenerationOptions {
            model: self.scoring_model.clone(),
            ..GenerationOptions::deterministic(self.config.scoring_max_tokens)
        };

        match self
            .llm_guard
            .run(self.generator.generate(&prompt, &options))
            .await
        {
            Ok(reply) => match parse_score(&reply) {
                Some(score) => (score, None),
                None => (
                    self.config.neutral_score,
                    Some(Degradation::ScoringParseFailure {
                        index,
                        raw: truncate_chars(reply.trim(), RAW_REPLY_CHARS),
                    }),
                ),
            },
            Err(e) => (
                self.config.neutral_score,
                Some(Degradation::generation("rerank_score", &e)),
            ),
        }
    }
}
