//! Request pipeline context.
//!
//! One [`Pipeline`] is opened at process start and shared by reference
//! with every request handler. It owns the long-lived components and their
//! durable state; [`Pipeline::shutdown`] flushes that state.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::adapters::sinks::JsonlSink;
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AnalysisReport, ChatMessage, Config, Degradation, EntityHit, GraphStats, GraphUpdate,
    IngestOutcome, RerankOutcome, SearchOutcome, TaskPlan,
};
use crate::domain::ports::{EmbeddingProvider, TextGenerator, VectorStore};
use crate::services::call_guard::CallGuard;
use crate::services::knowledge_graph::KnowledgeGraph;
use crate::services::knowledge_store::KnowledgeStore;
use crate::services::message_assembler::MessageAssembler;
use crate::services::reranker::HybridReranker;
use crate::services::task_log::TaskLog;
use crate::services::task_planner::TaskPlanner;
use crate::services::training_analyzer::TrainingAnalyzer;

/// Knowledge results retrieved for one request.
const REQUEST_CONTEXT_RESULTS: usize = 5;

/// A planned request with its final prompt messages.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedRequest {
    pub plan: TaskPlan,
    pub messages: Vec<ChatMessage>,
    /// Retrieved context injected into `messages`; empty when the plan
    /// asked for no retrieval.
    pub context: String,
    pub degradations: Vec<Degradation>,
}

pub struct Pipeline {
    config: Config,
    planner: TaskPlanner,
    assembler: MessageAssembler,
    knowledge: KnowledgeStore,
    reranker: Arc<HybridReranker>,
    graph: KnowledgeGraph,
    task_log: Arc<TaskLog>,
    analyzer: TrainingAnalyzer,
}

impl Pipeline {
    /// Open every component against the storage paths in `config`.
    pub async fn open(
        config: Config,
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Option<Arc<dyn VectorStore>>,
    ) -> DomainResult<Self> {
        let llm_guard = CallGuard::from_secs(config.llm.max_concurrency, config.llm.timeout_secs);
        let embed_guard =
            CallGuard::from_secs(config.embedding.max_concurrency, config.embedding.timeout_secs);

        let task_log = Arc::new(TaskLog::new(
            Arc::new(JsonlSink::new(&config.telemetry.task_log_path)),
            config.telemetry.preview_chars,
        ));
        let planner = TaskPlanner::new(config.models.clone(), config.planner.clone())
            .with_task_log(Arc::clone(&task_log));

        let reranker = Arc::new(
            HybridReranker::new(
                config.reranker.clone(),
                Arc::clone(&embedder),
                Arc::clone(&generator),
                embed_guard.clone(),
                llm_guard.clone(),
            )
            .with_scoring_model(config.llm.utility_model.clone()),
        );

        let knowledge = KnowledgeStore::open(
            config.knowledge.clone(),
            Arc::new(JsonlSink::new(&config.knowledge.entries_path)),
            embedder,
            vector_store,
            embed_guard,
        )
        .await?
        .with_reranker(Arc::clone(&reranker));

        let graph = KnowledgeGraph::open(
            config.graph.clone(),
            Some(PathBuf::from(&config.graph.path)),
            generator,
            llm_guard,
        )
        .await?
        .with_extraction_model(config.llm.utility_model.clone());

        let analyzer = TrainingAnalyzer::new(Arc::clone(&task_log), config.telemetry.clone());

        tracing::info!(
            knowledge_entries = knowledge.len().await,
            "pipeline ready"
        );

        Ok(Self {
            config,
            planner,
            assembler: MessageAssembler::new(),
            knowledge,
            reranker,
            graph,
            task_log,
            analyzer,
        })
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub fn plan(&self, messages: &[ChatMessage]) -> TaskPlan {
        self.planner.plan(messages)
    }

    pub fn prepare_messages(
        &self,
        plan: &TaskPlan,
        messages: &[ChatMessage],
        rag_context: &str,
    ) -> Vec<ChatMessage> {
        self.assembler.prepare_messages(plan, messages, rag_context)
    }

    /// Plan a conversation, retrieve what the plan asks for, and assemble
    /// the prompt.
    pub async fn prepare(&self, messages: &[ChatMessage]) -> PreparedRequest {
        let plan = self.plan(messages);
        let (context, degradations) = if plan.needs_retrieval() {
            self.retrieve(&plan).await
        } else {
            (String::new(), Vec::new())
        };
        let messages = self.prepare_messages(&plan, messages, &context);

        PreparedRequest {
            plan,
            messages,
            context,
            degradations,
        }
    }

    async fn retrieve(&self, plan: &TaskPlan) -> (String, Vec<Degradation>) {
        let (knowledge, graph) = tokio::join!(
            self.scoped_search(plan),
            self.graph_context(plan.rag_query())
        );

        let mut sections = Vec::new();
        if !knowledge.text.is_empty() {
            sections.push(knowledge.text);
        }
        if !graph.is_empty() {
            sections.push(format!("Related entities:\n{graph}"));
        }
        (sections.join("\n\n"), knowledge.degradations)
    }

    /// Search the plan's collections, widening to all knowledge when they
    /// hold nothing relevant.
    async fn scoped_search(&self, plan: &TaskPlan) -> SearchOutcome {
        let query = plan.rag_query();
        let collections: Vec<&str> = plan.rag_collections().iter().map(String::as_str).collect();
        if !collections.is_empty() {
            match self
                .knowledge
                .search_collections(&collections, query, REQUEST_CONTEXT_RESULTS)
                .await
            {
                Ok(outcome) if !outcome.documents.is_empty() => return outcome,
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "plan collections rejected"),
            }
        }
        self.knowledge.search(query, REQUEST_CONTEXT_RESULTS).await
    }

    pub async fn search(&self, query: &str, limit: usize) -> SearchOutcome {
        self.knowledge.search(query, limit).await
    }

    pub async fn search_collection(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
    ) -> DomainResult<SearchOutcome> {
        self.knowledge.search_collection(collection, query, limit).await
    }

    pub async fn ingest(
        &self,
        text: &str,
        source: &str,
        metadata: serde_json::Value,
    ) -> DomainResult<IngestOutcome> {
        self.knowledge.add(text, source, metadata).await
    }

    pub async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_k: usize,
        metadatas: Option<&[serde_json::Value]>,
    ) -> RerankOutcome {
        self.reranker.rerank(query, documents, top_k, metadatas).await
    }

    pub async fn graph_add(&self, text: &str, source: &str) -> DomainResult<GraphUpdate> {
        self.graph.add_knowledge(text, source).await
    }

    /// Graph query with the configured hop limit.
    pub async fn graph_query(&self, query: &str, top_k: usize) -> Vec<EntityHit> {
        self.graph
            .query(query, self.config.graph.default_max_hops, top_k)
            .await
    }

    pub async fn graph_query_hops(&self, query: &str, max_hops: usize, top_k: usize) -> Vec<EntityHit> {
        self.graph.query(query, max_hops, top_k).await
    }

    pub async fn graph_context(&self, query: &str) -> String {
        self.graph
            .get_context(query, self.config.graph.max_context_chars)
            .await
    }

    pub async fn graph_stats(&self) -> GraphStats {
        self.graph.stats().await
    }

    pub async fn log_task(
        &self,
        plan: &TaskPlan,
        query: &str,
        response: &str,
        model_used: &str,
        duration_ms: u64,
    ) -> DomainResult<bool> {
        self.planner
            .log_task(plan, query, response, model_used, duration_ms)
            .await
    }

    pub async fn analyze(&self) -> DomainResult<AnalysisReport> {
        self.analyzer.analyze(Utc::now()).await
    }

    /// Flush durable state. Every component is flushed even if an earlier
    /// one fails; the first error is returned.
    pub async fn shutdown(&self) -> DomainResult<()> {
        let results = [
            self.graph.flush().await,
            self.knowledge.flush().await,
            self.task_log.flush().await,
        ];
        tracing::info!("pipeline shut down");
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::embeddings::HashEmbeddingProvider;
    use crate::adapters::generation::ScriptedGenerator;
    use crate::domain::models::{RetrievalTier, TaskLevel};
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.knowledge.entries_path = dir.path().join("knowledge.jsonl").display().to_string();
        config.graph.path = dir.path().join("graph.json").display().to_string();
        config.telemetry.task_log_path = dir.path().join("tasks.jsonl").display().to_string();
        config
    }

    async fn open(dir: &TempDir, generator: ScriptedGenerator) -> Pipeline {
        Pipeline::open(
            config_in(dir),
            Arc::new(generator),
            Arc::new(HashEmbeddingProvider::default()),
            None,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_greeting_skips_retrieval() {
        let dir = TempDir::new().unwrap();
        let pipeline = open(&dir, ScriptedGenerator::unavailable()).await;
        pipeline.ingest("hello world facts", "doc", serde_json::Value::Null).await.unwrap();

        let prepared = pipeline.prepare(&[ChatMessage::user("你好")]).await;
        assert_eq!(prepared.plan.level(), TaskLevel::Greeting);
        assert!(prepared.context.is_empty());
    }

    #[tokio::test]
    async fn test_domain_request_gets_knowledge_context() {
        let dir = TempDir::new().unwrap();
        let pipeline = open(&dir, ScriptedGenerator::unavailable()).await;
        pipeline
            .ingest("混凝土 養護 至少 七天", "規範", serde_json::Value::Null)
            .await
            .unwrap();

        let prepared = pipeline
            .prepare(&[ChatMessage::user("請問混凝土施工的養護要多久")])
            .await;
        assert!(prepared.plan.needs_retrieval());
        assert!(prepared.context.contains("養護"));
        assert!(prepared
            .messages
            .iter()
            .any(|m| m.content.contains("養護 至少 七天")));
    }

    #[tokio::test]
    async fn test_search_through_pipeline() {
        let dir = TempDir::new().unwrap();
        let pipeline = open(&dir, ScriptedGenerator::unavailable()).await;
        pipeline.ingest("scaffold inspection checklist", "site", serde_json::Value::Null).await.unwrap();

        let outcome = pipeline.search("scaffold inspection", 3).await;
        assert_eq!(outcome.tier, RetrievalTier::Embedding);
    }

    #[tokio::test]
    async fn test_log_task_then_analyze() {
        let dir = TempDir::new().unwrap();
        let pipeline = open(&dir, ScriptedGenerator::unavailable()).await;
        let plan = pipeline.plan(&[ChatMessage::user("請協助檢查混凝土澆置的施工規範")]);

        assert!(pipeline.log_task(&plan, "q", "r", plan.primary_model(), 900).await.unwrap());
        let report = pipeline.analyze().await.unwrap();
        assert_eq!(report.total_calls, 1);
    }

    #[tokio::test]
    async fn test_graph_round_trip_and_shutdown() {
        let dir = TempDir::new().unwrap();
        let reply = r#"{"entities":[{"name":"Tower Crane","type":"equipment"}],"relations":[]}"#;
        let pipeline = open(&dir, ScriptedGenerator::constant(reply)).await;

        let update = pipeline.graph_add("The tower crane is inspected weekly.", "log").await.unwrap();
        assert_eq!(update.nodes_added, 1);
        assert_eq!(pipeline.graph_query("tower crane", 5).await.len(), 1);
        assert!(pipeline.graph_context("tower crane").await.contains("Tower Crane"));

        pipeline.shutdown().await.unwrap();
        assert!(dir.path().join("graph.json").exists());
    }
}
