//! End-to-end request scenarios through a fully wired pipeline.

mod common;

use std::sync::Arc;

use common::{
    config_in, docs, extraction_and_score, open_pipeline, open_pipeline_with, setup_test_logging,
    temp_dir, OfflineEmbedder,
};
use serde_json::json;
use switchyard::adapters::embeddings::HashEmbeddingProvider;
use switchyard::adapters::generation::ScriptedGenerator;
use switchyard::domain::models::RetrievalTier;
use switchyard::services::{CONTEXT_MARKER, SCAFFOLD_MARKER};
use switchyard::{ChatMessage, Degradation, Domain, DomainError, Pipeline, Role, TaskLevel};

const GRAPH_REPLY: &str = r#"{
    "entities": [
        {"name": "鋼筋", "type": "material"},
        {"name": "混凝土", "type": "material"},
        {"name": "保護層", "type": "specification"}
    ],
    "relations": [
        {"source": "鋼筋", "target": "混凝土", "relation": "embedded_in"},
        {"source": "混凝土", "target": "保護層", "relation": "requires"}
    ]
}"#;

#[tokio::test]
async fn test_greeting_skips_retrieval() {
    setup_test_logging();
    let dir = temp_dir();
    let pipeline = open_pipeline(&dir, ScriptedGenerator::unavailable()).await;

    let prepared = pipeline.prepare(&[ChatMessage::user("你好")]).await;

    assert_eq!(prepared.plan.level(), TaskLevel::Greeting);
    assert_eq!(prepared.plan.rag_query(), "");
    assert_eq!(prepared.plan.primary_model(), pipeline.config().models.light);
    assert!(prepared.context.is_empty());
    assert!(prepared.degradations.is_empty());
    assert_eq!(prepared.messages.len(), 2);
    assert_eq!(prepared.messages[0].role, Role::System);
    assert!(!prepared
        .messages
        .iter()
        .any(|m| m.content.contains(SCAFFOLD_MARKER)));
}

#[tokio::test]
async fn test_long_construction_report_is_complex_or_expert() {
    let dir = temp_dir();
    let pipeline = open_pipeline(&dir, ScriptedGenerator::unavailable()).await;

    let text = format!(
        "請針對這棟建築的鋼筋配置進行分析並撰寫報告。{}",
        "細節說明".repeat(80)
    );
    assert!(text.chars().count() > 300);

    let prepared = pipeline.prepare(&[ChatMessage::user(text.clone())]).await;
    let plan = &prepared.plan;

    assert_eq!(plan.domain(), Domain::Construction);
    assert!(matches!(plan.level(), TaskLevel::Complex | TaskLevel::Expert));
    assert!(plan.quality_gate());
    assert!(plan.thinking());
    assert_eq!(plan.rag_query(), text);

    let scaffold = prepared
        .messages
        .iter()
        .find(|m| m.content.contains(SCAFFOLD_MARKER))
        .expect("scaffold message");
    assert!(scaffold.content.contains("units"));
}

#[tokio::test]
async fn test_ingested_knowledge_reaches_prompt() {
    let dir = temp_dir();
    let pipeline = open_pipeline(&dir, extraction_and_score(GRAPH_REPLY, "7")).await;

    pipeline
        .ingest("鋼筋混凝土梁的保護層厚度至少 4 公分", "spec-book", json!({}))
        .await
        .unwrap();
    let update = pipeline
        .graph_add("鋼筋埋設於混凝土中,混凝土需要保護層。", "spec-book")
        .await
        .unwrap();
    assert_eq!(update.nodes_added, 3);
    assert_eq!(update.edges_added, 2);

    let question = "鋼筋和混凝土的保護層厚度要多少?";
    let prepared = pipeline.prepare(&[ChatMessage::user(question)]).await;

    assert_eq!(prepared.plan.level(), TaskLevel::Domain);
    assert_eq!(prepared.plan.domain(), Domain::Construction);
    assert!(prepared.context.contains("(spec-book) 鋼筋混凝土梁"));
    assert!(prepared.context.contains("Related entities:"));
    assert!(prepared.context.contains("- 鋼筋 (material): embedded_in 混凝土"));
    assert!(prepared.degradations.is_empty());

    let context_message = prepared
        .messages
        .iter()
        .find(|m| m.content.starts_with(CONTEXT_MARKER))
        .expect("context message");
    assert_eq!(context_message.role, Role::System);
    assert_eq!(prepared.messages.last().unwrap().content, question);
}

#[tokio::test]
async fn test_domain_collections_are_searched_first() {
    let dir = temp_dir();
    let pipeline = open_pipeline(&dir, ScriptedGenerator::unavailable()).await;

    pipeline
        .ingest("鋼筋保護層厚度規範", "spec-book", json!({"collection": "construction_specs"}))
        .await
        .unwrap();
    pipeline
        .ingest("鋼筋和混凝土的保護層厚度爭議判決", "court", json!({"collection": "legal_cases"}))
        .await
        .unwrap();

    let prepared = pipeline
        .prepare(&[ChatMessage::user("鋼筋和混凝土的保護層厚度要多少?")])
        .await;
    assert_eq!(prepared.plan.domain(), Domain::Construction);
    assert!(prepared.context.contains("(spec-book)"));
    assert!(!prepared.context.contains("(court)"));
}

#[tokio::test]
async fn test_empty_domain_collections_widen_to_all_knowledge() {
    let dir = temp_dir();
    let pipeline = open_pipeline(&dir, ScriptedGenerator::unavailable()).await;

    pipeline
        .ingest("鋼筋保護層厚度至少四公分", "notes", json!({}))
        .await
        .unwrap();

    let prepared = pipeline
        .prepare(&[ChatMessage::user("鋼筋和混凝土的保護層厚度要多少?")])
        .await;
    assert_eq!(prepared.plan.domain(), Domain::Construction);
    assert!(prepared.context.contains("(notes) 鋼筋保護層厚度"));
}

#[tokio::test]
async fn test_embedding_outage_degrades_to_keyword_and_neutral_scores() {
    let dir = temp_dir();
    let pipeline =
        open_pipeline_with(&dir, ScriptedGenerator::unavailable(), Arc::new(OfflineEmbedder)).await;

    let ingest = pipeline
        .ingest("concrete cover for rebar", "handbook", json!(null))
        .await
        .unwrap();
    assert!(!ingest.indexed);
    assert!(!ingest.degradations.is_empty());

    let search = pipeline.search("rebar cover", 3).await;
    assert_eq!(search.tier, RetrievalTier::Keyword);
    assert_eq!(search.documents.len(), 1);
    assert!(search.is_degraded());

    let documents = docs(&["alpha", "beta", "gamma", "delta"]);
    let outcome = pipeline.rerank("anything", &documents, 2, None).await;

    assert!(!outcome.coarse_stage_applied);
    assert_eq!(outcome.original_indices(), vec![0, 1]);
    assert!(outcome.results.iter().all(|r| (r.score - 5.0).abs() < f32::EPSILON));
    assert!(outcome
        .degradations
        .iter()
        .any(|d| matches!(d, Degradation::EmbeddingUnavailable { .. })));
    assert!(outcome
        .degradations
        .iter()
        .any(|d| matches!(d, Degradation::GenerationUnavailable { .. })));
}

#[tokio::test]
async fn test_generator_outage_leaves_graph_untouched() {
    let dir = temp_dir();
    let pipeline = open_pipeline(&dir, ScriptedGenerator::unavailable()).await;

    let update = pipeline.graph_add("Tower A uses rebar", "site").await.unwrap();

    assert!(!update.changed());
    assert_eq!(update.degradations.len(), 1);
    assert_eq!(pipeline.graph_stats().await.nodes, 0);
}

#[tokio::test]
async fn test_caller_errors_surface() {
    let dir = temp_dir();
    let pipeline = open_pipeline(&dir, ScriptedGenerator::unavailable()).await;

    let err = pipeline
        .search_collection("astrology", "stars", 3)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::UnknownCollection(_)));
    assert!(err.is_caller_error());

    let err = pipeline.ingest("   ", "cli", json!({})).await.unwrap_err();
    assert!(matches!(err, DomainError::ValidationFailed(_)));
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = temp_dir();
    {
        let pipeline = open_pipeline(&dir, extraction_and_score(GRAPH_REPLY, "6")).await;
        pipeline
            .ingest(
                "rebar lap length is 40 bar diameters",
                "handbook",
                json!({"collection": "construction_specs"}),
            )
            .await
            .unwrap();
        pipeline.graph_add("rebar in concrete", "handbook").await.unwrap();

        let plan = pipeline.plan(&[ChatMessage::user("鋼筋和混凝土的搭接長度")]);
        assert!(pipeline
            .log_task(&plan, "鋼筋和混凝土的搭接長度", "40d", "qwen2.5:14b", 1200)
            .await
            .unwrap());

        pipeline.shutdown().await.unwrap();
    }

    let pipeline = Pipeline::open(
        config_in(&dir),
        Arc::new(ScriptedGenerator::unavailable()),
        Arc::new(HashEmbeddingProvider::default()),
        None,
    )
    .await
    .unwrap();

    let found = pipeline
        .search_collection("construction_specs", "rebar lap length", 3)
        .await
        .unwrap();
    assert_eq!(found.documents.len(), 1);
    assert_eq!(found.documents[0].source, "handbook");

    let stats = pipeline.graph_stats().await;
    assert_eq!(stats.nodes, 3);
    assert_eq!(stats.edges, 2);

    let report = pipeline.analyze().await.unwrap();
    assert_eq!(report.total_calls, 1);
    assert_eq!(report.domains[0].domain, "construction");
    assert!(report.suggestions.is_empty());
}

#[tokio::test]
async fn test_quick_request_is_not_logged() {
    let dir = temp_dir();
    let pipeline = open_pipeline(&dir, ScriptedGenerator::unavailable()).await;

    let plan = pipeline.plan(&[ChatMessage::user("translate cat")]);
    assert_eq!(plan.level(), TaskLevel::Quick);
    assert!(!pipeline
        .log_task(&plan, "translate cat", "貓", "qwen2.5:3b", 80)
        .await
        .unwrap());
    assert_eq!(pipeline.analyze().await.unwrap().total_calls, 0);
}
