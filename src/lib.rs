//! Switchyard - adaptive task routing and retrieval augmentation
//!
//! Switchyard sits in front of an LLM model-chain executor. For each request
//! it classifies the conversation into a cost tier, picks the model chain,
//! retrieves supporting knowledge, and assembles the final prompt. Completed
//! requests are logged and analyzed offline for specialization hints.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors, and the port traits
//! - **Adapter Layer** (`adapters`): embedding, generation, vector store, and sink implementations
//! - **Service Layer** (`services`): planner, assembler, retrieval, reranking, graph, telemetry
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use switchyard::adapters::embeddings::HashEmbeddingProvider;
//! use switchyard::adapters::generation::ScriptedGenerator;
//! use switchyard::{ChatMessage, Config, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = Pipeline::open(
//!         Config::default(),
//!         Arc::new(ScriptedGenerator::unavailable()),
//!         Arc::new(HashEmbeddingProvider::default()),
//!         None,
//!     )
//!     .await?;
//!     let prepared = pipeline.prepare(&[ChatMessage::user("你好")]).await;
//!     println!("{}", prepared.plan.level());
//!     pipeline.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    ChatMessage, Config, Degradation, Domain, GateDecision, ModelTier, Role, SearchOutcome,
    TaskLevel, TaskPlan,
};
pub use domain::ports::{AppendOnlySink, EmbeddingProvider, TextGenerator, VectorStore};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    DomainDetector, HybridReranker, KnowledgeGraph, KnowledgeStore, MessageAssembler, Pipeline,
    PreparedRequest, TaskPlanner, TrainingAnalyzer,
};
