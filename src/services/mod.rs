//! Pipeline components.
//!
//! Classification and assembly are pure. Retrieval, reranking, the graph
//! and telemetry talk to downstream services through the domain ports and
//! degrade instead of failing when those services misbehave.

pub mod call_guard;
pub mod domain_detector;
pub mod knowledge_graph;
pub mod knowledge_store;
pub mod message_assembler;
pub mod pipeline;
pub mod reranker;
pub mod task_log;
pub mod task_planner;
pub mod training_analyzer;

pub use call_guard::CallGuard;
pub use domain_detector::{DomainDetector, DomainMatch};
pub use knowledge_graph::KnowledgeGraph;
pub use knowledge_store::KnowledgeStore;
pub use message_assembler::{MessageAssembler, CONTEXT_MARKER, SCAFFOLD_MARKER};
pub use pipeline::{Pipeline, PreparedRequest};
pub use reranker::HybridReranker;
pub use task_log::TaskLog;
pub use task_planner::TaskPlanner;
pub use training_analyzer::TrainingAnalyzer;
