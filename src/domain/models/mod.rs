pub mod analysis;
pub mod config;
pub mod degradation;
pub mod domains;
pub mod graph;
pub mod knowledge;
pub mod message;
pub mod plan;
pub mod rerank;
pub mod task_log;
pub mod vector;

pub use analysis::{AnalysisReport, DomainStats, Suggestion, SuggestionPriority};
pub use config::{
    Config, EmbeddingBackend, EmbeddingConfig, GraphConfig, KnowledgeConfig, LlmConfig,
    LoggingConfig, ModelsConfig, PlannerConfig, RerankerConfig, TelemetryConfig,
};
pub use degradation::Degradation;
pub use domains::{Domain, DomainDefinition, ModelTier};
pub use graph::{
    EdgeAttrs, EntityHit, ExtractedEntity, ExtractedRelation, Extraction, ExtractionOutcome,
    GraphEdge, GraphNode, GraphSnapshot, GraphStats, GraphUpdate,
};
pub use knowledge::{IngestOutcome, KnowledgeEntry, RetrievalTier, RetrievedDocument, SearchOutcome};
pub use message::{conversation_chars, last_user_text, ChatMessage, Role};
pub use plan::{GateDecision, OutputFormat, TaskLevel, TaskPlan};
pub use rerank::{RerankCandidate, RerankOutcome};
pub use task_log::TaskLogEntry;
pub use vector::{cosine_similarity, VectorMatch, VectorRecord};
