use serde::{Deserialize, Serialize};

use super::domains::ModelTier;

/// Main configuration structure for switchyard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Model ids per tier
    #[serde(default)]
    pub models: ModelsConfig,

    /// Classification thresholds
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Knowledge store configuration
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Hybrid reranker configuration
    #[serde(default)]
    pub reranker: RerankerConfig,

    /// Knowledge graph configuration
    #[serde(default)]
    pub graph: GraphConfig,

    /// Text generation service
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding service
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Routing telemetry and analysis
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Concrete model ids for each tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub light: String,
    pub standard: String,
    pub heavy: String,
    pub expert: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            light: "qwen2.5:3b".to_string(),
            standard: "qwen2.5:14b".to_string(),
            heavy: "qwen2.5:32b".to_string(),
            expert: "deepseek-r1:70b".to_string(),
        }
    }
}

impl ModelsConfig {
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Light => &self.light,
            ModelTier::Standard => &self.standard,
            ModelTier::Heavy => &self.heavy,
            ModelTier::Expert => &self.expert,
        }
    }

    /// Model chain for the given tiers, first-to-last, without duplicates.
    pub fn chain(&self, tiers: &[ModelTier]) -> Vec<String> {
        let mut chain: Vec<String> = Vec::with_capacity(tiers.len());
        for tier in tiers {
            let model = self.model_for(*tier);
            if !model.is_empty() && !chain.iter().any(|m| m == model) {
                chain.push(model.to_string());
            }
        }
        if chain.is_empty() {
            chain.push(self.standard.clone());
        }
        chain
    }
}

/// Thresholds used by the task planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Messages longer than this (in characters) are complex
    pub long_message_chars: usize,
    /// Conversations longer than this (in characters) are complex
    pub long_conversation_chars: usize,
    /// Messages shorter than this (in characters) are quick
    pub short_message_chars: usize,
    /// Minimum detector confidence for a domain plan
    pub domain_confidence: f32,
    /// Quality gate minimum for expert plans
    pub expert_min_score: f32,
    /// Quality gate minimum for complex plans
    pub complex_min_score: f32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            long_message_chars: 300,
            long_conversation_chars: 2000,
            short_message_chars: 50,
            domain_confidence: 0.3,
            expert_min_score: 7.0,
            complex_min_score: 6.5,
        }
    }
}

/// Knowledge store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Append-only JSONL log of ingested entries
    pub entries_path: String,
    /// JSONL file backing the local vector store; unset disables it
    pub vector_path: Option<String>,
    /// Size of the in-memory active view
    pub max_entries: usize,
    /// Entry text is truncated to this many characters
    pub max_entry_chars: usize,
    /// Character budget of the rendered search block
    pub max_context_chars: usize,
    /// Over-fetch multiplier applied before reranking
    pub overfetch_factor: usize,
    /// Whether to rerank over-fetched results
    pub use_reranker: bool,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            entries_path: ".switchyard/knowledge.jsonl".to_string(),
            vector_path: Some(".switchyard/vectors.jsonl".to_string()),
            max_entries: 500,
            max_entry_chars: 2000,
            max_context_chars: 3000,
            overfetch_factor: 3,
            use_reranker: true,
        }
    }
}

/// Hybrid reranker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    /// Coarse stage keeps `coarse_multiplier * top_k` candidates
    pub coarse_multiplier: usize,
    /// Score assigned when the fine stage cannot produce one
    pub neutral_score: f32,
    /// Documents are truncated to this many characters in scoring prompts
    pub document_chars: usize,
    /// Token limit for the scoring call
    pub scoring_max_tokens: u32,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            coarse_multiplier: 2,
            neutral_score: 5.0,
            document_chars: 1500,
            scoring_max_tokens: 8,
        }
    }
}

/// Knowledge graph configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// JSON file the graph is persisted to
    pub path: String,
    pub default_max_hops: usize,
    pub default_top_k: usize,
    /// Character budget of the rendered graph context
    pub max_context_chars: usize,
    /// Token limit for the extraction call
    pub extraction_max_tokens: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            path: ".switchyard/graph.json".to_string(),
            default_max_hops: 2,
            default_top_k: 10,
            max_context_chars: 2000,
            extraction_max_tokens: 1024,
        }
    }
}

/// OpenAI-compatible text generation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    /// Falls back to `OPENAI_API_KEY`; local servers usually need none
    pub api_key: Option<String>,
    /// Model used for extraction and relevance scoring
    pub utility_model: String,
    pub timeout_secs: u64,
    /// Maximum in-flight generation calls
    pub max_concurrency: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            api_key: None,
            utility_model: "qwen2.5:7b".to_string(),
            timeout_secs: 30,
            max_concurrency: 4,
        }
    }
}

/// Embedding provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `/embeddings` endpoint
    OpenAi,
    /// Offline feature hashing
    Hashing,
    /// No embeddings; retrieval uses keyword overlap
    None,
}

/// Embedding service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
    /// Maximum in-flight embedding calls
    pub max_concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Hashing,
            base_url: "http://localhost:11434/v1".to_string(),
            api_key: None,
            model: "nomic-embed-text".to_string(),
            dimension: 768,
            timeout_secs: 10,
            max_concurrency: 4,
        }
    }
}

/// Task log and analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub task_log_path: String,
    /// Query/response previews are cut to this many characters
    pub preview_chars: usize,
    pub analysis_window_days: u32,
    pub fine_tune_min_calls: usize,
    pub fine_tune_high_priority_calls: usize,
    pub slow_avg_duration_ms: f64,
    pub slow_min_calls: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            task_log_path: ".switchyard/task_log.jsonl".to_string(),
            preview_chars: 200,
            analysis_window_days: 30,
            fine_tune_min_calls: 50,
            fine_tune_high_priority_calls: 100,
            slow_avg_duration_ms: 5000.0,
            slow_min_calls: 20,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: json or pretty
    pub format: String,
    /// Directory for rolling JSON log files
    pub log_dir: Option<String>,
    /// Rotation: daily, hourly, never
    pub rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            log_dir: None,
            rotation: "daily".to_string(),
        }
    }
}

impl Config {
    /// Default configuration rendered as YAML.
    pub fn sample_yaml() -> String {
        serde_yaml::to_string(&Self::default()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_deduplicates_in_order() {
        let models = ModelsConfig {
            light: "small".to_string(),
            standard: "small".to_string(),
            heavy: "large".to_string(),
            expert: "huge".to_string(),
        };
        assert_eq!(
            models.chain(&[ModelTier::Heavy, ModelTier::Standard, ModelTier::Light]),
            vec!["large".to_string(), "small".to_string()]
        );
    }

    #[test]
    fn test_chain_is_never_empty() {
        let models = ModelsConfig::default();
        assert_eq!(models.chain(&[]), vec![models.standard.clone()]);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "planner:\n  long_message_chars: 500\nembedding:\n  backend: none\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.planner.long_message_chars, 500);
        assert_eq!(config.planner.short_message_chars, 50);
        assert_eq!(config.embedding.backend, EmbeddingBackend::None);
        assert_eq!(config.knowledge.max_entries, 500);
    }

    #[test]
    fn test_sample_yaml_round_trips() {
        let yaml = Config::sample_yaml();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
