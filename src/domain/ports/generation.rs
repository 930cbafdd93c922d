//! Text generation port.
//!
//! The pipeline only needs single-prompt completions: entity extraction
//! (structured JSON) and relevance scoring. Conversation-level generation
//! belongs to the external model-chain executor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;

/// Parameters for a single generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model override; `None` uses the generator's default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature (0.0 - 1.0)
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Request a single JSON object as output.
    #[serde(default)]
    pub json_mode: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.7,
            max_tokens: Some(1024),
            json_mode: false,
        }
    }
}

impl GenerationOptions {
    /// Deterministic decoding with JSON output.
    pub fn structured(max_tokens: u32) -> Self {
        Self {
            model: None,
            temperature: 0.0,
            max_tokens: Some(max_tokens),
            json_mode: true,
        }
    }

    /// Deterministic decoding with free-text output.
    pub fn deterministic(max_tokens: u32) -> Self {
        Self {
            model: None,
            temperature: 0.0,
            max_tokens: Some(max_tokens),
            json_mode: false,
        }
    }
}

/// Trait for text generation backends.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generator name for diagnostics.
    fn name(&self) -> &'static str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> DomainResult<String>;
}
