//! OpenAI-compatible chat completion adapter.
//!
//! Sends a single user message to `/chat/completions` and returns the first
//! choice's content. Used for entity extraction and relevance scoring.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::LlmConfig;
use crate::domain::ports::{GenerationOptions, TextGenerator};

/// Configuration for the chat generator.
#[derive(Debug, Clone)]
pub struct OpenAiChatConfig {
    /// API key (read from `OPENAI_API_KEY` if not set). Optional for local servers.
    pub api_key: Option<String>,
    /// API base URL, including the `/v1` suffix.
    pub base_url: String,
    /// Model used when the call does not override it.
    pub default_model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl From<&LlmConfig> for OpenAiChatConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            default_model: config.utility_model.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

impl OpenAiChatConfig {
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

/// Chat completion generator.
pub struct OpenAiChatGenerator {
    config: OpenAiChatConfig,
    client: Client,
}

impl OpenAiChatGenerator {
    pub fn new(config: OpenAiChatConfig) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::ExecutionFailed(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn build_request<'a>(&'a self, prompt: &'a str, options: &'a GenerationOptions) -> ChatRequest<'a> {
        ChatRequest {
            model: options
                .model
                .as_deref()
                .unwrap_or(&self.config.default_model),
            messages: vec![ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiChatGenerator {
    fn name(&self) -> &'static str {
        "openai-chat"
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> DomainResult<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = self.build_request(prompt, options);

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = self.config.get_api_key() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DomainError::Timeout(self.config.timeout_secs * 1000)
            } else {
                DomainError::Unavailable(format!("Chat API request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(DomainError::Unavailable(format!(
                "Chat API returned {status}: {text}"
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            DomainError::SerializationError(format!("Failed to parse chat response: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| DomainError::ExecutionFailed("Chat response had no content".to_string()))
    }
}

// -- API request/response types --

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> OpenAiChatGenerator {
        OpenAiChatGenerator::new(OpenAiChatConfig::from(&LlmConfig::default())).unwrap()
    }

    #[test]
    fn test_json_mode_sets_response_format() {
        let generator = generator();
        let options = GenerationOptions::structured(256);
        let body = serde_json::to_value(generator.build_request("extract", &options)).unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["model"], "qwen2.5:7b");
    }

    #[test]
    fn test_free_text_omits_response_format() {
        let generator = generator();
        let options = GenerationOptions {
            model: Some("qwen2.5:3b".to_string()),
            ..GenerationOptions::deterministic(8)
        };
        let body = serde_json::to_value(generator.build_request("score", &options)).unwrap();
        assert!(body.get("response_format").is_none());
        assert_eq!(body["model"], "qwen2.5:3b");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "score");
    }
}
