//! HTTP contract tests for the OpenAI-compatible adapters.

use mockito::{Matcher, Server};
use serde_json::json;
use switchyard::adapters::embeddings::{OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
use switchyard::adapters::generation::{OpenAiChatConfig, OpenAiChatGenerator};
use switchyard::domain::ports::GenerationOptions;
use switchyard::{DomainError, EmbeddingProvider, TextGenerator};

fn embedding_config(url: String) -> OpenAiEmbeddingConfig {
    OpenAiEmbeddingConfig {
        api_key: Some("test-key".to_string()),
        base_url: url,
        model: "nomic-embed-text".to_string(),
        dimension: 3,
        timeout_secs: 5,
        max_batch_size: 16,
    }
}

fn chat_config(url: String) -> OpenAiChatConfig {
    OpenAiChatConfig {
        api_key: Some("test-key".to_string()),
        base_url: url,
        default_model: "qwen2.5:7b".to_string(),
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn test_embed_batch_restores_input_order() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/embeddings")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "nomic-embed-text",
            "input": ["first", "second"]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "data": [
                    {"embedding": [0.0, 1.0, 0.0], "index": 1},
                    {"embedding": [1.0, 0.0, 0.0], "index": 0}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let provider = OpenAiEmbeddingProvider::new(embedding_config(server.url())).unwrap();
    let vectors = provider
        .embed_batch(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
}

#[tokio::test]
async fn test_embed_batch_splits_large_inputs() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": [{"embedding": [0.5, 0.5, 0.0], "index": 0}]}).to_string())
        .expect(3)
        .create_async()
        .await;

    let mut config = embedding_config(server.url());
    config.max_batch_size = 1;
    let provider = OpenAiEmbeddingProvider::new(config).unwrap();

    let texts: Vec<String> = ["a", "b", "c"].iter().map(ToString::to_string).collect();
    let vectors = provider.embed_batch(&texts).await.unwrap();

    mock.assert_async().await;
    assert_eq!(vectors.len(), 3);
}

#[tokio::test]
async fn test_embed_server_error_is_unavailable() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/embeddings")
        .with_status(503)
        .with_body("model loading")
        .create_async()
        .await;

    let provider = OpenAiEmbeddingProvider::new(embedding_config(server.url())).unwrap();
    let err = provider.embed("hello").await.unwrap_err();

    match err {
        DomainError::Unavailable(message) => assert!(message.contains("503")),
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_embed_malformed_body_is_serialization_error() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"vectors": []}"#)
        .create_async()
        .await;

    let provider = OpenAiEmbeddingProvider::new(embedding_config(server.url())).unwrap();
    let err = provider.embed("hello").await.unwrap_err();
    assert!(matches!(err, DomainError::SerializationError(_)));
}

#[tokio::test]
async fn test_chat_structured_request_shape() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "extractor",
            "messages": [{"role": "user", "content": "Extract this"}],
            "temperature": 0.0,
            "max_tokens": 256,
            "response_format": {"type": "json_object"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"entities\": []}"}}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let generator = OpenAiChatGenerator::new(chat_config(server.url())).unwrap();
    let options = GenerationOptions {
        model: Some("extractor".to_string()),
        ..GenerationOptions::structured(256)
    };
    let reply = generator.generate("Extract this", &options).await.unwrap();

    mock.assert_async().await;
    assert_eq!(reply, "{\"entities\": []}");
}

#[tokio::test]
async fn test_chat_uses_default_model() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({"model": "qwen2.5:7b"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"choices": [{"message": {"content": "8"}}]}).to_string())
        .create_async()
        .await;

    let generator = OpenAiChatGenerator::new(chat_config(server.url())).unwrap();
    let reply = generator
        .generate("Score:", &GenerationOptions::deterministic(8))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(reply, "8");
}

#[tokio::test]
async fn test_chat_server_error_is_unavailable() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let generator = OpenAiChatGenerator::new(chat_config(server.url())).unwrap();
    let err = generator
        .generate("hi", &GenerationOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unavailable(_)));
}

#[tokio::test]
async fn test_chat_without_choices_fails() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"choices": []}).to_string())
        .create_async()
        .await;

    let generator = OpenAiChatGenerator::new(chat_config(server.url())).unwrap();
    let err = generator
        .generate("hi", &GenerationOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::ExecutionFailed(_)));
}
