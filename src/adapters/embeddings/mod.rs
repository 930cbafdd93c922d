pub mod hashing;
pub mod openai;

pub use hashing::HashEmbeddingProvider;
pub use openai::{OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
