//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - TextGenerator: single-prompt completions (extraction, scoring)
//! - EmbeddingProvider: text to vector
//! - VectorStore: persistent nearest-neighbour index
//! - AppendOnlySink: durable one-record-per-call log
//!
//! These traits keep the pipeline independent of any concrete model,
//! vector database, or persistence engine.

pub mod embedding;
pub mod generation;
pub mod null_embedding;
pub mod sink;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use generation::{GenerationOptions, TextGenerator};
pub use null_embedding::NullEmbeddingProvider;
pub use sink::AppendOnlySink;
pub use vector_store::VectorStore;
