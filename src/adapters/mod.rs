//! Adapters for external systems.
//!
//! Each adapter implements a port from `domain::ports`.

pub mod embeddings;
pub mod generation;
pub mod sinks;
pub mod vector;
