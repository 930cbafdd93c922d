//! Domain layer for switchyard
//!
//! Models, port traits, and errors. Nothing in here performs I/O.

pub mod errors;
pub mod models;
pub mod ports;
pub mod text;

pub use errors::{DomainError, DomainResult};
