pub mod jsonl;

pub use jsonl::JsonlSink;
