pub mod file;
pub mod memory;

pub use file::FileVectorStore;
pub use memory::InMemoryVectorStore;
