//! Storage backends for the curation engine.

pub mod backends;

pub use backends::json::JsonStore;
pub use backends::memory::MemoryStore;
