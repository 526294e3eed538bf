//! The curation engine: topic matching, relevance scoring, duplicate
//! gating, and the per-run pipeline that ties them to storage and the
//! summarizer.

pub mod gate;
pub mod pipeline;
pub mod relevance;
pub mod topics;

pub use gate::DuplicateGate;
pub use pipeline::CorpusBuilder;
pub use relevance::RelevanceScorer;
pub use topics::{TopicHit, TopicSet};
