//! Core types and collaborator traits for the trendwatch curation engine.
//!
//! Everything the other crates share lives here: the article model and run
//! accounting, the error enum, deterministic fingerprinting, configuration
//! loading, and the async traits implemented by storage backends and
//! summarizers.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod storage;
pub mod summarize;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use storage::ArticleStore;
pub use summarize::Summarizer;
pub use types::{Admission, Article, RawItem, RunSummary, Source, TopicTrend, WeeklyReport};
