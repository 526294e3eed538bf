//! Deterministic extractive summarization.
//!
//! Takes the leading sentences of the article body instead of calling a
//! model. Also used as the fallback when a chat summarizer fails, so the
//! pipeline never loses an accepted article to a summarization outage.

use async_trait::async_trait;
use tw_core::{Result, Summarizer};

/// Sentences kept from the start of the body.
const EXTRACT_SENTENCES: usize = 2;

/// Longest extract returned, in characters.
const MAX_EXTRACT_CHARS: usize = 300;

/// First sentences of `body`, capped at [`MAX_EXTRACT_CHARS`]. Falls back to
/// the title when the body has no usable sentence.
pub fn extract_summary(title: &str, body: &str) -> String {
    let sentences: Vec<&str> = body
        .split(|c| c == '.' || c == '!' || c == '?')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(EXTRACT_SENTENCES)
        .collect();

    if sentences.is_empty() {
        return title.trim().to_string();
    }

    let mut summary = sentences.join(". ");
    summary.push('.');
    if summary.chars().count() > MAX_EXTRACT_CHARS {
        summary = summary.chars().take(MAX_EXTRACT_CHARS).collect();
        summary.push_str("...");
    }
    summary
}

/// Summarizer that never leaves the process.
#[derive(Debug, Default)]
pub struct ExtractiveSummarizer;

impl ExtractiveSummarizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn summarize(&self, title: &str, body: &str, _topics: &[String]) -> Result<String> {
        Ok(extract_summary(title, body))
    }

    async fn summarize_digest(&self, digest: &str) -> Result<String> {
        Ok(extract_summary("", digest))
    }
}
