use async_trait::async_trait;

use crate::Result;

/// Summarization seam. Called only for articles the gate and the filters
/// have already admitted; rejected items never reach a summarizer.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Implementation name, for logs and run output.
    fn name(&self) -> &str;

    /// Produce a two-to-three sentence summary of one article.
    async fn summarize(&self, title: &str, body: &str, topics: &[String]) -> Result<String>;

    /// Produce a short narrative paragraph from a pre-built weekly digest.
    async fn summarize_digest(&self, digest: &str) -> Result<String>;
}

impl std::fmt::Debug for dyn Summarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Summarizer").field("name", &self.name()).finish()
    }
}
