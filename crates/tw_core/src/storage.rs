use async_trait::async_trait;

use crate::types::{Admission, Article, RunSummary, WeeklyReport};
use crate::Result;
use chrono::NaiveDate;

/// Storage seam for the curation engine.
///
/// Backends own two pieces of state with different lifecycles: the dated
/// corpus of accepted articles, and the append-only seen-set consulted by
/// the duplicate gate. Corpus files may be expired by retention policy;
/// seen-set entries are never removed.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Persist an accepted article into the corpus under its discovery date.
    async fn persist_article(&self, article: &Article) -> Result<()>;

    /// Load every article discovered within the inclusive date range.
    async fn load_articles(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Article>>;

    /// Whether an article id has been admitted before.
    async fn is_seen(&self, id: &str) -> Result<bool>;

    /// Atomic check-and-insert against the seen-set.
    ///
    /// The id check, the content-hash check and the insert happen inside one
    /// critical section, so two concurrent offers of the same fingerprints
    /// cannot both come back [`Admission::Accepted`].
    async fn mark_seen(&self, id: &str, content_hash: &str) -> Result<Admission>;

    /// Record the accounting of the most recent crawl run.
    async fn save_run_summary(&self, summary: &RunSummary) -> Result<()>;

    /// Persist a generated weekly report.
    async fn save_report(&self, report: &WeeklyReport) -> Result<()>;
}
