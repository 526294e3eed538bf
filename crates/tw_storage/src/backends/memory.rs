//! In-memory store for tests and dry runs. Same semantics as the JSON
//! store, minus durability.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tw_core::{Admission, Article, ArticleStore, Result, RunSummary, WeeklyReport};

#[derive(Default)]
struct MemoryInner {
    articles: Vec<Article>,
    seen_ids: HashSet<String>,
    seen_hashes: HashSet<String>,
    last_run: Option<RunSummary>,
    reports: BTreeMap<NaiveDate, WeeklyReport>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn article_count(&self) -> usize {
        self.inner.read().await.articles.len()
    }

    pub async fn last_run(&self) -> Option<RunSummary> {
        self.inner.read().await.last_run.clone()
    }

    pub async fn report_for(&self, window_start: NaiveDate) -> Option<WeeklyReport> {
        self.inner.read().await.reports.get(&window_start).cloned()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn persist_article(&self, article: &Article) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.articles.push(article.clone());
        Ok(())
    }

    async fn load_articles(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Article>> {
        let inner = self.inner.read().await;
        Ok(inner
            .articles
            .iter()
            .filter(|a| a.discovered_date >= start && a.discovered_date <= end)
            .cloned()
            .collect())
    }

    async fn is_seen(&self, id: &str) -> Result<bool> {
        Ok(self.inner.read().await.seen_ids.contains(id))
    }

    async fn mark_seen(&self, id: &str, content_hash: &str) -> Result<Admission> {
        // One write lock spans the check and the insert.
        let mut inner = self.inner.write().await;
        if inner.seen_ids.contains(id) {
            return Ok(Admission::DuplicateId);
        }
        if inner.seen_hashes.contains(content_hash) {
            return Ok(Admission::DuplicateContent);
        }
        inner.seen_ids.insert(id.to_string());
        inner.seen_hashes.insert(content_hash.to_string());
        Ok(Admission::Accepted)
    }

    async fn save_run_summary(&self, summary: &RunSummary) -> Result<()> {
        self.inner.write().await.last_run = Some(summary.clone());
        Ok(())
    }

    async fn save_report(&self, report: &WeeklyReport) -> Result<()> {
        self.inner
            .write()
            .await
            .reports
            .insert(report.window_start, report.clone());
        Ok(())
    }
}
