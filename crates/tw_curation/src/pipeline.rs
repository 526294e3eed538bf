//! The per-run curation pipeline.
//!
//! Order of the stages is load-bearing: fingerprint, duplicate gate, topic
//! match, relevance score, summarize, persist. The gate runs before the
//! filters, so a filtered item still lands in the seen-set and will not be
//! re-examined on later runs. The seen-set entry is written before the
//! article, so a crash between the two drops the item instead of admitting
//! it twice.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, error, info, warn};
use tw_core::config::ScoringConfig;
use tw_core::{fingerprint, Admission, Article, ArticleStore, RawItem, Result, RunSummary, Summarizer};
use tw_summarizer::extractive::extract_summary;

use crate::gate::DuplicateGate;
use crate::relevance::RelevanceScorer;
use crate::topics::TopicSet;

pub struct CorpusBuilder {
    topics: TopicSet,
    scorer: RelevanceScorer,
    gate: DuplicateGate,
    store: Arc<dyn ArticleStore>,
    summarizer: Arc<dyn Summarizer>,
    min_relevance: f64,
    max_articles_per_run: usize,
}

impl CorpusBuilder {
    pub fn new(
        topics: TopicSet,
        scorer: RelevanceScorer,
        store: Arc<dyn ArticleStore>,
        summarizer: Arc<dyn Summarizer>,
        scoring: &ScoringConfig,
    ) -> Self {
        Self {
            topics,
            scorer,
            gate: DuplicateGate::new(store.clone()),
            store,
            summarizer,
            min_relevance: scoring.min_relevance,
            max_articles_per_run: scoring.max_articles_per_run,
        }
    }

    /// Run one discovered batch through the pipeline.
    ///
    /// Per-item problems are counted and skipped. A storage failure stops
    /// the remaining batch; everything persisted so far stays persisted and
    /// the summary still carries the partial counts.
    pub async fn run(&self, items: &[RawItem], today: NaiveDate) -> RunSummary {
        let mut summary = RunSummary::new(Utc::now());
        summary.found = items.len();
        info!(found = summary.found, "starting curation run");

        for (index, item) in items.iter().enumerate() {
            if summary.accepted >= self.max_articles_per_run {
                summary.skipped_cap = items.len() - index;
                info!(
                    cap = self.max_articles_per_run,
                    left = summary.skipped_cap,
                    "acceptance cap reached, leaving the rest for the next run"
                );
                break;
            }
            if let Err(err) = self.process(item, today, &mut summary).await {
                error!(error = %err, url = %item.url, "storage failure, stopping the batch");
                summary.add_error(err.to_string());
                summary.aborted = true;
                break;
            }
        }

        summary.finished_at = Some(Utc::now());
        info!(
            accepted = summary.accepted,
            rejected = summary.rejected(),
            malformed = summary.malformed,
            aborted = summary.aborted,
            "curation run finished"
        );
        summary
    }

    /// `Err` from here means storage trouble; every other per-item problem
    /// is counted into the summary and swallowed.
    async fn process(
        &self,
        item: &RawItem,
        today: NaiveDate,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if item.title.trim().is_empty() {
            warn!(url = %item.url, "skipping item without a title");
            summary.malformed += 1;
            return Ok(());
        }
        let canonical = match fingerprint::canonicalize_url(&item.url) {
            Ok(canonical) => canonical,
            Err(err) => {
                warn!(url = %item.url, error = %err, "skipping malformed item");
                summary.malformed += 1;
                return Ok(());
            }
        };
        let id = fingerprint::article_id(&canonical);
        let content_hash = fingerprint::content_fingerprint(&canonical, &item.body_text);

        match self.gate.admit(&id, &content_hash).await? {
            Admission::Accepted => {}
            Admission::DuplicateId => {
                summary.duplicate_id += 1;
                return Ok(());
            }
            Admission::DuplicateContent => {
                summary.duplicate_content += 1;
                return Ok(());
            }
        }

        let matched = self
            .topics
            .match_text(&format!("{} {}", item.title, item.body_text));
        if matched.is_empty() {
            debug!(id, title = %item.title, "no configured topic matched");
            summary.no_topic_match += 1;
            return Ok(());
        }

        let discovered = item.discovered_at.date_naive();
        let score = self.scorer.score(matched.len(), item.source, discovered, today);
        if score < self.min_relevance {
            debug!(
                id,
                score,
                threshold = self.min_relevance,
                topics = ?matched,
                "relevance below threshold"
            );
            summary.below_threshold += 1;
            return Ok(());
        }

        let related_topics: Vec<String> = matched.into_iter().collect();
        let summary_text = match self
            .summarizer
            .summarize(&item.title, &item.body_text, &related_topics)
            .await
        {
            Ok(text) => text,
            Err(err) => {
                warn!(id, error = %err, "summarizer failed, using an extract");
                summary.summary_fallbacks += 1;
                extract_summary(&item.title, &item.body_text)
            }
        };

        let article = Article {
            id,
            title: item.title.trim().to_string(),
            url: canonical,
            source: item.source,
            discovered_date: discovered,
            content_hash,
            summary: summary_text,
            related_topics,
            relevance_score: score,
        };
        self.store.persist_article(&article).await?;
        summary.accepted += 1;
        info!(
            id = %article.id,
            score = format!("{:.3}", article.relevance_score),
            topics = ?article.related_topics,
            "accepted: {}",
            article.title
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tw_core::config::Config;
    use tw_core::{Error, WeeklyReport};
    use tw_storage::MemoryStore;
    use tw_summarizer::ExtractiveSummarizer;

    fn builder_with(
        store: Arc<dyn ArticleStore>,
        summarizer: Arc<dyn Summarizer>,
        scoring: &ScoringConfig,
    ) -> CorpusBuilder {
        let config = Config::default();
        let topics = TopicSet::compile(&config.topics).expect("topics");
        let scorer =
            RelevanceScorer::new(scoring, config.sources.weights()).expect("scorer");
        CorpusBuilder::new(topics, scorer, store, summarizer, scoring)
    }

    fn item(url: &str, title: &str, body: &str) -> RawItem {
        RawItem {
            url: url.to_string(),
            title: title.to_string(),
            body_text: body.to_string(),
            source: tw_core::Source::HackerNews,
            discovered_at: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[tokio::test]
    async fn accepted_items_are_tagged_scored_and_persisted() {
        let store = Arc::new(MemoryStore::new());
        let builder = builder_with(
            store.clone(),
            Arc::new(ExtractiveSummarizer::new()),
            &ScoringConfig::default(),
        );
        let items = vec![item(
            "https://example.com/rust-post",
            "Rust ships a new borrow checker",
            "The Rust compiler team improved diagnostics across the kernel drivers.",
        )];

        let summary = builder.run(&items, today()).await;
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected(), 0);
        assert!(!summary.aborted);

        let stored = store
            .load_articles(today(), today())
            .await
            .expect("load");
        assert_eq!(stored.len(), 1);
        let article = &stored[0];
        assert!(article.related_topics.contains(&"Rust".to_string()));
        assert!(article.relevance_score > 0.0 && article.relevance_score <= 1.0);
        assert!(!article.summary.is_empty());
        assert_eq!(article.id.len(), 16);
    }

    #[tokio::test]
    async fn rerunning_the_same_batch_accepts_nothing() {
        let store = Arc::new(MemoryStore::new());
        let builder = builder_with(
            store.clone(),
            Arc::new(ExtractiveSummarizer::new()),
            &ScoringConfig::default(),
        );
        let items = vec![
            item(
                "https://example.com/a",
                "Rust in the kernel",
                "Rust drivers are landing.",
            ),
            item(
                "https://example.com/b",
                "Kernel security review",
                "A security audit of kernel subsystems.",
            ),
        ];

        let first = builder.run(&items, today()).await;
        assert_eq!(first.accepted, 2);

        let second = builder.run(&items, today()).await;
        assert_eq!(second.accepted, 0);
        assert_eq!(second.duplicate_id, 2);
        assert_eq!(
            store
                .load_articles(today(), today())
                .await
                .expect("load")
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn tracking_params_do_not_defeat_the_gate() {
        let store = Arc::new(MemoryStore::new());
        let builder = builder_with(
            store.clone(),
            Arc::new(ExtractiveSummarizer::new()),
            &ScoringConfig::default(),
        );
        let items = vec![
            item(
                "https://example.com/post",
                "Rust retrospective",
                "Ten years of rust.",
            ),
            item(
                "https://example.com/post?utm_source=feed#top",
                "Rust retrospective",
                "Ten years of rust.",
            ),
        ];

        let summary = builder.run(&items, today()).await;
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.duplicate_id, 1);
    }

    #[tokio::test]
    async fn same_body_under_two_urls_is_caught_in_one_batch() {
        let store = Arc::new(MemoryStore::new());
        let builder = builder_with(
            store.clone(),
            Arc::new(ExtractiveSummarizer::new()),
            &ScoringConfig::default(),
        );
        let body = "Rust and the kernel, syndicated everywhere.";
        let items = vec![
            item("https://origin.example.com/story", "Rust everywhere", body),
            item("https://mirror.example.net/story", "Rust everywhere", body),
        ];

        let summary = builder.run(&items, today()).await;
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.duplicate_content, 1);

        let stored = store.load_articles(today(), today()).await.expect("load");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].url, "https://origin.example.com/story");
    }

    #[tokio::test]
    async fn malformed_items_are_skipped_not_fatal() {
        let store = Arc::new(MemoryStore::new());
        let builder = builder_with(
            store.clone(),
            Arc::new(ExtractiveSummarizer::new()),
            &ScoringConfig::default(),
        );
        let items = vec![
            item("not a url at all", "Broken link", "some body"),
            item("https://example.com/ok", "   ", "body without a title"),
            item(
                "https://example.com/good",
                "Rust keeps going",
                "More rust news.",
            ),
        ];

        let summary = builder.run(&items, today()).await;
        assert_eq!(summary.malformed, 2);
        assert_eq!(summary.accepted, 1);
        assert!(!summary.aborted);
    }

    #[tokio::test]
    async fn off_topic_items_are_rejected_regardless_of_score() {
        let store = Arc::new(MemoryStore::new());
        let builder = builder_with(
            store.clone(),
            Arc::new(ExtractiveSummarizer::new()),
            &ScoringConfig::default(),
        );
        // Fresh, credible source, but nothing matching the topic table.
        let items = vec![item(
            "https://example.com/cooking",
            "Sourdough starters ranked",
            "Flour, water and patience.",
        )];

        let summary = builder.run(&items, today()).await;
        assert_eq!(summary.accepted, 0);
        assert_eq!(summary.no_topic_match, 1);
        assert!(store
            .load_articles(today(), today())
            .await
            .expect("load")
            .is_empty());
    }

    #[tokio::test]
    async fn weak_matches_fall_below_the_threshold() {
        let store = Arc::new(MemoryStore::new());
        let scoring = ScoringConfig {
            min_relevance: 0.9,
            ..ScoringConfig::default()
        };
        let builder = builder_with(
            store.clone(),
            Arc::new(ExtractiveSummarizer::new()),
            &scoring,
        );
        let items = vec![item(
            "https://example.com/rust",
            "A rust mention",
            "Mostly about something else, rust appears once.",
        )];

        let summary = builder.run(&items, today()).await;
        assert_eq!(summary.below_threshold, 1);
        assert_eq!(summary.accepted, 0);
    }

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        fn name(&self) -> &str {
            "failing"
        }

        async fn summarize(&self, _: &str, _: &str, _: &[String]) -> Result<String> {
            Err(Error::Summarization("model offline".to_string()))
        }

        async fn summarize_digest(&self, _: &str) -> Result<String> {
            Err(Error::Summarization("model offline".to_string()))
        }
    }

    #[tokio::test]
    async fn summarizer_failure_falls_back_to_an_extract() {
        let store = Arc::new(MemoryStore::new());
        let builder = builder_with(
            store.clone(),
            Arc::new(FailingSummarizer),
            &ScoringConfig::default(),
        );
        let items = vec![item(
            "https://example.com/rust",
            "Rust release notes",
            "Rust 1.80 stabilizes lazy statics. More below.",
        )];

        let summary = builder.run(&items, today()).await;
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.summary_fallbacks, 1);

        let stored = store.load_articles(today(), today()).await.expect("load");
        assert!(!stored[0].summary.is_empty());
    }

    /// Storage wrapper whose persist starts failing after a set number of
    /// writes.
    struct FlakyStore {
        inner: MemoryStore,
        persists_allowed: AtomicUsize,
    }

    impl FlakyStore {
        fn failing_after(n: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                persists_allowed: AtomicUsize::new(n),
            }
        }
    }

    #[async_trait]
    impl ArticleStore for FlakyStore {
        async fn persist_article(&self, article: &Article) -> Result<()> {
            if self.persists_allowed.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                n.checked_sub(1)
            })
            .is_err()
            {
                return Err(Error::Storage("disk full".to_string()));
            }
            self.inner.persist_article(article).await
        }

        async fn load_articles(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Article>> {
            self.inner.load_articles(start, end).await
        }

        async fn is_seen(&self, id: &str) -> Result<bool> {
            self.inner.is_seen(id).await
        }

        async fn mark_seen(&self, id: &str, content_hash: &str) -> Result<Admission> {
            self.inner.mark_seen(id, content_hash).await
        }

        async fn save_run_summary(&self, summary: &RunSummary) -> Result<()> {
            self.inner.save_run_summary(summary).await
        }

        async fn save_report(&self, report: &WeeklyReport) -> Result<()> {
            self.inner.save_report(report).await
        }
    }

    #[tokio::test]
    async fn storage_failure_stops_the_batch_but_keeps_earlier_work() {
        let store = Arc::new(FlakyStore::failing_after(1));
        let builder = builder_with(
            store.clone(),
            Arc::new(ExtractiveSummarizer::new()),
            &ScoringConfig::default(),
        );
        let items = vec![
            item("https://example.com/a", "Rust item one", "rust body one"),
            item("https://example.com/b", "Rust item two", "rust body two"),
            item("https://example.com/c", "Rust item three", "rust body three"),
        ];

        let summary = builder.run(&items, today()).await;
        assert!(summary.aborted);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.errors.len(), 1);

        let stored = store.load_articles(today(), today()).await.expect("load");
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn acceptance_cap_leaves_the_rest_for_the_next_run() {
        let store = Arc::new(MemoryStore::new());
        let scoring = ScoringConfig {
            max_articles_per_run: 1,
            ..ScoringConfig::default()
        };
        let builder = builder_with(
            store.clone(),
            Arc::new(ExtractiveSummarizer::new()),
            &scoring,
        );
        let items = vec![
            item("https://example.com/a", "Rust item one", "rust body one"),
            item("https://example.com/b", "Rust item two", "rust body two"),
        ];

        let first = builder.run(&items, today()).await;
        assert_eq!(first.accepted, 1);
        assert_eq!(first.skipped_cap, 1);

        // The capped item was never marked seen, so the next run admits it.
        let second = builder.run(&items, today()).await;
        assert_eq!(second.accepted, 1);
        assert_eq!(second.duplicate_id, 1);
    }
}
