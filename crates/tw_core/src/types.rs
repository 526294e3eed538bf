use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A content source the engine knows how to crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    HackerNews,
    Lwn,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::HackerNews => "hackernews",
            Source::Lwn => "lwn",
        }
    }

    pub fn all() -> &'static [Source] {
        &[Source::HackerNews, Source::Lwn]
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hackernews" | "hacker-news" | "hn" => Ok(Source::HackerNews),
            "lwn" => Ok(Source::Lwn),
            other => Err(Error::Configuration(format!("unknown source: {other}"))),
        }
    }
}

/// An item as handed over by a source scraper, before any curation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    pub url: String,
    pub title: String,
    /// Extracted article text. May be empty when the body fetch failed or
    /// the page is paywalled; identity then falls back to the URL.
    pub body_text: String,
    pub source: Source,
    pub discovered_at: DateTime<Utc>,
}

/// A curated article: admitted by the duplicate gate, tagged, scored,
/// summarized and persisted into the dated corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// First 16 hex chars of the SHA-256 of the canonical URL.
    pub id: String,
    pub title: String,
    /// Canonical URL (tracking params, fragments and trailing slashes removed).
    pub url: String,
    pub source: Source,
    /// Date the crawl admitted the article, not the publication date.
    pub discovered_date: NaiveDate,
    /// Full SHA-256 hex of the normalized body text.
    pub content_hash: String,
    pub summary: String,
    /// Matched topic display names, sorted and deduplicated.
    pub related_topics: Vec<String>,
    pub relevance_score: f64,
}

/// Outcome of offering a fingerprint pair to the seen-set.
///
/// Duplicates are decisions, not errors; the pipeline counts and skips them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// The canonical-URL id was already recorded.
    DuplicateId,
    /// A different URL already carried the same normalized body.
    DuplicateContent,
}

/// Accounting for a single crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Items handed over by the scrapers.
    pub found: usize,
    pub accepted: usize,
    pub duplicate_id: usize,
    pub duplicate_content: usize,
    pub no_topic_match: usize,
    pub below_threshold: usize,
    pub malformed: usize,
    /// Accepted items whose summarizer call failed and fell back to an extract.
    pub summary_fallbacks: usize,
    /// Items left unprocessed after the per-run acceptance cap.
    pub skipped_cap: usize,
    pub errors: Vec<String>,
    /// Set when a storage failure stopped the batch early.
    pub aborted: bool,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            found: 0,
            accepted: 0,
            duplicate_id: 0,
            duplicate_content: 0,
            no_topic_match: 0,
            below_threshold: 0,
            malformed: 0,
            summary_fallbacks: 0,
            skipped_cap: 0,
            errors: Vec::new(),
            aborted: false,
        }
    }

    /// Items the gate or the filters turned away.
    pub fn rejected(&self) -> usize {
        self.duplicate_id + self.duplicate_content + self.no_topic_match + self.below_threshold
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }
}

/// Per-topic trend line inside a weekly report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicTrend {
    pub topic: String,
    pub count: usize,
    pub average_relevance: f64,
    /// `count * average_relevance`; rewards topics that are both busy and strong.
    pub trend_score: f64,
}

/// Aggregated view of the corpus over an inclusive date window.
///
/// Contains no timestamps or other ambient state, so aggregating the same
/// corpus over the same window twice yields an identical report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub total_articles: usize,
    /// Article counts per topic; an article counts once per matched topic.
    pub topic_distribution: BTreeMap<String, usize>,
    pub source_distribution: BTreeMap<String, usize>,
    pub trending_topics: Vec<TopicTrend>,
    pub top_articles: Vec<Article>,
    /// Optional narrative attached after aggregation; empty when none.
    pub summary: String,
}
