//! Window aggregation.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;
use tw_core::config::ReportConfig;
use tw_core::{Article, Error, Result, TopicTrend, WeeklyReport};

/// Folds articles into a weekly report.
///
/// Reads nothing but its arguments: no clock, no storage, no randomness.
pub struct Aggregator {
    top_articles: usize,
    trending_topics: usize,
}

impl Aggregator {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            top_articles: config.top_articles,
            trending_topics: config.trending_topics,
        }
    }

    /// Aggregate the articles whose discovery date falls inside the
    /// inclusive `[window_start, window_end]` window.
    pub fn aggregate(
        &self,
        articles: &[Article],
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> Result<WeeklyReport> {
        if window_start > window_end {
            return Err(Error::Configuration(format!(
                "window start {window_start} is after window end {window_end}"
            )));
        }

        let in_window: Vec<&Article> = articles
            .iter()
            .filter(|a| a.discovered_date >= window_start && a.discovered_date <= window_end)
            .collect();
        debug!(
            total = in_window.len(),
            %window_start,
            %window_end,
            "aggregating window"
        );

        let mut source_distribution: BTreeMap<String, usize> = BTreeMap::new();
        // (count, summed relevance) per topic; an article counts once per
        // matched topic.
        let mut per_topic: BTreeMap<String, (usize, f64)> = BTreeMap::new();
        for article in &in_window {
            *source_distribution
                .entry(article.source.as_str().to_string())
                .or_default() += 1;
            for topic in &article.related_topics {
                let entry = per_topic.entry(topic.clone()).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += article.relevance_score;
            }
        }

        let topic_distribution: BTreeMap<String, usize> = per_topic
            .iter()
            .map(|(topic, (count, _))| (topic.clone(), *count))
            .collect();

        let mut trending_topics: Vec<TopicTrend> = per_topic
            .into_iter()
            .map(|(topic, (count, relevance_sum))| {
                let average_relevance = relevance_sum / count as f64;
                TopicTrend {
                    topic,
                    count,
                    average_relevance,
                    trend_score: count as f64 * average_relevance,
                }
            })
            .collect();
        trending_topics.sort_by(|a, b| {
            b.trend_score
                .total_cmp(&a.trend_score)
                .then_with(|| b.count.cmp(&a.count))
                .then_with(|| a.topic.cmp(&b.topic))
        });
        trending_topics.truncate(self.trending_topics);

        let mut top_articles: Vec<Article> =
            in_window.iter().map(|article| (*article).clone()).collect();
        top_articles.sort_by(|a, b| {
            b.relevance_score
                .total_cmp(&a.relevance_score)
                .then_with(|| a.discovered_date.cmp(&b.discovered_date))
                .then_with(|| a.id.cmp(&b.id))
        });
        top_articles.truncate(self.top_articles);

        Ok(WeeklyReport {
            window_start,
            window_end,
            total_articles: in_window.len(),
            topic_distribution,
            source_distribution,
            trending_topics,
            top_articles,
            summary: String::new(),
        })
    }
}
