//! Weighted relevance scoring.
//!
//! The score is a convex combination of three bounded terms, so it always
//! lands in [0, 1]:
//!
//! ```text
//! topic_weight   * min(1, matched_topics / topic_saturation)
//! + source_weight  * credibility(source)
//! + recency_weight * 0.5 ^ (age_days / half_life_days)
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tw_core::config::ScoringConfig;
use tw_core::{Error, Result, Source};

/// Credibility applied to sources missing from the configured table.
const UNKNOWN_SOURCE_WEIGHT: f64 = 0.5;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

pub struct RelevanceScorer {
    topic_weight: f64,
    source_weight: f64,
    recency_weight: f64,
    topic_saturation: f64,
    half_life_days: f64,
    source_weights: BTreeMap<Source, f64>,
}

impl RelevanceScorer {
    /// Build a scorer, rejecting broken knobs up front. Scoring itself
    /// never fails and never re-validates.
    pub fn new(scoring: &ScoringConfig, source_weights: BTreeMap<Source, f64>) -> Result<Self> {
        for (label, weight) in [
            ("topic_weight", scoring.topic_weight),
            ("source_weight", scoring.source_weight),
            ("recency_weight", scoring.recency_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(Error::Configuration(format!(
                    "{label} must be within [0, 1], got {weight}"
                )));
            }
        }
        let sum = scoring.topic_weight + scoring.source_weight + scoring.recency_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::Configuration(format!(
                "scoring weights must sum to 1.0, got {sum}"
            )));
        }
        if scoring.topic_saturation == 0 {
            return Err(Error::Configuration(
                "topic_saturation must be at least 1".to_string(),
            ));
        }
        if !scoring.half_life_days.is_finite() || scoring.half_life_days <= 0.0 {
            return Err(Error::Configuration(format!(
                "half_life_days must be positive, got {}",
                scoring.half_life_days
            )));
        }
        for (source, weight) in &source_weights {
            if !(0.0..=1.0).contains(weight) {
                return Err(Error::Configuration(format!(
                    "source {source} weight must be within [0, 1], got {weight}"
                )));
            }
        }
        Ok(Self {
            topic_weight: scoring.topic_weight,
            source_weight: scoring.source_weight,
            recency_weight: scoring.recency_weight,
            topic_saturation: f64::from(scoring.topic_saturation),
            half_life_days: scoring.half_life_days,
            source_weights,
        })
    }

    /// Score an admitted candidate. Deterministic in its arguments; the
    /// caller supplies `today` rather than the scorer reading a clock.
    pub fn score(
        &self,
        matched_topics: usize,
        source: Source,
        discovered: NaiveDate,
        today: NaiveDate,
    ) -> f64 {
        let breadth = (matched_topics as f64 / self.topic_saturation).min(1.0);
        let credibility = self
            .source_weights
            .get(&source)
            .copied()
            .unwrap_or(UNKNOWN_SOURCE_WEIGHT);
        // Items dated in the future count as fresh, not negative-aged.
        let age_days = (today - discovered).num_days().max(0) as f64;
        let recency = 0.5_f64.powf(age_days / self.half_life_days);

        let score = self.topic_weight * breadth
            + self.source_weight * credibility
            + self.recency_weight * recency;
        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoring(topic: f64, source: f64, recency: f64, saturation: u32) -> ScoringConfig {
        ScoringConfig {
            topic_weight: topic,
            source_weight: source,
            recency_weight: recency,
            topic_saturation: saturation,
            ..ScoringConfig::default()
        }
    }

    fn weights(hn: f64) -> BTreeMap<Source, f64> {
        BTreeMap::from([(Source::HackerNews, hn), (Source::Lwn, 0.95)])
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().expect("date")
    }

    #[test]
    fn worked_example_lands_on_expected_score() {
        // One matched topic with saturation 2, credibility 0.9, same day.
        let scorer =
            RelevanceScorer::new(&scoring(0.5, 0.3, 0.2, 2), weights(0.9)).expect("scorer");
        let score = scorer.score(1, Source::HackerNews, day("2026-08-17"), day("2026-08-17"));
        assert!((score - 0.72).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn score_decays_monotonically_with_age() {
        let scorer =
            RelevanceScorer::new(&ScoringConfig::default(), weights(0.9)).expect("scorer");
        let today = day("2026-08-17");
        let ages = [0i64, 1, 3, 7, 14, 30];
        let scores: Vec<f64> = ages
            .iter()
            .map(|age| {
                scorer.score(
                    2,
                    Source::HackerNews,
                    today - chrono::Duration::days(*age),
                    today,
                )
            })
            .collect();
        for pair in scores.windows(2) {
            assert!(pair[0] > pair[1], "expected strict decay, got {scores:?}");
        }
    }

    #[test]
    fn recency_term_halves_at_the_half_life() {
        let mut config = scoring(0.0, 0.0, 1.0, 1);
        config.half_life_days = 7.0;
        let scorer = RelevanceScorer::new(&config, weights(0.9)).expect("scorer");
        let today = day("2026-08-17");
        let fresh = scorer.score(1, Source::HackerNews, today, today);
        let week_old = scorer.score(1, Source::HackerNews, today - chrono::Duration::days(7), today);
        assert!((fresh - 1.0).abs() < 1e-9);
        assert!((week_old - 0.5).abs() < 1e-9);
    }

    #[test]
    fn breadth_saturates_at_the_configured_count() {
        let scorer =
            RelevanceScorer::new(&scoring(0.5, 0.3, 0.2, 2), weights(0.9)).expect("scorer");
        let today = day("2026-08-17");
        let two = scorer.score(2, Source::HackerNews, today, today);
        let five = scorer.score(5, Source::HackerNews, today, today);
        let one = scorer.score(1, Source::HackerNews, today, today);
        assert_eq!(two, five);
        assert!(one < two);
    }

    #[test]
    fn unknown_source_gets_the_floor_weight() {
        let scorer =
            RelevanceScorer::new(&scoring(0.0, 1.0, 0.0, 1), BTreeMap::new()).expect("scorer");
        let today = day("2026-08-17");
        let score = scorer.score(1, Source::Lwn, today, today);
        assert!((score - UNKNOWN_SOURCE_WEIGHT).abs() < 1e-9);
    }

    #[test]
    fn future_dates_count_as_fresh() {
        let scorer =
            RelevanceScorer::new(&ScoringConfig::default(), weights(0.9)).expect("scorer");
        let today = day("2026-08-17");
        let future = scorer.score(1, Source::HackerNews, today + chrono::Duration::days(3), today);
        let fresh = scorer.score(1, Source::HackerNews, today, today);
        assert_eq!(future, fresh);
    }

    #[test]
    fn score_stays_within_unit_interval() {
        let scorer =
            RelevanceScorer::new(&scoring(0.5, 0.3, 0.2, 1), weights(1.0)).expect("scorer");
        let today = day("2026-08-17");
        let max = scorer.score(50, Source::HackerNews, today, today);
        let min = scorer.score(
            0,
            Source::HackerNews,
            today - chrono::Duration::days(10_000),
            today,
        );
        assert!(max <= 1.0);
        assert!(min >= 0.0);
    }

    #[test]
    fn construction_rejects_broken_weights() {
        assert!(RelevanceScorer::new(&scoring(0.9, 0.3, 0.2, 2), weights(0.9)).is_err());
        assert!(RelevanceScorer::new(&scoring(-0.1, 0.9, 0.2, 2), weights(0.9)).is_err());
        assert!(RelevanceScorer::new(&scoring(0.5, 0.3, 0.2, 0), weights(0.9)).is_err());
        assert!(RelevanceScorer::new(&scoring(0.5, 0.3, 0.2, 2), weights(1.5)).is_err());

        let mut config = scoring(0.5, 0.3, 0.2, 2);
        config.half_life_days = -1.0;
        assert!(RelevanceScorer::new(&config, weights(0.9)).is_err());
    }
}
