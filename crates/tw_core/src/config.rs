//! TOML configuration with fail-fast validation.
//!
//! Every knob the engine consults is validated once at load time;
//! per-item processing never re-checks configuration shape.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::types::Source;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Topic display name to the variants that count as a mention.
    #[serde(default = "default_topics")]
    pub topics: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub summarizer: SummarizerConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_hackernews")]
    pub hackernews: SourceConfig,

    #[serde(default = "default_lwn")]
    pub lwn: SourceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Editorial credibility weight in [0, 1].
    #[serde(default = "default_source_weight")]
    pub weight: f64,

    /// Listing pages to walk per crawl.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Pause between requests to the same site.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_topic_weight")]
    pub topic_weight: f64,

    #[serde(default = "default_source_weight_share")]
    pub source_weight: f64,

    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,

    /// Matched-topic count at which the breadth term saturates.
    #[serde(default = "default_topic_saturation")]
    pub topic_saturation: u32,

    /// Days for the recency term to halve.
    #[serde(default = "default_half_life_days")]
    pub half_life_days: f64,

    /// Minimum relevance score for admission of a topic-matched item.
    #[serde(default = "default_min_relevance")]
    pub min_relevance: f64,

    /// Acceptance cap per crawl run.
    #[serde(default = "default_max_articles_per_run")]
    pub max_articles_per_run: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Days of corpus and report files to keep; 0 disables cleanup.
    /// The seen-set is never cleaned.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerProvider {
    /// Offline first-sentences extraction; needs no credentials.
    Extractive,
    OpenAi,
    Anthropic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default = "default_provider")]
    pub provider: SummarizerProvider,

    /// Environment variable holding the API key for chat providers.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Override for OpenAI-compatible endpoints; provider default when unset.
    #[serde(default)]
    pub api_base: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_top_articles")]
    pub top_articles: usize,

    #[serde(default = "default_trending_topics")]
    pub trending_topics: usize,
}

fn default_topics() -> BTreeMap<String, Vec<String>> {
    let table = [
        ("Rust", vec!["rust", "rustlang", "cargo"]),
        ("Linux Kernel", vec!["linux kernel", "kernel", "linux"]),
        (
            "Machine Learning",
            vec!["machine learning", "llm", "large language model", "neural network"],
        ),
        ("Security", vec!["security", "vulnerability", "cve", "exploit"]),
    ];
    table
        .into_iter()
        .map(|(name, variants)| {
            (
                name.to_string(),
                variants.into_iter().map(str::to_string).collect(),
            )
        })
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_source_weight() -> f64 {
    0.5
}

fn default_max_pages() -> u32 {
    2
}

fn default_request_delay_ms() -> u64 {
    500
}

fn default_hackernews() -> SourceConfig {
    SourceConfig {
        enabled: true,
        weight: 0.9,
        max_pages: default_max_pages(),
        request_delay_ms: default_request_delay_ms(),
    }
}

fn default_lwn() -> SourceConfig {
    SourceConfig {
        enabled: true,
        weight: 0.95,
        max_pages: 1,
        request_delay_ms: 1000,
    }
}

fn default_topic_weight() -> f64 {
    0.5
}

fn default_source_weight_share() -> f64 {
    0.3
}

fn default_recency_weight() -> f64 {
    0.2
}

fn default_topic_saturation() -> u32 {
    3
}

fn default_half_life_days() -> f64 {
    7.0
}

fn default_min_relevance() -> f64 {
    0.3
}

fn default_max_articles_per_run() -> usize {
    100
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trendwatch")
}

fn default_retention_days() -> u32 {
    90
}

fn default_provider() -> SummarizerProvider {
    SummarizerProvider::Extractive
}

fn default_api_key_env() -> String {
    "TRENDWATCH_API_KEY".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    300
}

fn default_max_retries() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_top_articles() -> usize {
    10
}

fn default_trending_topics() -> usize {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            topics: default_topics(),
            sources: SourcesConfig::default(),
            scoring: ScoringConfig::default(),
            storage: StorageConfig::default(),
            summarizer: SummarizerConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            hackernews: default_hackernews(),
            lwn: default_lwn(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            topic_weight: default_topic_weight(),
            source_weight: default_source_weight_share(),
            recency_weight: default_recency_weight(),
            topic_saturation: default_topic_saturation(),
            half_life_days: default_half_life_days(),
            min_relevance: default_min_relevance(),
            max_articles_per_run: default_max_articles_per_run(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            retention_days: default_retention_days(),
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            api_base: None,
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_articles: default_top_articles(),
            trending_topics: default_trending_topics(),
        }
    }
}

impl SourcesConfig {
    pub fn get(&self, source: Source) -> &SourceConfig {
        match source {
            Source::HackerNews => &self.hackernews,
            Source::Lwn => &self.lwn,
        }
    }

    pub fn enabled(&self) -> Vec<Source> {
        Source::all()
            .iter()
            .copied()
            .filter(|source| self.get(*source).enabled)
            .collect()
    }

    /// Credibility weights keyed by source, for the relevance scorer.
    pub fn weights(&self) -> BTreeMap<Source, f64> {
        Source::all()
            .iter()
            .map(|source| (*source, self.get(*source).weight))
            .collect()
    }
}

impl Config {
    /// Load and validate a config file, writing the defaults first when the
    /// file does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)
                .map_err(|e| Error::Configuration(format!("{}: {e}", path.display())))?
        } else {
            info!(path = %path.display(), "no config file found, writing defaults");
            let config = Config::default();
            config.save(path)?;
            config
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::Configuration(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trendwatch")
            .join("config.toml")
    }

    /// Reject structurally broken configuration before any item is touched.
    pub fn validate(&self) -> Result<()> {
        if self.topics.is_empty() {
            return Err(Error::Configuration(
                "at least one topic must be configured".to_string(),
            ));
        }
        for (name, variants) in &self.topics {
            if name.trim().is_empty() {
                return Err(Error::Configuration("topic with empty name".to_string()));
            }
            if !variants.iter().any(|v| !v.trim().is_empty()) {
                return Err(Error::Configuration(format!(
                    "topic {name:?} has no usable match variants"
                )));
            }
        }

        let scoring = &self.scoring;
        for (label, weight) in [
            ("scoring.topic_weight", scoring.topic_weight),
            ("scoring.source_weight", scoring.source_weight),
            ("scoring.recency_weight", scoring.recency_weight),
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
                "scoring.topic_saturation must be at least 1".to_string(),
            ));
        }
        if !scoring.half_life_days.is_finite() || scoring.half_life_days <= 0.0 {
            return Err(Error::Configuration(format!(
                "scoring.half_life_days must be positive, got {}",
                scoring.half_life_days
            )));
        }
        if !(0.0..=1.0).contains(&scoring.min_relevance) {
            return Err(Error::Configuration(format!(
                "scoring.min_relevance must be within [0, 1], got {}",
                scoring.min_relevance
            )));
        }
        if scoring.max_articles_per_run == 0 {
            return Err(Error::Configuration(
                "scoring.max_articles_per_run must be at least 1".to_string(),
            ));
        }

        if self.sources.enabled().is_empty() {
            return Err(Error::Configuration(
                "at least one source must be enabled".to_string(),
            ));
        }
        for source in Source::all() {
            let cfg = self.sources.get(*source);
            if !(0.0..=1.0).contains(&cfg.weight) {
                return Err(Error::Configuration(format!(
                    "source {source} weight must be within [0, 1], got {}",
                    cfg.weight
                )));
            }
            if cfg.max_pages == 0 {
                return Err(Error::Configuration(format!(
                    "source {source} max_pages must be at least 1"
                )));
            }
        }

        if self.summarizer.provider != SummarizerProvider::Extractive
            && self.summarizer.api_key_env.trim().is_empty()
        {
            return Err(Error::Configuration(
                "summarizer.api_key_env must name the variable holding the API key".to_string(),
            ));
        }

        Ok(())
    }
}
