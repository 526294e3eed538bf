//! `tw`: crawl technical news sources and render weekly trend reports.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Days, Local, NaiveDate, Weekday};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tw_core::config::{Config, SummarizerProvider};
use tw_core::{ArticleStore, RunSummary, WeeklyReport};
use tw_curation::{CorpusBuilder, RelevanceScorer, TopicSet};
use tw_reports::{fallback_narrative, narrative_digest, render_markdown, Aggregator};
use tw_storage::JsonStore;
use tw_summarizer::create_summarizer;

#[derive(Parser, Debug)]
#[command(name = "tw", author, version, about = "Technical-article curation and weekly trend reports", long_about = None)]
struct Cli {
    /// Path to the TOML config file; created with defaults when missing.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl the enabled sources and admit new articles into the corpus.
    Crawl,
    /// Aggregate a week of the corpus into a trend report.
    Report {
        /// First day of the window; defaults to the current week's Monday.
        #[arg(long)]
        week_start: Option<NaiveDate>,

        /// Last day of the window; defaults to six days after the start.
        #[arg(long)]
        week_end: Option<NaiveDate>,

        /// Only count articles matched to this topic (case-insensitive).
        #[arg(long)]
        topic: Option<String>,

        /// Write the rendered report here instead of the data directory.
        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,

        /// Print the report without writing anything.
        #[arg(long)]
        preview: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("load configuration from {}", config_path.display()))?;
    info!(config = %config_path.display(), "configuration loaded");

    match cli.command {
        Commands::Crawl => crawl(&config).await,
        Commands::Report {
            week_start,
            week_end,
            topic,
            output,
            format,
            preview,
        } => report(&config, week_start, week_end, topic, output, format, preview).await,
    }
}

async fn crawl(config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(JsonStore::open(&config.storage.data_dir).await?);

    let scrapers = tw_scrapers::for_enabled_sources(&config.sources)?;
    if scrapers.is_empty() {
        anyhow::bail!("no sources are enabled");
    }
    info!(sources = scrapers.len(), "🦗 starting crawl");
    let (items, failures) = tw_scrapers::discover_all(&scrapers).await;

    let summarizer = create_summarizer(&config.summarizer)?;
    let topics = TopicSet::compile(&config.topics)?;
    let scorer = RelevanceScorer::new(&config.scoring, config.sources.weights())?;
    let builder = CorpusBuilder::new(topics, scorer, store.clone(), summarizer, &config.scoring);

    let today = Local::now().date_naive();
    let mut summary = builder.run(&items, today).await;
    for (source, err) in &failures {
        summary.add_error(format!("{source}: {err}"));
    }
    store.save_run_summary(&summary).await?;

    match store
        .cleanup_older_than(config.storage.retention_days, today)
        .await
    {
        Ok(removed) if removed > 0 => info!(removed, "expired corpus files removed"),
        Ok(_) => {}
        Err(err) => warn!(error = %err, "retention cleanup failed"),
    }

    print_run_summary(&summary);

    if summary.aborted {
        anyhow::bail!("crawl aborted after a storage failure; the counts above are partial");
    }
    if !failures.is_empty() && items.is_empty() {
        anyhow::bail!("every enabled source failed");
    }
    Ok(())
}

fn print_run_summary(summary: &RunSummary) {
    println!(
        "Crawl finished: {} found, {} accepted",
        summary.found, summary.accepted
    );
    println!(
        "  duplicates: {} by id, {} by content",
        summary.duplicate_id, summary.duplicate_content
    );
    println!(
        "  filtered: {} off-topic, {} below threshold, {} malformed",
        summary.no_topic_match, summary.below_threshold, summary.malformed
    );
    if summary.skipped_cap > 0 {
        println!("  deferred by the per-run cap: {}", summary.skipped_cap);
    }
    if summary.summary_fallbacks > 0 {
        println!(
            "  extractive summary fallbacks: {}",
            summary.summary_fallbacks
        );
    }
    for error in &summary.errors {
        println!("  error: {error}");
    }
}

async fn report(
    config: &Config,
    week_start: Option<NaiveDate>,
    week_end: Option<NaiveDate>,
    topic: Option<String>,
    output: Option<PathBuf>,
    format: OutputFormat,
    preview: bool,
) -> anyhow::Result<()> {
    let store = JsonStore::open(&config.storage.data_dir).await?;

    let today = Local::now().date_naive();
    let window_start = week_start.unwrap_or_else(|| today.week(Weekday::Mon).first_day());
    let window_end = match week_end {
        Some(end) => end,
        None => window_start
            .checked_add_days(Days::new(6))
            .context("window end overflows the calendar")?,
    };

    let mut articles = store.load_articles(window_start, window_end).await?;
    if let Some(ref query) = topic {
        let topics = TopicSet::compile(&config.topics)?;
        let name = topics
            .find_name(query)
            .with_context(|| format!("unknown topic {query:?}"))?
            .to_string();
        articles.retain(|article| article.related_topics.iter().any(|t| *t == name));
        info!(topic = %name, remaining = articles.len(), "corpus filtered by topic");
    }

    let aggregator = Aggregator::new(&config.report);
    let mut report = aggregator.aggregate(&articles, window_start, window_end)?;
    report.summary = narrative(config, &report).await;

    let rendered = match format {
        OutputFormat::Markdown => render_markdown(&report),
        OutputFormat::Json => {
            let mut json =
                serde_json::to_string_pretty(&report).context("serialize report to JSON")?;
            json.push('\n');
            json
        }
    };

    if preview {
        print!("{rendered}");
        return Ok(());
    }

    store.save_report(&report).await?;

    let output_path = match (output, format) {
        (Some(path), _) => path,
        (None, OutputFormat::Markdown) => config
            .storage
            .data_dir
            .join("reports")
            .join(format!("week-{window_start}.md")),
        (None, OutputFormat::Json) => {
            // The JSON archive was just written by save_report; print the
            // rendered report instead of writing it twice.
            print!("{rendered}");
            return Ok(());
        }
    };

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    std::fs::write(&output_path, &rendered)
        .with_context(|| format!("write report to {}", output_path.display()))?;
    info!(path = %output_path.display(), "📊 report written");
    println!("{}", output_path.display());
    Ok(())
}

/// Attach a narrative to the report: model-written when a chat summarizer is
/// configured, deterministic otherwise. Never fails the report over it.
async fn narrative(config: &Config, report: &WeeklyReport) -> String {
    if report.total_articles == 0 || config.summarizer.provider == SummarizerProvider::Extractive
    {
        return fallback_narrative(report);
    }
    let summarizer = match create_summarizer(&config.summarizer) {
        Ok(summarizer) => summarizer,
        Err(err) => {
            warn!(error = %err, "summarizer unavailable, using the built-in narrative");
            return fallback_narrative(report);
        }
    };
    match summarizer.summarize_digest(&narrative_digest(report)).await {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "narrative generation failed, using the built-in narrative");
            fallback_narrative(report)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_flags_parse() {
        let cli = Cli::try_parse_from([
            "tw",
            "report",
            "--week-start",
            "2026-08-10",
            "--topic",
            "rust",
            "--format",
            "json",
            "--preview",
        ])
        .unwrap();
        match cli.command {
            Commands::Report {
                week_start,
                topic,
                format,
                preview,
                ..
            } => {
                assert_eq!(week_start, Some(NaiveDate::from_ymd_opt(2026, 8, 10).unwrap()));
                assert_eq!(topic.as_deref(), Some("rust"));
                assert_eq!(format, OutputFormat::Json);
                assert!(preview);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn crawl_takes_a_global_config_flag() {
        let cli = Cli::try_parse_from(["tw", "crawl", "--config", "/tmp/tw.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/tw.toml")));
        assert!(matches!(cli.command, Commands::Crawl));
    }

    #[test]
    fn bad_dates_are_rejected_at_parse_time() {
        assert!(Cli::try_parse_from(["tw", "report", "--week-start", "not-a-date"]).is_err());
    }
}
