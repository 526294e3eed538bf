//! Article discovery.
//!
//! Each source implements [`Scraper`]; [`discover_all`] fans the enabled
//! sources out concurrently and tolerates per-source failures, so one
//! unreachable site never sinks a whole crawl.

pub mod sources;

use async_trait::async_trait;
use tracing::{error, info};
use tw_core::config::SourcesConfig;
use tw_core::{Error, RawItem, Result, Source};

pub use sources::hackernews::HackerNewsScraper;
pub use sources::lwn::LwnScraper;

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Source this scraper feeds.
    fn source(&self) -> Source;

    /// Walks the source's listing pages and returns candidate items.
    async fn discover(&self) -> Result<Vec<RawItem>>;
}

/// Build one scraper per enabled source.
pub fn for_enabled_sources(config: &SourcesConfig) -> Result<Vec<Box<dyn Scraper>>> {
    let mut scrapers: Vec<Box<dyn Scraper>> = Vec::new();
    for source in config.enabled() {
        let scraper: Box<dyn Scraper> = match source {
            Source::HackerNews => Box::new(HackerNewsScraper::new(config.get(source))?),
            Source::Lwn => Box::new(LwnScraper::new(config.get(source))?),
        };
        scrapers.push(scraper);
    }
    Ok(scrapers)
}

/// Run every scraper to completion. Items from healthy sources are returned
/// alongside the failures, never instead of them.
pub async fn discover_all(
    scrapers: &[Box<dyn Scraper>],
) -> (Vec<RawItem>, Vec<(Source, Error)>) {
    let runs = scrapers
        .iter()
        .map(|scraper| async move { (scraper.source(), scraper.discover().await) });

    let mut items = Vec::new();
    let mut failures = Vec::new();
    for (source, outcome) in futures::future::join_all(runs).await {
        match outcome {
            Ok(found) => {
                info!(source = %source, count = found.len(), "source crawl finished");
                items.extend(found);
            }
            Err(err) => {
                error!(source = %source, error = %err, "source crawl failed");
                failures.push((source, err));
            }
        }
    }
    (items, failures)
}
