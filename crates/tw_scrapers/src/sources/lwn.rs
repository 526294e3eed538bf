//! LWN.net archive scraper.
//!
//! Walks the article archive and pulls `div.ArticleText` from each article
//! page. Subscriber-gated pages have no ArticleText for anonymous readers
//! and come back with an empty body.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::debug;
use tw_core::config::SourceConfig;
use tw_core::{RawItem, Result, Source};

use super::fetch;
use crate::Scraper;

const BASE_URL: &str = "https://lwn.net";
const ARCHIVE_URL: &str = "https://lwn.net/Archives/";

/// Articles fetched per crawl; the archive page lists months of history.
const MAX_ARTICLES: usize = 30;

pub struct LwnScraper {
    client: Client,
    delay: Duration,
}

impl LwnScraper {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            client: fetch::build_client()?,
            delay: Duration::from_millis(config.request_delay_ms),
        })
    }

    async fn fetch_body(&self, url: &str) -> String {
        match fetch::get_text(&self.client, url).await {
            Ok(html) => extract_article_text(&html),
            Err(err) => {
                debug!(url, error = %err, "article body unavailable");
                String::new()
            }
        }
    }
}

#[async_trait]
impl Scraper for LwnScraper {
    fn source(&self) -> Source {
        Source::Lwn
    }

    async fn discover(&self) -> Result<Vec<RawItem>> {
        let html = fetch::get_text(&self.client, ARCHIVE_URL).await?;
        let mut entries = parse_archive(&html);
        debug!(count = entries.len(), "parsed archive listing");
        entries.truncate(MAX_ARTICLES);

        let mut items = Vec::with_capacity(entries.len());
        for (title, url) in entries {
            let body_text = self.fetch_body(&url).await;
            items.push(RawItem {
                url,
                title,
                body_text,
                source: Source::Lwn,
                discovered_at: Utc::now(),
            });
            sleep(self.delay).await;
        }
        Ok(items)
    }
}

/// Extract `(title, absolute url)` pairs for article links, first occurrence
/// wins, in page order.
fn parse_archive(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a").unwrap();

    let mut entries = Vec::new();
    for link in document.select(&link_selector) {
        if let Some(href) = link.value().attr("href") {
            if is_article_href(href) {
                let title = link.text().collect::<String>().trim().to_string();
                if !title.is_empty() {
                    entries.push((title, resolve(href)));
                }
            }
        }
    }

    let mut seen = HashSet::new();
    entries.retain(|(_, url)| seen.insert(url.clone()));
    entries
}

/// Article pages live at `/Articles/<id>/`; everything else on the archive
/// page (weekly editions, security index, author pages) is skipped.
fn is_article_href(href: &str) -> bool {
    let path = href.strip_prefix(BASE_URL).unwrap_or(href);
    let id = match path.strip_prefix("/Articles/") {
        Some(rest) => rest.trim_end_matches('/'),
        None => return false,
    };
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

fn resolve(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}/{}", BASE_URL, href.trim_start_matches('/'))
    }
}

fn extract_article_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let selector = Selector::parse("div.ArticleText").unwrap();
    match document.select(&selector).next() {
        Some(element) => fetch::tidy_body(&element.text().collect::<String>()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_hrefs_are_recognized() {
        assert!(is_article_href("/Articles/978500/"));
        assert!(is_article_href("/Articles/978500"));
        assert!(is_article_href("https://lwn.net/Articles/978500/"));

        assert!(!is_article_href("/Archives/"));
        assert!(!is_article_href("/Articles/"));
        assert!(!is_article_href("/Articles/978500/comments"));
        assert!(!is_article_href("https://example.com/Articles/1/"));
        assert!(!is_article_href("/security/"));
    }

    #[test]
    fn archive_links_become_entries_first_occurrence_wins() {
        let html = r#"
            <html><body>
                <a href="/Articles/978500/">Kernel 6.10 released</a>
                <a href="/Archives/2025/">July 2025</a>
                <a href="/Articles/978501/">BPF verifier changes</a>
                <a href="/Articles/978500/">Kernel 6.10 released (again)</a>
            </body></html>
        "#;
        let entries = parse_archive(html);
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            (
                "Kernel 6.10 released".to_string(),
                "https://lwn.net/Articles/978500/".to_string()
            )
        );
        assert_eq!(entries[1].0, "BPF verifier changes");
    }

    #[test]
    fn article_text_comes_from_the_article_div() {
        let html = r#"
            <html><body>
                <div class="menu">Weekly edition</div>
                <div class="ArticleText">
                    <p>The scheduler grew a   new knob.</p>
                </div>
            </body></html>
        "#;
        assert_eq!(extract_article_text(html), "The scheduler grew a new knob.");
    }

    #[test]
    fn gated_pages_yield_an_empty_body() {
        let html = r#"
            <html><body>
                <p>This article is available to subscribers only.</p>
            </body></html>
        "#;
        assert_eq!(extract_article_text(html), "");
    }
}
