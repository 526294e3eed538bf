//! Hacker News front-page scraper.
//!
//! Walks `news?p=N` listing pages, then fetches each story's linked page to
//! pull article text. Stories whose body cannot be fetched are kept with an
//! empty body; the fingerprinting layer falls back to the URL for those.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::time::sleep;
use tracing::{debug, warn};
use tw_core::config::SourceConfig;
use tw_core::{RawItem, Result, Source};

use super::fetch;
use crate::Scraper;

const BASE_URL: &str = "https://news.ycombinator.com";

/// Selectors tried in order against a story's linked page. `body` always
/// matches, so only an empty page yields an empty body.
const CONTENT_SELECTORS: [&str; 6] = [
    "article",
    "main",
    "div.post",
    "div.content",
    "#content",
    "body",
];

pub struct HackerNewsScraper {
    client: Client,
    max_pages: u32,
    delay: Duration,
}

impl HackerNewsScraper {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            client: fetch::build_client()?,
            max_pages: config.max_pages.max(1),
            delay: Duration::from_millis(config.request_delay_ms),
        })
    }

    async fn fetch_body(&self, url: &str) -> String {
        match fetch::get_text(&self.client, url).await {
            Ok(html) => extract_article_text(&html),
            Err(err) => {
                debug!(url, error = %err, "story body unavailable");
                String::new()
            }
        }
    }
}

#[async_trait]
impl Scraper for HackerNewsScraper {
    fn source(&self) -> Source {
        Source::HackerNews
    }

    async fn discover(&self) -> Result<Vec<RawItem>> {
        let mut stories = Vec::new();
        for page in 1..=self.max_pages {
            let listing_url = format!("{BASE_URL}/news?p={page}");
            let html = match fetch::get_text(&self.client, &listing_url).await {
                Ok(html) => html,
                Err(err) if page > 1 => {
                    warn!(page, error = %err, "front page unavailable, stopping pagination");
                    break;
                }
                Err(err) => return Err(err),
            };
            let found = parse_front_page(&html);
            debug!(page, count = found.len(), "parsed front page");
            stories.extend(found);
            sleep(self.delay).await;
        }

        let mut seen = HashSet::new();
        stories.retain(|(_, url)| seen.insert(url.clone()));

        let mut items = Vec::with_capacity(stories.len());
        for (title, url) in stories {
            let body_text = self.fetch_body(&url).await;
            items.push(RawItem {
                url,
                title,
                body_text,
                source: Source::HackerNews,
                discovered_at: Utc::now(),
            });
            sleep(self.delay).await;
        }
        Ok(items)
    }
}

/// Extract `(title, absolute url)` pairs from a front-page listing.
fn parse_front_page(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("tr.athing").unwrap();
    let title_selector = Selector::parse("span.titleline > a").unwrap();

    let mut stories = Vec::new();
    for row in document.select(&row_selector) {
        if let Some(link) = row.select(&title_selector).next() {
            if let Some(href) = link.value().attr("href") {
                let title = link.text().collect::<String>().trim().to_string();
                if !title.is_empty() {
                    stories.push((title, resolve(href)));
                }
            }
        }
    }
    stories
}

/// Self posts link relatively (`item?id=...`); resolve those against the site.
fn resolve(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{}/{}", BASE_URL, href.trim_start_matches('/'))
    }
}

fn extract_article_text(html: &str) -> String {
    let document = Html::parse_document(html);
    for css in CONTENT_SELECTORS {
        let selector = Selector::parse(css).unwrap();
        if let Some(element) = document.select(&selector).next() {
            let text = fetch::tidy_body(&element.text().collect::<String>());
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}
