pub mod hackernews;
pub mod lwn;

/// Shared HTTP plumbing for the site scrapers.
pub(crate) mod fetch {
    use std::time::Duration;

    use reqwest::Client;
    use tw_core::{Error, Result};

    pub const USER_AGENT: &str = concat!("trendwatch/", env!("CARGO_PKG_VERSION"));

    const REQUEST_TIMEOUT_SECS: u64 = 20;

    /// Longest body kept per article, in characters.
    pub const MAX_BODY_CHARS: usize = 5000;

    pub fn build_client() -> Result<Client> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(client)
    }

    pub async fn get_text(client: &Client, url: &str) -> Result<String> {
        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Scraping(format!(
                "{url} returned {}",
                response.status()
            )));
        }
        Ok(response.text().await?)
    }

    /// Collapse whitespace runs and cap the length on a char boundary.
    pub fn tidy_body(text: &str) -> String {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        match collapsed.char_indices().nth(MAX_BODY_CHARS) {
            Some((idx, _)) => collapsed[..idx].to_string(),
            None => collapsed,
        }
    }
}
