//! Chat-API summarizers.
//!
//! Both clients send one short prompt per article and expect plain text
//! back. Transient failures are retried with exponential backoff and
//! jitter; the pipeline falls back to extractive summaries when retries
//! are exhausted.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::warn;
use tw_core::config::SummarizerConfig;
use tw_core::{Error, Result, Summarizer};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Longest body slice sent to a model, in characters.
const MAX_BODY_CHARS: usize = 8000;

const BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(30);
const MAX_JITTER_MS: u64 = 250;

const SYSTEM_PROMPT: &str =
    "You summarize technical articles precisely and concisely. Respond with the summary text only.";

fn article_prompt(title: &str, body: &str, topics: &[String]) -> String {
    format!(
        "Summarize this technical article in 2-3 sentences for a weekly trend digest.\n\
         Matched topics: {}.\n\nTitle: {}\n\n{}",
        topics.join(", "),
        title,
        clip(body, MAX_BODY_CHARS),
    )
}

fn digest_prompt(digest: &str) -> String {
    format!(
        "Write a short narrative paragraph (3-4 sentences) describing this week in \
         technical news, based on the digest below. Respond with the paragraph only.\n\n{}",
        clip(digest, MAX_BODY_CHARS),
    )
}

/// Truncate on a char boundary, never mid-codepoint.
fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

async fn with_backoff<F, Fut>(max_retries: usize, what: &str, mut call: F) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let mut attempt = 0usize;
    loop {
        match call().await {
            Ok(text) => return Ok(text),
            Err(err) => {
                attempt += 1;
                if attempt > max_retries {
                    return Err(err);
                }
                let exponent = (attempt - 1).min(5) as u32;
                let delay = BASE_DELAY.saturating_mul(1 << exponent).min(MAX_DELAY);
                let jitter =
                    Duration::from_millis(rand::thread_rng().gen_range(0..=MAX_JITTER_MS));
                warn!(
                    attempt,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "{what} failed, backing off"
                );
                sleep(delay + jitter).await;
            }
        }
    }
}

fn build_client(config: &SummarizerConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

fn check_api_key(api_key: &str) -> Result<()> {
    if api_key.trim().is_empty() {
        return Err(Error::Configuration("API key is empty".to_string()));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Client for the OpenAI chat completions API and compatible endpoints.
pub struct OpenAiSummarizer {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    max_retries: usize,
}

impl fmt::Debug for OpenAiSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiSummarizer")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiSummarizer {
    pub fn new(config: &SummarizerConfig, api_key: String) -> Result<Self> {
        check_api_key(&api_key)?;
        Ok(Self {
            client: build_client(config)?,
            api_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| OPENAI_API_URL.to_string()),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }

    async fn chat(&self, user: String) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Summarization(format!(
                "chat API returned {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();
        non_empty(content)
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    fn name(&self) -> &str {
        "openai"
    }

    async fn summarize(&self, title: &str, body: &str, topics: &[String]) -> Result<String> {
        let prompt = article_prompt(title, body, topics);
        with_backoff(self.max_retries, "article summary", || {
            self.chat(prompt.clone())
        })
        .await
    }

    async fn summarize_digest(&self, digest: &str) -> Result<String> {
        let prompt = digest_prompt(digest);
        with_backoff(self.max_retries, "digest summary", || {
            self.chat(prompt.clone())
        })
        .await
    }
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

/// Client for the Anthropic messages API.
pub struct AnthropicSummarizer {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    max_retries: usize,
}

impl fmt::Debug for AnthropicSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicSummarizer")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicSummarizer {
    pub fn new(config: &SummarizerConfig, api_key: String) -> Result<Self> {
        check_api_key(&api_key)?;
        Ok(Self {
            client: build_client(config)?,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }

    async fn message(&self, user: String) -> Result<String> {
        let request = MessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: user,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Summarization(format!(
                "messages API returned {status}: {body}"
            )));
        }

        let parsed: MessageResponse = response.json().await?;
        let text = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        non_empty(text)
    }
}

#[async_trait]
impl Summarizer for AnthropicSummarizer {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn summarize(&self, title: &str, body: &str, topics: &[String]) -> Result<String> {
        let prompt = article_prompt(title, body, topics);
        with_backoff(self.max_retries, "article summary", || {
            self.message(prompt.clone())
        })
        .await
    }

    async fn summarize_digest(&self, digest: &str) -> Result<String> {
        let prompt = digest_prompt(digest);
        with_backoff(self.max_retries, "digest summary", || {
            self.message(prompt.clone())
        })
        .await
    }
}

fn non_empty(text: String) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::Summarization(
            "model returned an empty completion".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
