//! Article summarizers.
//!
//! [`ExtractiveSummarizer`] is the deterministic default and needs no
//! network or credentials. The chat-backed summarizers
//! ([`OpenAiSummarizer`], [`AnthropicSummarizer`]) call a hosted model and
//! retry transient failures with exponential backoff.

pub mod chat;
pub mod extractive;

use std::sync::Arc;

use tracing::info;
use tw_core::config::{SummarizerConfig, SummarizerProvider};
use tw_core::{Error, Result, Summarizer};

pub use chat::{AnthropicSummarizer, OpenAiSummarizer};
pub use extractive::ExtractiveSummarizer;

/// Build the configured summarizer.
///
/// Chat providers read their API key from the environment variable named in
/// the config and fail here, at startup, when it is missing. Callers get a
/// working summarizer or no summarizer at all.
pub fn create_summarizer(config: &SummarizerConfig) -> Result<Arc<dyn Summarizer>> {
    let summarizer: Arc<dyn Summarizer> = match config.provider {
        SummarizerProvider::Extractive => Arc::new(ExtractiveSummarizer::new()),
        SummarizerProvider::OpenAi => {
            Arc::new(OpenAiSummarizer::new(config, read_api_key(config)?)?)
        }
        SummarizerProvider::Anthropic => {
            Arc::new(AnthropicSummarizer::new(config, read_api_key(config)?)?)
        }
    };
    info!(summarizer = summarizer.name(), "summarizer ready");
    Ok(summarizer)
}

fn read_api_key(config: &SummarizerConfig) -> Result<String> {
    std::env::var(&config.api_key_env).map_err(|_| {
        Error::Configuration(format!(
            "environment variable {} is not set (required by the configured summarizer)",
            config.api_key_env
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extractive_needs_no_environment() {
        let config = SummarizerConfig::default();
        let summarizer = create_summarizer(&config).unwrap();
        assert_eq!(summarizer.name(), "extractive");
    }

    #[test]
    fn chat_provider_without_key_fails_at_startup() {
        let config = SummarizerConfig {
            provider: SummarizerProvider::OpenAi,
            api_key_env: "TW_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..SummarizerConfig::default()
        };
        let err = create_summarizer(&config).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("TW_TEST_KEY_THAT_IS_NOT_SET"));
    }
}
