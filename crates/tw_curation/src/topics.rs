//! Table-driven topic matching.
//!
//! Topics come from configuration as `display name -> variants`. Variants
//! compile to word-boundary patterns once at startup; matching an item is
//! then a pure scan with no network, model calls or mutable state.

use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;
use regex::Regex;
use tw_core::{Error, Result};

lazy_static! {
    static ref WS_RE: Regex = Regex::new(r"\s+").expect("whitespace regex");
}

/// One explainable topic match: which configured variant fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicHit {
    pub topic: String,
    pub variant: String,
}

#[derive(Debug)]
struct CompiledVariant {
    variant: String,
    pattern: Regex,
}

#[derive(Debug)]
struct CompiledTopic {
    name: String,
    variants: Vec<CompiledVariant>,
}

/// A compiled topic table.
#[derive(Debug)]
pub struct TopicSet {
    topics: Vec<CompiledTopic>,
}

impl TopicSet {
    /// Compile the configured table. Empty tables and topics without a
    /// usable variant are configuration errors.
    pub fn compile(table: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        if table.is_empty() {
            return Err(Error::Configuration(
                "topic table must not be empty".to_string(),
            ));
        }
        let mut topics = Vec::with_capacity(table.len());
        for (name, variants) in table {
            let mut compiled = Vec::new();
            for variant in variants {
                let normalized = normalize(variant);
                if normalized.is_empty() {
                    continue;
                }
                let pattern = Regex::new(&variant_pattern(&normalized)).map_err(|e| {
                    Error::Configuration(format!("variant {variant:?} of topic {name:?}: {e}"))
                })?;
                compiled.push(CompiledVariant {
                    variant: normalized,
                    pattern,
                });
            }
            if compiled.is_empty() {
                return Err(Error::Configuration(format!(
                    "topic {name:?} has no usable match variants"
                )));
            }
            topics.push(CompiledTopic {
                name: name.clone(),
                variants: compiled,
            });
        }
        Ok(Self { topics })
    }

    /// All matches with the variant that fired, first firing variant per
    /// topic. This is the explanation for every tag the engine assigns.
    pub fn hits(&self, text: &str) -> Vec<TopicHit> {
        let normalized = normalize(text);
        self.topics
            .iter()
            .filter_map(|topic| {
                topic
                    .variants
                    .iter()
                    .find(|v| v.pattern.is_match(&normalized))
                    .map(|v| TopicHit {
                        topic: topic.name.clone(),
                        variant: v.variant.clone(),
                    })
            })
            .collect()
    }

    /// Matched topic display names, sorted.
    pub fn match_text(&self, text: &str) -> BTreeSet<String> {
        self.hits(text).into_iter().map(|hit| hit.topic).collect()
    }

    /// Look up a configured display name, ignoring case.
    pub fn find_name(&self, name: &str) -> Option<&str> {
        let wanted = name.to_lowercase();
        self.topics
            .iter()
            .map(|t| t.name.as_str())
            .find(|candidate| candidate.to_lowercase() == wanted)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// Shared normalization for variants and scanned text: lowercase, hyphens
/// to spaces, collapsed whitespace. Keeping both sides identical is what
/// makes hyphenation variants line up.
fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase().replace('-', " ");
    WS_RE.replace_all(&lowered, " ").trim().to_string()
}

/// Word-boundary pattern tolerating simple `-s`/`-es` plurals.
fn variant_pattern(variant: &str) -> String {
    format!(r"\b{}(?:e?s)?\b", regex::escape(variant))
}
