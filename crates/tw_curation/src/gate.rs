//! Admission control in front of the corpus.

use std::sync::Arc;

use tracing::debug;
use tw_core::{Admission, ArticleStore, Result};

/// The only path into the corpus: every candidate passes through
/// [`DuplicateGate::admit`] exactly once, before any filtering,
/// summarization or persistence.
pub struct DuplicateGate {
    store: Arc<dyn ArticleStore>,
}

impl DuplicateGate {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// Offer a fingerprint pair to the seen-set. Duplicates are decisions,
    /// not errors; only storage trouble comes back as `Err`.
    pub async fn admit(&self, id: &str, content_hash: &str) -> Result<Admission> {
        let admission = self.store.mark_seen(id, content_hash).await?;
        match admission {
            Admission::Accepted => debug!(id, "admitted"),
            Admission::DuplicateId => debug!(id, "duplicate id"),
            Admission::DuplicateContent => debug!(id, "duplicate content"),
        }
        Ok(admission)
    }
}
