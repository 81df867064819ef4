//! Evidence loader - stage capability
//!
//! Retrieves evidence documents and tags each with its logical id. Text is
//! passed through unchanged.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::clients::DocumentFetcher;
use crate::error::AppResult;
use crate::models::{EvidenceSource, LoadedDocument};

pub struct EvidenceLoader {
    fetcher: Arc<dyn DocumentFetcher>,
}

impl EvidenceLoader {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetch a single source
    ///
    /// # Arguments
    /// * `source` - URL or local path
    /// * `doc_id` - logical id the document is known by downstream
    pub async fn load(&self, source: &str, doc_id: &str) -> AppResult<LoadedDocument> {
        debug!("Loading evidence {} from {}", doc_id, source);
        let document_text = self.fetcher.fetch(source).await?;
        info!("✓ Loaded evidence {} ({} chars)", doc_id, document_text.chars().count());
        Ok(LoadedDocument {
            doc_id: doc_id.to_string(),
            document_text,
        })
    }

    /// Fetch every source concurrently; the first failure aborts the lot
    pub async fn load_all(&self, sources: &[EvidenceSource]) -> AppResult<Vec<LoadedDocument>> {
        try_join_all(sources.iter().map(|s| self.load(&s.locator, &s.doc_id))).await
    }
}
