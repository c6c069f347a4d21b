//! Per-collection retrieval: embed the question, rank the cached documents.

use crate::cache::DocumentCache;
use crate::embeddings::EmbeddingClient;
use crate::rank::rank;
use crate::types::{Collection, RankedDocument};
use civic_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// Default number of documents kept per collection.
pub const DEFAULT_TOP_K: usize = 5;

/// Finds the best documents of a collection for a question.
///
/// Each collection embeds queries with its own client, because the stored
/// vectors of each collection come from a different embedding deployment.
#[derive(Debug, Clone)]
pub struct Retriever {
    cache: Arc<DocumentCache>,
    embedders: HashMap<Collection, EmbeddingClient>,
    min_score: Option<f32>,
}

impl Retriever {
    pub fn new(cache: Arc<DocumentCache>) -> Self {
        Self {
            cache,
            embedders: HashMap::new(),
            min_score: None,
        }
    }

    pub fn with_embedder(mut self, collection: Collection, client: EmbeddingClient) -> Self {
        self.embedders.insert(collection, client);
        self
    }

    /// Drop results scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn cache(&self) -> &Arc<DocumentCache> {
        &self.cache
    }

    /// Best `top_k` documents, or an empty list when the question could not
    /// be embedded.
    pub async fn retrieve(
        &self,
        query: &str,
        collection: Collection,
        top_k: usize,
    ) -> Vec<RankedDocument> {
        match self.try_retrieve(query, collection, top_k).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Retrieval from {} degraded to empty: {}", collection, e);
                Vec::new()
            }
        }
    }

    /// Like [`Retriever::retrieve`] but reports why nothing could be ranked.
    ///
    /// # Errors
    /// `EmbeddingUnavailable` when the query embedding failed or came back
    /// empty; `Knowledge` when the collection has no embedder or source.
    #[instrument(skip(self, query))]
    pub async fn try_retrieve(
        &self,
        query: &str,
        collection: Collection,
        top_k: usize,
    ) -> AppResult<Vec<RankedDocument>> {
        let embedder = self.embedders.get(&collection).ok_or_else(|| {
            AppError::Knowledge(format!("No embedding client for '{}'", collection))
        })?;

        let embeddings = embedder.embed(&[query.to_string()]).await?;
        if embeddings.retries > 0 {
            tracing::info!(
                "Query embedding for {} needed {} retries",
                collection,
                embeddings.retries
            );
        }
        let query_vector = embeddings.vectors.into_iter().next().ok_or_else(|| {
            AppError::EmbeddingUnavailable("no vector returned for the query".to_string())
        })?;

        let snapshot = self.cache.load(collection).await?;
        let mut results = rank(&query_vector, &snapshot.rankable, top_k);

        if let Some(min_score) = self.min_score {
            results.retain(|r| r.score >= min_score);
        }

        tracing::debug!(
            "Retrieved {} {} documents (best score: {:?})",
            results.len(),
            collection,
            results.first().map(|r| r.score)
        );

        Ok(results)
    }
}
