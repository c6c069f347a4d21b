//! Wiring of the answering pipeline from configuration.

use crate::cache::{CollectionStats, DocumentCache};
use crate::embeddings::EmbeddingClient;
use crate::loader::CsvDocumentSource;
use crate::rag::{AnswerGenerator, FusedAnswer, FusionOrchestrator};
use crate::retriever::Retriever;
use crate::types::Collection;
use civic_core::{AppConfig, AppResult};
use civic_prompt::PromptSet;
use std::sync::Arc;

/// Document cache over the configured CSV sources.
pub fn cache_from_config(config: &AppConfig) -> Arc<DocumentCache> {
    let collections = &config.collections;
    Arc::new(
        DocumentCache::new()
            .with_source(
                Collection::Legislative,
                Arc::new(CsvDocumentSource::from_config(&collections.legislative)),
                collections.legislative.dimension,
            )
            .with_source(
                Collection::Service,
                Arc::new(CsvDocumentSource::from_config(&collections.service)),
                collections.service.dimension,
            ),
    )
}

/// Shared cache plus the orchestrator answering over it.
///
/// The `{collection -> embedding backend}` mapping and the completion
/// backend are resolved once here and reused by every request.
#[derive(Debug, Clone)]
pub struct Pipeline {
    cache: Arc<DocumentCache>,
    orchestrator: FusionOrchestrator,
}

impl Pipeline {
    pub fn new(orchestrator: FusionOrchestrator) -> Self {
        Self {
            cache: Arc::clone(orchestrator.retriever().cache()),
            orchestrator,
        }
    }

    /// Build every component from the application configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let collections = &config.collections;
        let cache = cache_from_config(config);

        let retriever = Retriever::new(cache)
            .with_embedder(
                Collection::Legislative,
                EmbeddingClient::from_config(&collections.legislative.embedding)?,
            )
            .with_embedder(
                Collection::Service,
                EmbeddingClient::from_config(&collections.service.embedding)?,
            )
            .with_min_score(config.retrieval.min_score);

        let prompts = PromptSet::load(&config.workspace)?;
        let generator = AnswerGenerator::from_config(&config.generation, prompts)?;

        tracing::debug!(
            "Pipeline ready (top_k: {}, generation: {}/{})",
            config.retrieval.top_k,
            config.generation.provider,
            config.generation.model
        );

        Ok(Self::new(
            FusionOrchestrator::new(retriever, generator).with_top_k(config.retrieval.top_k),
        ))
    }

    pub fn cache(&self) -> &Arc<DocumentCache> {
        &self.cache
    }

    /// Answer a question from both collections.
    pub async fn answer(&self, question: &str) -> AppResult<FusedAnswer> {
        self.orchestrator.answer(question).await
    }

    /// Populate both collections ahead of the first question.
    pub async fn preload(&self) -> AppResult<Vec<CollectionStats>> {
        self.cache.preload().await?;
        self.cache.stats()
    }

    /// Reload both collections from their sources.
    pub async fn reload(&self) -> AppResult<Vec<CollectionStats>> {
        self.cache.reload_all().await
    }

    pub fn stats(&self) -> AppResult<Vec<CollectionStats>> {
        self.cache.stats()
    }
}
