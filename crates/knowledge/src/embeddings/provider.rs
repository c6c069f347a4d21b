//! Embedding backend trait and factory.

use civic_core::config::EmbeddingBackendConfig;
use civic_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Outcome of a single failed embedding call.
///
/// Only `RateLimited` is retried by [`crate::embeddings::EmbeddingClient`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    /// The service answered 429
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Any other failure: transport, status, payload
    #[error("{0}")]
    Failed(String),
}

/// Trait for embedding backends.
///
/// A backend performs exactly one remote call per `embed_batch`; retrying is
/// the client's job.
#[async_trait::async_trait]
pub trait EmbeddingBackend: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "azure", "ollama", "mock")
    fn provider_name(&self) -> &str;

    /// Embed every text, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError>;
}

/// Create an embedding backend based on configuration.
pub fn create_backend(config: &EmbeddingBackendConfig) -> AppResult<Arc<dyn EmbeddingBackend>> {
    let timeout = Duration::from_secs(config.timeout_secs);

    match config.provider.as_str() {
        "azure" | "openai" => {
            let endpoint = match config.resolve_endpoint() {
                Some(endpoint) => endpoint,
                None if config.provider == "openai" => {
                    super::providers::http::DEFAULT_OPENAI_EMBEDDINGS_URL.to_string()
                }
                None => {
                    return Err(AppError::Config(format!(
                        "Embedding endpoint not set (expected in {})",
                        config.endpoint_env.as_deref().unwrap_or("endpoint")
                    )))
                }
            };
            let api_key = config.resolve_api_key().ok_or_else(|| {
                AppError::Config(format!(
                    "Embedding credential not set (expected in {})",
                    config.api_key_env.as_deref().unwrap_or("apiKeyEnv")
                ))
            })?;
            let auth = if config.provider == "azure" {
                super::providers::http::AuthStyle::ApiKeyHeader
            } else {
                super::providers::http::AuthStyle::Bearer
            };

            let backend = super::providers::http::HttpEmbeddingBackend::new(
                endpoint,
                api_key,
                auth,
                config.model.clone(),
                timeout,
            )?;
            Ok(Arc::new(backend))
        }

        "ollama" => {
            let base_url = config
                .resolve_endpoint()
                .unwrap_or_else(|| super::providers::ollama::DEFAULT_OLLAMA_URL.to_string());
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| super::providers::ollama::DEFAULT_OLLAMA_MODEL.to_string());
            let backend =
                super::providers::ollama::OllamaEmbeddingBackend::new(base_url, model, timeout)?;
            Ok(Arc::new(backend))
        }

        "mock" => {
            let dimensions = config
                .dimensions
                .unwrap_or(super::providers::mock::DEFAULT_MOCK_DIMENSIONS);
            Ok(Arc::new(super::providers::mock::MockBackend::new(dimensions)))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: azure, openai, ollama, mock",
            config.provider
        ))),
    }
}
