//! Embedding client for query vectors.
//!
//! Wraps a pluggable [`EmbeddingBackend`] with the rate-limit retry policy:
//! a 429 response is retried after the server's `Retry-After` (or a default
//! wait) up to a bounded number of attempts; every other failure aborts
//! immediately.

pub mod provider;
pub mod providers;

pub use provider::{create_backend, BackendError, EmbeddingBackend};

use civic_core::config::EmbeddingBackendConfig;
use civic_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Retry policy for rate-limited embedding calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Wait when the server gives no `Retry-After`
    pub default_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            default_retry_after: Duration::from_secs(10),
        }
    }
}

impl From<&EmbeddingBackendConfig> for RetryPolicy {
    fn from(config: &EmbeddingBackendConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            default_retry_after: Duration::from_secs(config.default_retry_after_secs),
        }
    }
}

/// Successful embedding result.
#[derive(Debug, Clone, PartialEq)]
pub struct Embeddings {
    /// One vector per input text, in input order
    pub vectors: Vec<Vec<f32>>,
    /// Rate-limit retries performed before success
    pub retries: u32,
}

/// Embedding client owning a backend and its retry policy.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    backend: Arc<dyn EmbeddingBackend>,
    policy: RetryPolicy,
}

impl EmbeddingClient {
    pub fn new(backend: Arc<dyn EmbeddingBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Build the client for one collection's backend settings.
    pub fn from_config(config: &EmbeddingBackendConfig) -> AppResult<Self> {
        let backend = create_backend(config)?;
        Ok(Self::new(backend, RetryPolicy::from(config)))
    }

    pub fn provider_name(&self) -> &str {
        self.backend.provider_name()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Embed texts, retrying only on rate limiting.
    ///
    /// # Errors
    /// `EmbeddingUnavailable` when attempts are exhausted, on any
    /// non-rate-limit failure, or when the backend returns a different
    /// number of vectors than texts.
    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = self.backend.provider_name()))]
    pub async fn embed(&self, texts: &[String]) -> AppResult<Embeddings> {
        if texts.is_empty() {
            return Ok(Embeddings {
                vectors: Vec::new(),
                retries: 0,
            });
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut retries = 0u32;

        loop {
            match self.backend.embed_batch(texts).await {
                Ok(vectors) => {
                    if vectors.len() != texts.len() {
                        return Err(AppError::EmbeddingUnavailable(format!(
                            "expected {} vectors, got {}",
                            texts.len(),
                            vectors.len()
                        )));
                    }
                    debug!("Embedded {} texts after {} retries", texts.len(), retries);
                    return Ok(Embeddings { vectors, retries });
                }
                Err(BackendError::RateLimited { retry_after }) => {
                    let attempt = retries + 1;
                    if attempt >= max_attempts {
                        return Err(AppError::EmbeddingUnavailable(format!(
                            "rate limited on all {} attempts",
                            max_attempts
                        )));
                    }

                    let wait = retry_after.unwrap_or(self.policy.default_retry_after);
                    warn!(
                        "Embedding rate limited (attempt {}/{}), retrying in {:?}",
                        attempt, max_attempts, wait
                    );
                    tokio::time::sleep(wait).await;
                    retries += 1;
                }
                Err(BackendError::Failed(reason)) => {
                    return Err(AppError::EmbeddingUnavailable(reason));
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn question() -> Vec<String> {
        vec!["Ce acte imi trebuie pentru parcare?".to_string()]
    }

    #[tokio::test]
    async fn test_success_after_two_rate_limits() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            rate_limited(),
            rate_limited(),
            Ok(vec![vec![1.0, 0.0]]),
        ]));
        let client = EmbeddingClient::new(backend.clone(), fast_policy());

        let result = client.embed(&question()).await.unwrap();
        assert_eq!(result.retries, 2);
        assert_eq!(result.vectors, vec![vec![1.0, 0.0]]);
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_attempts() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            rate_limited(),
            rate_limited(),
            rate_limited(),
        ]));
        let policy = RetryPolicy {
            max_attempts: 3,
            ..fast_policy()
        };
        let client = EmbeddingClient::new(backend.clone(), policy);

        let result = client.embed(&question()).await;
        assert!(matches!(result, Err(AppError::EmbeddingUnavailable(_))));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_missing_retry_after_uses_default_wait() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(BackendError::RateLimited { retry_after: None }),
            Ok(vec![vec![0.5]]),
        ]));
        let client = EmbeddingClient::new(backend, fast_policy());

        let start = std::time::Instant::now();
        let result = client.embed(&question()).await.unwrap();
        assert_eq!(result.retries, 1);
        assert!(start.elapsed() >= Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_other_failure_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(BackendError::Failed("401 Unauthorized".to_string())),
            Ok(vec![vec![1.0]]),
        ]));
        let client = EmbeddingClient::new(backend.clone(), fast_policy());

        let err = client.embed(&question()).await.unwrap_err();
        assert!(err.to_string().contains("401 Unauthorized"));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_vector_count_mismatch_is_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(vec![])]));
        let client = EmbeddingClient::new(backend, fast_policy());

        let result = client.embed(&question()).await;
        assert!(matches!(result, Err(AppError::EmbeddingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_empty_input_skips_backend() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let client = EmbeddingClient::new(backend.clone(), fast_policy());

        let result = client.embed(&[]).await.unwrap();
        assert!(result.vectors.is_empty());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_from_config_mock() {
        let config = EmbeddingBackendConfig {
            provider: "mock".to_string(),
            dimensions: Some(12),
            ..EmbeddingBackendConfig::azure("UNUSED_ENDPOINT", "UNUSED_KEY")
        };
        let client = EmbeddingClient::from_config(&config).unwrap();
        assert_eq!(client.policy().max_attempts, 5);

        let result = client.embed(&question()).await.unwrap();
        assert_eq!(result.vectors[0].len(), 12);
        assert_eq!(result.retries, 0);
    }
}
