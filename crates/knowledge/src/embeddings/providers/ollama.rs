//! Ollama embedding backend.
//!
//! Embeds a batch of texts through Ollama's local `/api/embed` endpoint,
//! which accepts a list input and returns one vector per entry.

use crate::embeddings::provider::{BackendError, EmbeddingBackend};
use civic_core::{AppError, AppResult};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Default Ollama API base URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default embedding model.
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";

const EMBED_ENDPOINT: &str = "/api/embed";

/// Ollama embedding backend using the local API.
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingBackend {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaEmbeddingBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::Knowledge(format!("Failed to create HTTP client for Ollama: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn embed_url(&self) -> String {
        format!("{}{}", self.base_url, EMBED_ENDPOINT)
    }
}

#[async_trait::async_trait]
impl EmbeddingBackend for OllamaEmbeddingBackend {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        let url = self.embed_url();
        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| BackendError::Failed(format!("Failed to send request to Ollama: {}", e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = super::http::parse_retry_after(response.headers());
            return Err(BackendError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);
            return Err(BackendError::Failed(format!(
                "Ollama API error ({}): {}",
                status, message
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Failed(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(body.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_url_trims_trailing_slash() {
        let backend =
            OllamaEmbeddingBackend::new("http://localhost:11434/", "nomic-embed-text", Duration::from_secs(2))
                .unwrap();
        assert_eq!(backend.embed_url(), "http://localhost:11434/api/embed");
    }

    #[test]
    fn test_response_parsing() {
        let body: EmbedResponse =
            serde_json::from_str(r#"{"model":"m","embeddings":[[0.1,0.2],[0.3,0.4]]}"#).unwrap();
        assert_eq!(body.embeddings.len(), 2);
        assert_eq!(body.embeddings[1], vec![0.3, 0.4]);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_failure() {
        // Port 9 (discard) is not an Ollama server
        let backend =
            OllamaEmbeddingBackend::new("http://127.0.0.1:9", "m", Duration::from_millis(500)).unwrap();
        let result = backend.embed_batch(&["text".to_string()]).await;
        assert!(matches!(result, Err(BackendError::Failed(_))));
    }
}
