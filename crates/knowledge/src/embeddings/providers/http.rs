//! OpenAI-style embeddings over HTTP (Azure OpenAI and OpenAI).
//!
//! Sends `{"input": [...]}` to the endpoint and reads `data[].embedding`.
//! A 429 status is reported as [`BackendError::RateLimited`] together with
//! the server's `Retry-After` hint.

use crate::embeddings::provider::{BackendError, EmbeddingBackend};
use civic_core::{AppError, AppResult};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Default OpenAI embeddings URL.
pub const DEFAULT_OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// How the credential is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// `api-key: <key>` (Azure)
    ApiKeyHeader,
    /// `Authorization: Bearer <key>` (OpenAI)
    Bearer,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Embedding backend for OpenAI-compatible `/embeddings` endpoints.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingBackend {
    client: Client,
    endpoint: String,
    api_key: String,
    auth: AuthStyle,
    model: Option<String>,
}

impl HttpEmbeddingBackend {
    /// Create a backend for a full endpoint URL.
    ///
    /// Azure endpoints already name the deployment and API version, so the
    /// URL is used verbatim.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        auth: AuthStyle,
        model: Option<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::Knowledge(format!("Failed to create HTTP client for embeddings: {}", e))
        })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            auth,
            model,
        })
    }
}

/// Seconds from a `Retry-After` header; HTTP-date values are not honoured.
///
/// Values that do not fit a `Duration` (negative, NaN, overflowing) are
/// ignored so the caller falls back to its default wait.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    let seconds: f64 = value.parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

fn into_vectors(response: EmbeddingResponse) -> Vec<Vec<f32>> {
    let mut data = response.data;
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
    }
    data.into_iter().map(|d| d.embedding).collect()
}

#[async_trait::async_trait]
impl EmbeddingBackend for HttpEmbeddingBackend {
    fn provider_name(&self) -> &str {
        match self.auth {
            AuthStyle::ApiKeyHeader => "azure",
            AuthStyle::Bearer => "openai",
        }
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = self.provider_name()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        let request = EmbeddingRequest {
            input: texts,
            model: self.model.as_deref(),
        };

        let builder = self.client.post(&self.endpoint).json(&request);
        let builder = match self.auth {
            AuthStyle::ApiKeyHeader => builder.header("api-key", &self.api_key),
            AuthStyle::Bearer => builder.bearer_auth(&self.api_key),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::Failed(format!("Failed to send embedding request: {}", e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = parse_retry_after(response.headers());
            return Err(BackendError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BackendError::Failed(format!(
                "Embedding API error ({}): {}",
                status, error_text
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Failed(format!("Failed to parse embedding response: {}", e)))?;

        let vectors = into_vectors(body);
        debug!("Received {} embeddings", vectors.len());
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_parse_retry_after_missing_or_date() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_parse_retry_after_out_of_range() {
        for raw in ["1e20", "-3", "NaN", "inf"] {
            let mut headers = HeaderMap::new();
            headers.insert(RETRY_AFTER, HeaderValue::from_static(raw));
            assert_eq!(parse_retry_after(&headers), None, "value {}", raw);
        }

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_vectors_sorted_by_index() {
        let body: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
        )
        .unwrap();

        assert_eq!(into_vectors(body), vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_request_body() {
        let texts = vec!["Ce taxe platesc?".to_string()];
        let body = serde_json::to_value(EmbeddingRequest {
            input: &texts,
            model: None,
        })
        .unwrap();

        assert_eq!(body, serde_json::json!({"input": ["Ce taxe platesc?"]}));
    }

    #[test]
    fn test_provider_name_follows_auth() {
        let backend = HttpEmbeddingBackend::new(
            DEFAULT_OPENAI_EMBEDDINGS_URL,
            "key",
            AuthStyle::Bearer,
            Some("text-embedding-3-small".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(backend.provider_name(), "openai");
    }
}
