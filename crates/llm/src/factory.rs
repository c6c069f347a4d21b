//! LLM provider factory.
//!
//! Creates the completion client described by the generation configuration,
//! resolving endpoint and credential from the environment once.

use crate::client::LlmClient;
use crate::providers::chat::DEFAULT_OPENAI_URL;
use crate::providers::ollama::DEFAULT_OLLAMA_URL;
use crate::providers::{ChatCompletionsClient, ChatFlavor, OllamaClient};
use civic_core::config::GenerationConfig;
use civic_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Default Azure API version when none is configured.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-06-01";

/// Supported completion providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Azure,
    OpenAI,
    Ollama,
}

impl std::str::FromStr for ProviderType {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "azure" | "azure-openai" => Ok(Self::Azure),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(AppError::Config(format!("Unknown provider: {}", s))),
        }
    }
}

/// Create an LLM client from the generation configuration.
///
/// # Errors
/// Returns error if:
/// - Provider is unknown
/// - Required secrets or endpoints are missing
/// - Client initialization fails
pub fn create_client(config: &GenerationConfig) -> AppResult<Arc<dyn LlmClient>> {
    let provider: ProviderType = config.provider.parse()?;
    let timeout = Duration::from_secs(config.timeout_secs);

    match provider {
        ProviderType::Ollama => {
            let base_url = config
                .resolve_endpoint()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            Ok(Arc::new(OllamaClient::new(base_url, timeout)?))
        }
        ProviderType::Azure => {
            let endpoint = config.resolve_endpoint().ok_or_else(|| {
                AppError::Config("Azure provider requires an endpoint".to_string())
            })?;
            let api_key = config.resolve_api_key().ok_or_else(|| {
                AppError::Config("Azure provider requires API key".to_string())
            })?;
            let api_version = config
                .resolve_api_version()
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());

            Ok(Arc::new(ChatCompletionsClient::new(
                endpoint,
                api_key,
                ChatFlavor::Azure { api_version },
                timeout,
            )?))
        }
        ProviderType::OpenAI => {
            let endpoint = config
                .resolve_endpoint()
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
            let api_key = config.resolve_api_key().ok_or_else(|| {
                AppError::Config("OpenAI provider requires API key".to_string())
            })?;

            Ok(Arc::new(ChatCompletionsClient::new(
                endpoint,
                api_key,
                ChatFlavor::OpenAi,
                timeout,
            )?))
        }
    }
}
