//! Chat-completions provider (Azure OpenAI and OpenAI-compatible APIs).
//!
//! Sends the system instruction and the user turn as a two-message
//! conversation and returns `choices[0].message.content`.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use civic_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default OpenAI base URL.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Which dialect of the chat-completions API to speak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatFlavor {
    /// Azure OpenAI: deployment in the path, `api-key` header, `api-version` query
    Azure { api_version: String },
    /// OpenAI-compatible: model in the body, bearer token
    OpenAi,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Chat-completions client.
pub struct ChatCompletionsClient {
    base_url: String,
    api_key: String,
    flavor: ChatFlavor,
    client: reqwest::Client,
}

impl ChatCompletionsClient {
    /// Create a client for the given endpoint, credential and dialect.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        flavor: ChatFlavor,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            flavor,
            client,
        })
    }

    /// Full URL of the completions call for a model.
    fn completions_url(&self, model: &str) -> String {
        match &self.flavor {
            ChatFlavor::Azure { api_version } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.base_url, model, api_version
            ),
            ChatFlavor::OpenAi => format!("{}/chat/completions", self.base_url),
        }
    }

    fn to_chat_request<'a>(&self, request: &'a LlmRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            // Azure selects the model through the deployment path
            model: match self.flavor {
                ChatFlavor::Azure { .. } => None,
                ChatFlavor::OpenAi => Some(request.model.as_str()),
            },
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    fn convert_response(&self, response: ChatResponse, model: &str) -> AppResult<LlmResponse> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::Llm("Completion returned no choices".to_string()))?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: response.model.unwrap_or_else(|| model.to_string()),
            usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for ChatCompletionsClient {
    fn provider_name(&self) -> &str {
        match self.flavor {
            ChatFlavor::Azure { .. } => "azure",
            ChatFlavor::OpenAi => "openai",
        }
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let url = self.completions_url(&request.model);
        tracing::debug!(
            "Sending chat completion to {} (model: {})",
            self.provider_name(),
            request.model
        );

        let builder = self.client.post(&url).json(&self.to_chat_request(request));
        let builder = match self.flavor {
            ChatFlavor::Azure { .. } => builder.header("api-key", &self.api_key),
            ChatFlavor::OpenAi => builder.bearer_auth(&self.api_key),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send chat completion: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Chat completion API error ({}): {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse chat completion: {}", e)))?;

        self.convert_response(chat_response, &request.model)
    }
}
