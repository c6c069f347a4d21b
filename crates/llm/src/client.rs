//! Completion client abstraction.
//!
//! Answer generation treats a provider as an opaque text-completion
//! service: a system instruction and a single user turn go in, one
//! completion comes back.

use civic_core::AppResult;
use serde::{Deserialize, Serialize};

/// One completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Model or deployment name
    pub model: String,

    /// Instruction block placed before the user turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// User turn
    pub prompt: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Completion text plus accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,

    /// Model reported by the provider, or the requested one
    pub model: String,

    pub usage: LlmUsage,
}

/// Token accounting reported by the provider. Zero when not reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// A text-completion backend (Azure OpenAI, OpenAI, Ollama).
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Short provider name used in logs.
    fn provider_name(&self) -> &str;

    /// Run a single completion. Implementations do not retry; a failed
    /// call is reported as `AppError::Llm`.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_and_builders() {
        let bare = LlmRequest::new("Ce program are primaria?", "gpt-4o");
        assert!(bare.system.is_none());
        assert!(bare.temperature.is_none());

        let request = bare.with_system("Raspunde scurt").with_max_tokens(256);
        assert_eq!(request.system.as_deref(), Some("Raspunde scurt"));
        assert_eq!(request.max_tokens, Some(256));
    }

    #[test]
    fn test_request_serialization_skips_unset() {
        let json = serde_json::to_value(LlmRequest::new("q", "m")).unwrap();
        assert!(json.get("system").is_none());
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["prompt"], "q");
    }

    #[test]
    fn test_usage_total_saturates() {
        assert_eq!(LlmUsage::new(10, 5).total_tokens, 15);
        assert_eq!(LlmUsage::new(u32::MAX, 1).total_tokens, u32::MAX);
    }
}
