//! Answer generation over a context block.

use crate::rag::types::generation_placeholder;
use crate::types::Collection;
use civic_core::config::GenerationConfig;
use civic_core::{AppError, AppResult};
use civic_llm::{create_client, LlmClient, LlmRequest};
use civic_prompt::{build_answer_prompt, render_prompt, PromptDefinition, PromptSet};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// Wraps one completion call: system = preamble + context, user = question.
#[derive(Clone)]
pub struct AnswerGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    prompts: Arc<PromptSet>,
}

impl std::fmt::Debug for AnswerGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerGenerator")
            .field("provider", &self.client.provider_name())
            .field("model", &self.model)
            .finish()
    }
}

impl AnswerGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, prompts: PromptSet) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            prompts: Arc::new(prompts),
        }
    }

    /// Build the generator for the configured completion backend.
    pub fn from_config(config: &GenerationConfig, prompts: PromptSet) -> AppResult<Self> {
        let client = create_client(config)?;
        let mut generator = Self::new(client, config.model.clone(), prompts);
        generator.temperature = config.temperature;
        generator.max_tokens = config.max_tokens;
        Ok(generator)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// One completion call, no retry.
    ///
    /// # Errors
    /// `GenerationUnavailable` carrying the backend's reason.
    #[instrument(skip(self, question, context), fields(provider = self.client.provider_name(), context_len = context.len()))]
    pub async fn generate(&self, question: &str, context: &str) -> AppResult<String> {
        let built = build_answer_prompt(&self.prompts.preamble, context, question)?;

        let mut request = LlmRequest::new(built.user, self.model.clone()).with_system(built.system);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.client.complete(&request).await.map_err(|e| match e {
            AppError::Llm(reason) => AppError::GenerationUnavailable(reason),
            other => AppError::GenerationUnavailable(other.to_string()),
        })?;

        tracing::debug!(
            "Generated {} chars ({} tokens)",
            response.content.len(),
            response.usage.total_tokens
        );

        Ok(response.content)
    }

    /// Like [`AnswerGenerator::generate`], turning a failure into the
    /// visible `Error generating response: <reason>` placeholder.
    pub async fn generate_or_placeholder(&self, question: &str, context: &str) -> String {
        match self.generate(question, context).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Answer generation failed: {}", e);
                generation_placeholder(&placeholder_reason(&e))
            }
        }
    }

    /// Wrap a formatted context block in the collection's template.
    pub fn partial_context(
        &self,
        collection: Collection,
        question: &str,
        formatted: &str,
    ) -> AppResult<String> {
        let template = match collection {
            Collection::Legislative => &self.prompts.legislative,
            Collection::Service => &self.prompts.service,
        };
        render(template, &[("question", question), ("context", formatted)])
    }

    /// Context block holding both partial answers.
    pub fn fusion_context(
        &self,
        question: &str,
        legislative_response: &str,
        service_response: &str,
    ) -> AppResult<String> {
        render(
            &self.prompts.fusion,
            &[
                ("question", question),
                ("legislative_response", legislative_response),
                ("service_response", service_response),
            ],
        )
    }
}

/// Reason text shown in the placeholder.
pub(crate) fn placeholder_reason(error: &AppError) -> String {
    match error {
        AppError::GenerationUnavailable(reason) => reason.clone(),
        other => other.to_string(),
    }
}

fn render(template: &PromptDefinition, variables: &[(&str, &str)]) -> AppResult<String> {
    let variables: HashMap<String, String> = variables
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    render_prompt(template, &variables)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use civic_llm::{LlmResponse, LlmUsage};
    use std::sync::Mutex;

    /// Completion client answering from a closure and recording requests.
    pub struct ScriptedLlm {
        respond: Box<dyn Fn(&LlmRequest) -> AppResult<String> + Send + Sync>,
        pub requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedLlm {
        pub fn new(
            respond: impl Fn(&LlmRequest) -> AppResult<String> + Send + Sync + 'static,
        ) -> Self {
            Self {
                respond: Box::new(respond),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedLlm {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let content = (self.respond)(request)?;
            Ok(LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::new(0, 0),
            })
        }
    }
}
