//! Prompt builder for rendering templates and composing answer prompts.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use civic_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Render a prompt definition with the given variables.
///
/// Missing variables render as empty strings.
///
/// # Example
/// ```
/// use civic_prompt::{render_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// let def = PromptDefinition::builtin("demo", "Demo", "Question: {{question}}");
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "What is HCL 155/2009?".to_string());
///
/// let rendered = render_prompt(&def, &vars).unwrap();
/// assert_eq!(rendered, "Question: What is HCL 155/2009?");
/// ```
pub fn render_prompt(
    definition: &PromptDefinition,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    tracing::trace!("Rendering prompt: {}", definition.id);
    render_template(&definition.id, &definition.template, variables)
}

/// Compose the two-message prompt sent to the completion service.
///
/// The system instruction is the policy preamble followed by the context
/// block; the user turn is the question verbatim.
pub fn build_answer_prompt(
    preamble: &PromptDefinition,
    context: &str,
    question: &str,
) -> AppResult<BuiltPrompt> {
    let mut variables = HashMap::new();
    variables.insert("question".to_string(), question.to_string());

    let mut system = render_prompt(preamble, &variables)?;
    system.push_str(context);

    variables.insert("context".to_string(), context.to_string());

    Ok(BuiltPrompt {
        system,
        user: question.to_string(),
        metadata: BuiltPromptMetadata {
            source_prompt_id: preamble.id.clone(),
            resolved_variables: variables,
        },
    })
}

/// Render a Handlebars template with variables.
fn render_template(
    name: &str,
    template: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string(name, template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template '{}': {}", name, e)))?;

    handlebars
        .render(name, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template '{}': {}", name, e)))
}
