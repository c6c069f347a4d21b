//! Prompt loader for built-in templates and YAML overrides.

use crate::types::{PromptDefinition, FUSION_ID, LEGISLATIVE_ID, PREAMBLE_ID, SERVICE_ID};
use civic_core::{AppError, AppResult};
use std::path::Path;

/// Directory, relative to the workspace, holding prompt overrides.
pub const PROMPTS_DIR: &str = ".civic/prompts";

const PREAMBLE_TEMPLATE: &str = "You are a virtual assistant built to answer questions from the public. \
Your answers may include numeric information such as references to laws or links, \
and must be based exclusively on the content presented below. \
Keep the exact name, number/year and articles of every legal act you cite, \
and keep every link from the content unchanged.\n\n";

const LEGISLATIVE_TEMPLATE: &str =
    "Question: {{question}}\nAnswer based on these council decisions:\n\n{{context}}";

const SERVICE_TEMPLATE: &str =
    "Question: {{question}}\nAnswer based on these public services:\n\n{{context}}";

const FUSION_TEMPLATE: &str = "Question: {{question}}\n\
Answer the question by combining the two partial answers below into one clear response.\n\n\
Public services answer:\n{{service_response}}\n\n\
Council decisions answer:\n{{legislative_response}}";

/// The four templates used by the answering pipeline.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// Policy preamble placed before every context block
    pub preamble: PromptDefinition,
    /// Partial-answer template for council decisions
    pub legislative: PromptDefinition,
    /// Partial-answer template for public services
    pub service: PromptDefinition,
    /// Fusion template combining both partial answers
    pub fusion: PromptDefinition,
}

impl PromptSet {
    /// Built-in templates.
    pub fn builtin() -> Self {
        Self {
            preamble: PromptDefinition::builtin(PREAMBLE_ID, "Answer policy", PREAMBLE_TEMPLATE),
            legislative: PromptDefinition::builtin(
                LEGISLATIVE_ID,
                "Council decisions answer",
                LEGISLATIVE_TEMPLATE,
            ),
            service: PromptDefinition::builtin(SERVICE_ID, "Public services answer", SERVICE_TEMPLATE),
            fusion: PromptDefinition::builtin(FUSION_ID, "Fused answer", FUSION_TEMPLATE),
        }
    }

    /// Built-in templates, each replaced by `<workspace>/.civic/prompts/<id>.yml`
    /// when that file exists.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let mut set = Self::builtin();
        for slot in [
            &mut set.preamble,
            &mut set.legislative,
            &mut set.service,
            &mut set.fusion,
        ] {
            if prompt_path(workspace_path, &slot.id).exists() {
                *slot = load_prompt(workspace_path, &slot.id)?;
            }
        }
        Ok(set)
    }
}

fn prompt_path(workspace_path: &Path, prompt_id: &str) -> std::path::PathBuf {
    workspace_path
        .join(PROMPTS_DIR)
        .join(format!("{}.yml", prompt_id))
}

/// Load a prompt definition by ID from the workspace.
///
/// This function searches for a prompt file named `<id>.yml` in the
/// `.civic/prompts/` directory.
///
/// # Example
/// ```no_run
/// use civic_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "answer.fusion")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompt_path(workspace_path, prompt_id);

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file {:?} declares id '{}', expected '{}'",
            prompt_file, definition.id, prompt_id
        )));
    }

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
