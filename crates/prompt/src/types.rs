//! Prompt types for civic-rag.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of the policy preamble placed before every context block.
pub const PREAMBLE_ID: &str = "answer.preamble";

/// Identifier of the council-decisions partial-answer template.
pub const LEGISLATIVE_ID: &str = "answer.legislative";

/// Identifier of the public-services partial-answer template.
pub const SERVICE_ID: &str = "answer.service";

/// Identifier of the fusion template.
pub const FUSION_ID: &str = "answer.fusion";

/// A prompt definition, built in or loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Template string with Handlebars syntax
    pub template: String,
}

impl PromptDefinition {
    /// Create a built-in definition.
    pub fn builtin(id: &str, title: &str, template: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            api_version: "1.0".to_string(),
            created_by: "builtin".to_string(),
            template: template.to_string(),
        }
    }
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System instruction: policy preamble followed by the context block
    pub system: String,

    /// User turn: the question
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: answer.fusion
title: Fusion
apiVersion: "1.0"
createdBy: test
template: "{{question}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "answer.fusion");
        assert_eq!(def.created_by, "test");
        assert_eq!(def.template, "{{question}}");
    }

    #[test]
    fn test_builtin_definition() {
        let def = PromptDefinition::builtin(PREAMBLE_ID, "Preamble", "text");
        assert_eq!(def.api_version, "1.0");
        assert_eq!(def.created_by, "builtin");
    }
}
