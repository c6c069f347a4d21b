//! Prompt system for civic-rag.
//!
//! This crate provides the answering pipeline's templates:
//! - Built-in policy preamble, partial-answer and fusion templates
//! - YAML overrides from `.civic/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_answer_prompt, render_prompt};
pub use loader::{load_prompt, PromptSet, PROMPTS_DIR};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptDefinition, FUSION_ID, LEGISLATIVE_ID, PREAMBLE_ID,
    SERVICE_ID,
};
