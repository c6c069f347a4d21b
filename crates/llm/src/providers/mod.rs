//! Completion provider implementations.

pub mod chat;
pub mod ollama;

pub use chat::{ChatCompletionsClient, ChatFlavor};
pub use ollama::OllamaClient;
