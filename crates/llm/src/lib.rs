//! LLM integration crate for civic-rag.
//!
//! This crate provides a provider-agnostic abstraction over text-completion
//! services. Answer generation only needs one call shape: a system
//! instruction plus a user turn in, one completion out.
//!
//! # Providers
//! - **Azure OpenAI** / **OpenAI**: chat-completions API
//! - **Ollama**: local runtime for development
//!
//! # Example
//! ```no_run
//! use civic_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new("http://localhost:11434", Duration::from_secs(60))?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2").with_system("Be brief.");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, ProviderType};
pub use providers::{ChatCompletionsClient, ChatFlavor, OllamaClient};
