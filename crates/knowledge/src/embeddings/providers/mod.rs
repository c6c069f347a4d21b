//! Embedding backend implementations.

pub mod http;
pub mod mock;
pub mod ollama;

pub use http::{AuthStyle, HttpEmbeddingBackend};
pub use mock::MockBackend;
pub use ollama::OllamaEmbeddingBackend;
