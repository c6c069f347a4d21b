//! Retrieval and answering over the council-decision and public-service
//! collections.
//!
//! A question is embedded per collection, ranked against the cached
//! document vectors, answered once per collection and fused into a single
//! final answer.

pub mod cache;
pub mod embeddings;
pub mod format;
pub mod loader;
pub mod pipeline;
pub mod rag;
pub mod rank;
pub mod retriever;
pub mod types;

// Re-export commonly used types
pub use cache::{CollectionSnapshot, CollectionStats, DocumentCache};
pub use embeddings::{EmbeddingClient, Embeddings, RetryPolicy};
pub use loader::{CsvDocumentSource, DocumentSource, InMemorySource};
pub use pipeline::{cache_from_config, Pipeline};
pub use rag::{
    AnswerGenerator, FusedAnswer, FusionOrchestrator, FusionOutcome, PartialAnswer,
    NO_DOCUMENTS_MESSAGE,
};
pub use rank::{cosine_similarity, rank};
pub use retriever::{Retriever, DEFAULT_TOP_K};
pub use types::{Collection, Document, RankedDocument};
