//! Error types for civic-rag.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! prompt rendering and the retrieval/generation failure taxonomy of the
//! question-answering pipeline.

use thiserror::Error;

/// Unified error type for civic-rag.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// Pipeline layers decide per variant whether to degrade or propagate:
/// `DimensionMismatch` is recovered by exclusion, `EmbeddingUnavailable`
/// degrades a branch to empty results, `GenerationUnavailable` degrades to a
/// visible placeholder, and only `AllBranchesFailed` reaches the boundary.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Document store and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Remote embedding call exhausted its retries or hit a non-retryable error
    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Embedding length disagreement between a query and a document
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Completion call failed
    #[error("Generation service unavailable: {0}")]
    GenerationUnavailable(String),

    /// No document survived ranking in any collection
    #[error("No relevant documents found")]
    EmptyResultSet,

    /// Every downstream branch of a request failed
    #[error("All downstream services failed: {0}")]
    AllBranchesFailed(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = AppError::DimensionMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 2");
    }

    #[test]
    fn test_from_serde_json() {
        let err: AppError = serde_json::from_str::<Vec<f32>>("[1,").unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
