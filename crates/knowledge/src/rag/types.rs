//! Answering pipeline response types.

use crate::types::Collection;
use serde::{Deserialize, Serialize};

/// Answer returned when neither collection produced a document.
pub const NO_DOCUMENTS_MESSAGE: &str = "No relevant documents found for your question.";

/// Prefix of the placeholder standing in for a failed completion.
pub const GENERATION_ERROR_PREFIX: &str = "Error generating response: ";

/// Stage of a fused answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionState {
    Retrieving,
    Answering,
    Fusing,
    Done,
}

/// How the final answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FusionOutcome {
    /// Neither collection had a relevant document; no completion was requested
    NoDocuments,
    /// Only one collection had documents; its partial answer is final
    SingleSource,
    /// Both partial answers were merged by a fusion completion
    Fused,
    /// The fusion completion failed; the partial answers stand in for it
    FusionFallback,
}

/// The answer produced from one collection's documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialAnswer {
    pub collection: Collection,

    /// Identifiers of the documents given as context, best first
    pub document_ids: Vec<String>,

    /// Completion text, or the error placeholder when `failed`
    pub answer: String,

    pub failed: bool,
}

/// Result of answering one question across both collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusedAnswer {
    pub question: String,

    /// Partial answers of the collections that had documents
    pub partials: Vec<PartialAnswer>,

    /// Final answer text
    pub answer: String,

    pub outcome: FusionOutcome,
}

impl FusedAnswer {
    /// Terminal answer for a question no collection could serve.
    pub fn no_documents(question: &str) -> Self {
        Self {
            question: question.to_string(),
            partials: Vec::new(),
            answer: NO_DOCUMENTS_MESSAGE.to_string(),
            outcome: FusionOutcome::NoDocuments,
        }
    }

    /// Partial answer of a collection, if it was attempted.
    pub fn partial(&self, collection: Collection) -> Option<&PartialAnswer> {
        self.partials.iter().find(|p| p.collection == collection)
    }

    /// Partial answer text of a collection, empty when not attempted.
    pub fn partial_text(&self, collection: Collection) -> &str {
        self.partial(collection)
            .map(|p| p.answer.as_str())
            .unwrap_or_default()
    }
}

/// Visible placeholder for a failed completion.
pub fn generation_placeholder(reason: &str) -> String {
    format!("{}{}", GENERATION_ERROR_PREFIX, reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_documents_answer() {
        let answer = FusedAnswer::no_documents("Unde platesc taxa?");
        assert_eq!(answer.answer, NO_DOCUMENTS_MESSAGE);
        assert_eq!(answer.outcome, FusionOutcome::NoDocuments);
        assert!(answer.partials.is_empty());
        assert_eq!(answer.partial_text(Collection::Service), "");
    }

    #[test]
    fn test_serialization_shape() {
        let answer = FusedAnswer {
            question: "q".to_string(),
            partials: vec![PartialAnswer {
                collection: Collection::Legislative,
                document_ids: vec!["0".to_string()],
                answer: "a".to_string(),
                failed: false,
            }],
            answer: "a".to_string(),
            outcome: FusionOutcome::SingleSource,
        };

        let json = serde_json::to_value(&answer).unwrap();
        assert_eq!(json["outcome"], "singleSource");
        assert_eq!(json["partials"][0]["collection"], "legislative");
        assert_eq!(json["partials"][0]["documentIds"][0], "0");
    }

    #[test]
    fn test_placeholder() {
        assert_eq!(
            generation_placeholder("timeout"),
            "Error generating response: timeout"
        );
    }
}
