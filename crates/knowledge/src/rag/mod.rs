//! Answer generation and multi-collection fusion.

pub mod fusion;
pub mod generator;
pub mod types;

pub use fusion::FusionOrchestrator;
pub use generator::AnswerGenerator;
pub use types::{
    generation_placeholder, FusedAnswer, FusionOutcome, FusionState, PartialAnswer,
    GENERATION_ERROR_PREFIX, NO_DOCUMENTS_MESSAGE,
};
