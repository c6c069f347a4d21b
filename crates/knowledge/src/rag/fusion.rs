//! Two-collection answering with a final fusion step.
//!
//! `Retrieving -> Answering -> Fusing -> Done`. Both retrievals run
//! concurrently, then both partial answers, and the fusion call strictly
//! after them. Dropping the returned future (a disconnected client)
//! abandons every pending call, so fusion is never started for it.

use crate::format::format;
use crate::rag::generator::{placeholder_reason, AnswerGenerator};
use crate::rag::types::{
    generation_placeholder, FusedAnswer, FusionOutcome, FusionState, PartialAnswer,
};
use crate::retriever::{Retriever, DEFAULT_TOP_K};
use crate::types::{Collection, RankedDocument};
use civic_core::{AppError, AppResult};
use tracing::{debug, instrument, warn};

/// Orchestrates retrieval, per-collection answers and fusion.
#[derive(Debug, Clone)]
pub struct FusionOrchestrator {
    retriever: Retriever,
    generator: AnswerGenerator,
    top_k: usize,
}

/// A partial answer attempt before the failure is rendered.
struct Branch {
    collection: Collection,
    document_ids: Vec<String>,
    result: AppResult<String>,
}

impl Branch {
    fn into_partial(self) -> PartialAnswer {
        let (answer, failed) = match self.result {
            Ok(answer) => (answer, false),
            Err(e) => (generation_placeholder(&placeholder_reason(&e)), true),
        };
        PartialAnswer {
            collection: self.collection,
            document_ids: self.document_ids,
            answer,
            failed,
        }
    }
}

impl FusionOrchestrator {
    pub fn new(retriever: Retriever, generator: AnswerGenerator) -> Self {
        Self {
            retriever,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer a question from both collections.
    ///
    /// # Errors
    /// `AllBranchesFailed` when both query embeddings failed, or when every
    /// attempted partial answer failed. Every other failure degrades.
    #[instrument(skip(self, question), fields(top_k = self.top_k))]
    pub async fn answer(&self, question: &str) -> AppResult<FusedAnswer> {
        let (legislative, service) = match self.retrieve_both(question).await {
            Ok(results) => results,
            Err(AppError::EmptyResultSet) => {
                debug!(state = ?FusionState::Done, "no documents in either collection");
                return Ok(FusedAnswer::no_documents(question));
            }
            Err(e) => return Err(e),
        };

        debug!(
            state = ?FusionState::Answering,
            legislative = legislative.len(),
            service = service.len()
        );
        let (legislative_branch, service_branch) = futures::join!(
            self.branch(question, Collection::Legislative, &legislative),
            self.branch(question, Collection::Service, &service),
        );

        match (legislative_branch, service_branch) {
            (None, None) => Ok(FusedAnswer::no_documents(question)),
            (Some(only), None) | (None, Some(only)) => self.single_source(question, only),
            (Some(legislative), Some(service)) => {
                self.fuse(question, legislative, service).await
            }
        }
    }

    /// Ranked documents of both collections.
    ///
    /// A single failed query embedding degrades that collection to empty.
    /// `EmptyResultSet` when neither collection yields a document,
    /// `AllBranchesFailed` when both embeddings failed.
    async fn retrieve_both(
        &self,
        question: &str,
    ) -> AppResult<(Vec<RankedDocument>, Vec<RankedDocument>)> {
        debug!(state = ?FusionState::Retrieving);
        let (legislative, service) = futures::join!(
            self.retriever
                .try_retrieve(question, Collection::Legislative, self.top_k),
            self.retriever
                .try_retrieve(question, Collection::Service, self.top_k),
        );

        let (legislative, service) = match (legislative, service) {
            (Err(l), Err(s)) => {
                return Err(AppError::AllBranchesFailed(format!(
                    "legislative retrieval: {}; service retrieval: {}",
                    l, s
                )))
            }
            (l, s) => (degrade(Collection::Legislative, l), degrade(Collection::Service, s)),
        };

        if legislative.is_empty() && service.is_empty() {
            return Err(AppError::EmptyResultSet);
        }
        Ok((legislative, service))
    }

    /// Partial answer of a collection; `None` when it had no documents.
    async fn branch(
        &self,
        question: &str,
        collection: Collection,
        documents: &[RankedDocument],
    ) -> Option<Branch> {
        if documents.is_empty() {
            return None;
        }

        let document_ids = documents.iter().map(|r| r.document.id.clone()).collect();
        let result = match self
            .generator
            .partial_context(collection, question, &format(documents))
        {
            Ok(context) => self.generator.generate(question, &context).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            warn!("Partial answer for {} failed: {}", collection, e);
        }

        Some(Branch {
            collection,
            document_ids,
            result,
        })
    }

    fn single_source(&self, question: &str, branch: Branch) -> AppResult<FusedAnswer> {
        if let Err(e) = &branch.result {
            return Err(AppError::AllBranchesFailed(format!(
                "{} answer: {}",
                branch.collection, e
            )));
        }

        let partial = branch.into_partial();
        debug!(state = ?FusionState::Done, source = %partial.collection, "single source");
        Ok(FusedAnswer {
            question: question.to_string(),
            answer: partial.answer.clone(),
            partials: vec![partial],
            outcome: FusionOutcome::SingleSource,
        })
    }

    async fn fuse(
        &self,
        question: &str,
        legislative: Branch,
        service: Branch,
    ) -> AppResult<FusedAnswer> {
        if let (Err(l), Err(s)) = (&legislative.result, &service.result) {
            return Err(AppError::AllBranchesFailed(format!(
                "legislative answer: {}; service answer: {}",
                l, s
            )));
        }

        let legislative = legislative.into_partial();
        let service = service.into_partial();

        debug!(state = ?FusionState::Fusing);
        let fused = match self
            .generator
            .fusion_context(question, &legislative.answer, &service.answer)
        {
            Ok(context) => self.generator.generate(question, &context).await,
            Err(e) => Err(e),
        };

        let (answer, outcome) = match fused {
            Ok(answer) => (answer, FusionOutcome::Fused),
            Err(e) => {
                warn!("Fusion failed, falling back to partial answers: {}", e);
                (fallback_answer(&legislative, &service), FusionOutcome::FusionFallback)
            }
        };

        debug!(state = ?FusionState::Done, outcome = ?outcome);
        Ok(FusedAnswer {
            question: question.to_string(),
            partials: vec![legislative, service],
            answer,
            outcome,
        })
    }
}

fn degrade(collection: Collection, result: AppResult<Vec<RankedDocument>>) -> Vec<RankedDocument> {
    result.unwrap_or_else(|e| {
        warn!("Retrieval from {} degraded to empty: {}", collection, e);
        Vec::new()
    })
}

/// Successful partial answers, legislative first.
fn fallback_answer(legislative: &PartialAnswer, service: &PartialAnswer) -> String {
    [legislative, service]
        .iter()
        .filter(|p| !p.failed)
        .map(|p| p.answer.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DocumentCache;
    use crate::embeddings::testing::{fast_policy, ScriptedBackend};
    use crate::embeddings::{BackendError, EmbeddingClient};
    use crate::loader::InMemorySource;
    use crate::rag::generator::testing::ScriptedLlm;
    use crate::rag::types::NO_DOCUMENTS_MESSAGE;
    use crate::types::Document;
    use civic_prompt::PromptSet;
    use std::sync::Arc;

    fn legislative_docs() -> Vec<Document> {
        vec![Document::new("0", Collection::Legislative)
            .with_field("HCL", "155/2009")
            .with_embedding(vec![1.0, 0.0])]
    }

    fn service_docs() -> Vec<Document> {
        vec![Document::new("0", Collection::Service)
            .with_field("name", "Parcare rezidentiala")
            .with_embedding(vec![0.0, 1.0])]
    }

    fn embedder(result: Result<Vec<Vec<f32>>, BackendError>) -> EmbeddingClient {
        EmbeddingClient::new(Arc::new(ScriptedBackend::new(vec![result])), fast_policy())
    }

    fn orchestrator(
        legislative: Vec<Document>,
        service: Vec<Document>,
        llm: Arc<ScriptedLlm>,
    ) -> FusionOrchestrator {
        orchestrator_with(
            legislative,
            service,
            llm,
            Ok(vec![vec![0.6, 0.8]]),
            Ok(vec![vec![0.6, 0.8]]),
        )
    }

    fn orchestrator_with(
        legislative: Vec<Document>,
        service: Vec<Document>,
        llm: Arc<ScriptedLlm>,
        legislative_embedding: Result<Vec<Vec<f32>>, BackendError>,
        service_embedding: Result<Vec<Vec<f32>>, BackendError>,
    ) -> FusionOrchestrator {
        let cache = Arc::new(
            DocumentCache::new()
                .with_source(
                    Collection::Legislative,
                    Arc::new(InMemorySource::new(legislative)),
                    None,
                )
                .with_source(Collection::Service, Arc::new(InMemorySource::new(service)), None),
        );
        let retriever = Retriever::new(cache)
            .with_embedder(Collection::Legislative, embedder(legislative_embedding))
            .with_embedder(Collection::Service, embedder(service_embedding));
        let generator = AnswerGenerator::new(llm, "gpt-4o", PromptSet::builtin());
        FusionOrchestrator::new(retriever, generator)
    }

    fn system(request: &civic_llm::LlmRequest) -> &str {
        request.system.as_deref().unwrap_or_default()
    }

    /// Answers by inspecting which context the request carries.
    fn by_context(request: &civic_llm::LlmRequest) -> AppResult<String> {
        let system = system(request);
        if system.contains("Council decisions answer:") {
            Ok("fused".to_string())
        } else if system.contains("Decision: 155/2009") {
            Ok("from decisions".to_string())
        } else {
            Ok("from services".to_string())
        }
    }

    #[tokio::test]
    async fn test_fuses_both_partials() {
        let llm = Arc::new(ScriptedLlm::new(by_context));
        let result = orchestrator(legislative_docs(), service_docs(), llm.clone())
            .answer("Cum obtin abonament de parcare?")
            .await
            .unwrap();

        assert_eq!(result.outcome, FusionOutcome::Fused);
        assert_eq!(result.answer, "fused");
        assert_eq!(result.partial_text(Collection::Legislative), "from decisions");
        assert_eq!(result.partial_text(Collection::Service), "from services");
        assert_eq!(llm.calls(), 3);

        // Fusion runs last and sees both partial answers
        let requests = llm.requests.lock().unwrap();
        let fusion = system(&requests[2]);
        assert!(fusion.contains("from decisions"));
        assert!(fusion.contains("from services"));
    }

    #[tokio::test]
    async fn test_both_empty_skips_generator() {
        let llm = Arc::new(ScriptedLlm::new(by_context));
        let result = orchestrator(Vec::new(), Vec::new(), llm.clone())
            .answer("q")
            .await
            .unwrap();

        assert_eq!(result.answer, NO_DOCUMENTS_MESSAGE);
        assert_eq!(result.outcome, FusionOutcome::NoDocuments);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_retrieval_with_no_documents_is_empty_result_set() {
        let llm = Arc::new(ScriptedLlm::new(by_context));
        let empty = orchestrator(Vec::new(), Vec::new(), llm);

        let err = empty.retrieve_both("q").await.unwrap_err();
        assert!(matches!(err, AppError::EmptyResultSet));

        let llm = Arc::new(ScriptedLlm::new(by_context));
        let (legislative, service) = orchestrator(legislative_docs(), Vec::new(), llm)
            .retrieve_both("q")
            .await
            .unwrap();
        assert!(!legislative.is_empty());
        assert!(service.is_empty());
    }

    #[tokio::test]
    async fn test_single_collection_returns_partial_directly() {
        let llm = Arc::new(ScriptedLlm::new(by_context));
        let result = orchestrator(Vec::new(), service_docs(), llm.clone())
            .answer("q")
            .await
            .unwrap();

        assert_eq!(result.outcome, FusionOutcome::SingleSource);
        assert_eq!(result.answer, "from services");
        assert!(result.partial(Collection::Legislative).is_none());
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_one_partial_failure_still_answers() {
        let llm = Arc::new(ScriptedLlm::new(|request| {
            let system = request.system.as_deref().unwrap_or_default();
            if system.contains("Council decisions answer:") {
                Ok("fused anyway".to_string())
            } else if system.contains("Decision: 155/2009") {
                Err(AppError::Llm("content filter".to_string()))
            } else {
                Ok("from services".to_string())
            }
        }));
        let result = orchestrator(legislative_docs(), service_docs(), llm.clone())
            .answer("q")
            .await
            .unwrap();

        assert_eq!(result.outcome, FusionOutcome::Fused);
        assert_eq!(result.answer, "fused anyway");
        let failed = result.partial(Collection::Legislative).unwrap();
        assert!(failed.failed);
        assert_eq!(failed.answer, "Error generating response: content filter");

        let requests = llm.requests.lock().unwrap();
        assert!(system(&requests[2]).contains("Error generating response: content filter"));
    }

    #[tokio::test]
    async fn test_fusion_failure_falls_back_to_successful_partial() {
        let llm = Arc::new(ScriptedLlm::new(|request| {
            let system = request.system.as_deref().unwrap_or_default();
            if system.contains("Council decisions answer:") {
                Err(AppError::Llm("503".to_string()))
            } else if system.contains("Decision: 155/2009") {
                Err(AppError::Llm("content filter".to_string()))
            } else {
                Ok("from services".to_string())
            }
        }));
        let result = orchestrator(legislative_docs(), service_docs(), llm)
            .answer("q")
            .await
            .unwrap();

        assert_eq!(result.outcome, FusionOutcome::FusionFallback);
        assert_eq!(result.answer, "from services");
    }

    #[tokio::test]
    async fn test_all_partials_failing_is_aggregate_error() {
        let llm = Arc::new(ScriptedLlm::new(|_| Err(AppError::Llm("down".to_string()))));
        let result = orchestrator(legislative_docs(), service_docs(), llm.clone())
            .answer("q")
            .await;

        assert!(matches!(result, Err(AppError::AllBranchesFailed(_))));
        // Fusion is skipped
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_single_partial_failing_is_aggregate_error() {
        let llm = Arc::new(ScriptedLlm::new(|_| Err(AppError::Llm("down".to_string()))));
        let result = orchestrator(legislative_docs(), Vec::new(), llm)
            .answer("q")
            .await;

        assert!(matches!(result, Err(AppError::AllBranchesFailed(_))));
    }

    #[tokio::test]
    async fn test_one_embedding_failure_degrades_branch() {
        let llm = Arc::new(ScriptedLlm::new(by_context));
        let result = orchestrator_with(
            legislative_docs(),
            service_docs(),
            llm,
            Err(BackendError::Failed("401".to_string())),
            Ok(vec![vec![0.0, 1.0]]),
        )
        .answer("q")
        .await
        .unwrap();

        assert_eq!(result.outcome, FusionOutcome::SingleSource);
        assert_eq!(result.answer, "from services");
    }

    #[tokio::test]
    async fn test_both_embeddings_failing_is_aggregate_error() {
        let llm = Arc::new(ScriptedLlm::new(by_context));
        let result = orchestrator_with(
            legislative_docs(),
            service_docs(),
            llm.clone(),
            Err(BackendError::Failed("401".to_string())),
            Err(BackendError::RateLimited { retry_after: None }),
        )
        .answer("q")
        .await;

        assert!(matches!(result, Err(AppError::AllBranchesFailed(_))));
        assert_eq!(llm.calls(), 0);
    }
}
