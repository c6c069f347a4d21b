//! HTTP handlers for the question-answering API.

use super::errors::ApiError;
use axum::extract::{Query, State};
use axum::Json;
use civic_knowledge::{Collection, CollectionStats, FusedAnswer, FusionOutcome, Pipeline};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// `?question=` query parameter.
#[derive(Debug, Deserialize)]
pub struct QuestionParams {
    pub question: String,
}

/// `{"question": ...}` request body.
#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

/// `{"response": ...}` answer body.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub response: String,
}

/// Answer with both partial answers, keyed as the chat frontend expects.
#[derive(Debug, Serialize, Deserialize)]
pub struct DetailedResponse {
    pub question: String,
    #[serde(rename = "hcls_response")]
    pub legislative_response: String,
    #[serde(rename = "servicii_response")]
    pub service_response: String,
    pub final_response: String,
    pub outcome: FusionOutcome,
}

impl From<FusedAnswer> for DetailedResponse {
    fn from(answer: FusedAnswer) -> Self {
        Self {
            legislative_response: answer.partial_text(Collection::Legislative).to_string(),
            service_response: answer.partial_text(Collection::Service).to_string(),
            question: answer.question,
            final_response: answer.answer,
            outcome: answer.outcome,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub collections: Vec<CollectionStats>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub reloaded: Vec<CollectionStats>,
}

fn require_question(question: &str) -> Result<&str, ApiError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }
    Ok(question)
}

async fn answer(state: &AppState, question: &str) -> Result<FusedAnswer, ApiError> {
    let question = require_question(question)?;
    let answer = state.pipeline.answer(question).await?;
    tracing::info!(outcome = ?answer.outcome, "Answered question");
    Ok(answer)
}

/// Liveness message.
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "civic-rag API is running" }))
}

/// `GET /askCombined?question=...`
pub async fn ask_combined(
    State(state): State<AppState>,
    Query(params): Query<QuestionParams>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let answer = answer(&state, &params.question).await?;
    Ok(Json(QuestionResponse {
        response: answer.answer,
    }))
}

/// `POST /ask {"question": ...}`
pub async fn ask(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let answer = answer(&state, &req.question).await?;
    Ok(Json(QuestionResponse {
        response: answer.answer,
    }))
}

/// `GET /provide_response?question=...`
pub async fn provide_response(
    State(state): State<AppState>,
    Query(params): Query<QuestionParams>,
) -> Result<Json<DetailedResponse>, ApiError> {
    let answer = answer(&state, &params.question).await?;
    Ok(Json(answer.into()))
}

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        collections: state.pipeline.stats()?,
    }))
}

/// Reload both collections from their sources.
pub async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let reloaded = state.pipeline.reload().await?;
    tracing::info!("Reloaded {} collections", reloaded.len());
    Ok(Json(ReloadResponse { reloaded }))
}
