//! Batch question answering endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{RunRequest, RunResponse};

/// POST /api/v1/hackrx/run - Answer every question against one document
pub async fn run_questions(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RunRequest>, JsonRejection>,
) -> Result<Json<RunResponse>> {
    let start = Instant::now();

    // Unparseable bodies are reported like any other invalid request
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!("Rejected run request body: {}", rejection.body_text());
        Error::validation(rejection.body_text())
    })?;

    let outcome = state
        .orchestrator()
        .answer_document(request)
        .await
        .map_err(|e| {
            if e.is_request_fatal() {
                tracing::warn!("Run rejected: {}", e);
            } else {
                tracing::error!("Run failed: {}", e);
            }
            e
        })?;

    tracing::info!(
        "Run completed: {} answers in {}ms",
        outcome.question_count,
        start.elapsed().as_millis()
    );

    Ok(Json(RunResponse {
        answers: outcome.answers,
    }))
}
