//! API routes for the question answering server

pub mod run;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::{auth, state::AppState};

/// Build all API routes; the run endpoint sits behind bearer authentication
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/hackrx/run", post(run::run_questions))
        .route_layer(middleware::from_fn_with_state(state, auth::require_bearer));

    Router::new().merge(protected).route("/info", get(info))
}

/// API info endpoint
async fn info(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    let config = state.config();
    axum::Json(serde_json::json!({
        "name": "doc-qa",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Answers batches of questions about a single document with an LLM",
        "endpoints": {
            "POST /api/v1/hackrx/run": "Answer questions about a document (Bearer auth)",
            "GET /api/v1/info": "Service description",
            "GET /health": "Liveness check"
        },
        "pipeline": {
            "model": config.llm.model,
            "retrieval": config.retrieval.strategy,
            "max_context_length": config.retrieval.max_context_length,
            "chunk_tokens": config.chunking.max_tokens,
            "groups": config.batching.groups,
            "sub_groups": config.batching.sub_groups
        }
    }))
}
