use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiResult;
use crate::api::AppState;
use crate::app::FullFlowReport;
use crate::digest::CycleOutcome;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/webhook/new-link", post(new_link))
        .route("/webhook/trigger-digest", post(trigger_digest))
        .route("/webhook/scrape-all-pending", post(scrape_all_pending))
        .route("/webhook/test-full-flow", post(test_full_flow))
}

#[derive(Debug, Deserialize)]
struct NewLinkRequest {
    url: String,
}

async fn new_link(
    State(state): State<AppState>,
    Json(request): Json<NewLinkRequest>,
) -> ApiResult<Json<Value>> {
    state.app().enqueue(&request.url).await?;
    Ok(Json(json!({ "status": "queued", "url": request.url.trim() })))
}

async fn trigger_digest(State(state): State<AppState>) -> ApiResult<Json<CycleOutcome>> {
    Ok(Json(state.app().trigger_digest().await?))
}

async fn scrape_all_pending(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let count = state.app().sweep().await?;
    Ok(Json(json!({ "status": "queued", "count": count })))
}

async fn test_full_flow(State(state): State<AppState>) -> ApiResult<Json<FullFlowReport>> {
    Ok(Json(state.app().full_flow().await?))
}
