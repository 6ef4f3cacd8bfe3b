use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiResult;
use crate::api::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/mark-shared", post(mark_shared))
        .route("/admin/reset-shared", post(reset_shared))
}

#[derive(Debug, Deserialize)]
struct MarkSharedRequest {
    urls: Vec<String>,
}

async fn mark_shared(
    State(state): State<AppState>,
    Json(request): Json<MarkSharedRequest>,
) -> ApiResult<Json<Value>> {
    let marked = state.app().mark_shared(&request.urls).await?;
    Ok(Json(json!({
        "marked_count": marked,
        "urls": request.urls,
    })))
}

async fn reset_shared(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let reset = state.app().reset_shared().await?;
    Ok(Json(json!({ "reset_count": reset })))
}
