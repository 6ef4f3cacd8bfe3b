use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::error::ApiResult;
use crate::api::AppState;
use crate::models::{Submission, SubmitReceipt, SubmitStatus};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/submissions", post(submit).get(show))
        .route("/submitters", get(submitters))
        .route("/submitters/{name}/submissions", get(history))
        .route("/daily", get(daily))
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    url: String,
    #[serde(default)]
    submitter: String,
}

async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<SubmitReceipt>)> {
    let receipt = state.app().submit(&request.url, &request.submitter).await?;
    let status = match receipt.status {
        SubmitStatus::AlreadyExists => StatusCode::OK,
        _ => StatusCode::CREATED,
    };
    Ok((status, Json(receipt)))
}

#[derive(Debug, Deserialize)]
struct ShowParams {
    url: String,
}

async fn show(
    State(state): State<AppState>,
    Query(params): Query<ShowParams>,
) -> ApiResult<Json<Submission>> {
    Ok(Json(state.app().show(&params.url).await?))
}

async fn submitters(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.app().submitters().await?))
}

async fn history(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<Submission>>> {
    Ok(Json(state.app().history(&name).await?))
}

#[derive(Debug, Deserialize)]
struct DailyParams {
    date: Option<NaiveDate>,
}

async fn daily(
    State(state): State<AppState>,
    Query(params): Query<DailyParams>,
) -> ApiResult<Json<Vec<Submission>>> {
    Ok(Json(state.app().daily(params.date).await?))
}
