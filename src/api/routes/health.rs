use axum::{extract::State, routing::get, Json, Router};

use crate::api::AppState;
use crate::app::Health;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Liveness plus the number of urls waiting to be scraped.
async fn health_check(State(state): State<AppState>) -> Json<Health> {
    Json(state.app().health())
}
