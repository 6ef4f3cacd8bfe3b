mod admin;
mod health;
mod submissions;
mod webhook;

use axum::Router;

use super::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(submissions::routes())
        .merge(admin::routes())
        .merge(webhook::routes())
        .with_state(state)
}
