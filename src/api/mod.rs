mod error;
mod routes;
mod state;

use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;

pub use routes::build_router;
pub use state::AppState;

/// Request/response logging for the HTTP surface.
pub fn trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}
