use std::sync::Arc;

use crate::app::App;

/// Shared handler state. Cloning only bumps the `Arc`.
#[derive(Clone)]
pub struct AppState {
    app: Arc<App>,
}

impl AppState {
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }

    pub fn app(&self) -> &App {
        &self.app
    }
}
