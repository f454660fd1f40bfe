use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod backend;
pub mod config;
pub mod qr;
pub mod state;

use api::display;
use state::AppState;

pub fn create_app_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        // Operator-facing display view
        .route("/", get(display::display_page))
        .route("/qr.png", get(display::qr_png))
        .route("/status", get(display::status))
        .route("/regenerate", post(display::regenerate))
        // Liveness probe
        .route("/health", get(display::health))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
