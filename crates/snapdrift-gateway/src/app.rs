use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use snapdrift_core::SnapdriftConfig;
use snapdrift_scheduler::EngineHandle;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: SnapdriftConfig,
    pub scheduler: EngineHandle,
}

impl AppState {
    pub fn new(config: SnapdriftConfig, scheduler: EngineHandle) -> Self {
        Self { config, scheduler }
    }
}

/// Assemble the control API consumed by the dashboard and CLI.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health_handler))
        .route("/status", get(crate::http::status_handler))
        .route("/start", post(crate::http::start_handler))
        .route("/stop", post(crate::http::stop_handler))
        .route("/trigger", post(crate::http::trigger_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
}
