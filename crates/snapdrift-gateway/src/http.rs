use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use snapdrift_images::ImageStoreError;
use snapdrift_scheduler::{SchedulerError, Status};

use crate::app::AppState;

/// GET /health — liveness probe, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.config.delivery.provider,
    }))
}

/// GET /status — scheduler state for the dashboard header.
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Status>, ApiError> {
    Ok(Json(state.scheduler.status().await?))
}

/// POST /start — arm the scheduler. 422 on bad interval configuration.
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Result<Json<Status>, ApiError> {
    Ok(Json(state.scheduler.start().await?))
}

/// POST /stop — cancel the pending fire.
pub async fn stop_handler(State(state): State<Arc<AppState>>) -> Result<Json<Status>, ApiError> {
    Ok(Json(state.scheduler.stop().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct TriggerRequest {
    pub image_id: Option<i64>,
}

/// POST /trigger — run one send cycle immediately ("send test message").
/// Body is optional JSON: `{"image_id": 7}` forces a specific image.
pub async fn trigger_handler(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> Response {
    let req: TriggerRequest = if body.is_empty() {
        TriggerRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(req) => req,
            Err(e) => {
                let payload = json!({ "error": format!("bad request body: {e}") });
                return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
            }
        }
    };
    match state.scheduler.trigger_now(req.image_id).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// Scheduler errors mapped onto HTTP responses.
pub struct ApiError(SchedulerError);

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SchedulerError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SchedulerError::NoEligibleImage => StatusCode::CONFLICT,
            SchedulerError::Images(ImageStoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            SchedulerError::Delivery(_) => StatusCode::BAD_GATEWAY,
            SchedulerError::EngineGone => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
