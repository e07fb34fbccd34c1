use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};
use tracing::error;

use crate::state::AppState;

/// Liveness plus a round trip to the store. No authentication.
pub async fn check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.services().check_health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "connected" })),
        ),
        Err(e) => {
            error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "database": "disconnected" })),
            )
        }
    }
}
