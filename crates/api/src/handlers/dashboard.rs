use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn show(
    State(state): State<AppState>,
    Caller(owner): Caller,
) -> Result<Json<Value>, ApiError> {
    let dashboard = state.services().dashboard().stats(&owner).await?;
    Ok(Json(json!({ "dashboard": dashboard })))
}
