use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use study_core::model::{CreatePomodoroSession, PomodoroSessionId, UpdatePomodoroSession};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::{PathId, ValidJson, ValidQuery};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListParams {
    #[serde(default)]
    pub limit: Option<u32>,
}

pub async fn list(
    State(state): State<AppState>,
    Caller(owner): Caller,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let sessions = state
        .services()
        .pomodoro()
        .list(&owner, params.limit)
        .await?;
    Ok(Json(json!({ "sessions": sessions })))
}

pub async fn create(
    State(state): State<AppState>,
    Caller(owner): Caller,
    ValidJson(input): ValidJson<CreatePomodoroSession>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let session = state.services().pomodoro().create(&owner, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "session": session }))))
}

pub async fn get(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<PomodoroSessionId>,
) -> Result<Json<Value>, ApiError> {
    let session = state.services().pomodoro().get(&owner, id).await?;
    Ok(Json(json!({ "session": session })))
}

pub async fn update(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<PomodoroSessionId>,
    ValidJson(update): ValidJson<UpdatePomodoroSession>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .services()
        .pomodoro()
        .update(&owner, id, &update)
        .await?;
    Ok(Json(json!({ "session": session })))
}

pub async fn remove(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<PomodoroSessionId>,
) -> Result<Json<Value>, ApiError> {
    state.services().pomodoro().delete(&owner, id).await?;
    Ok(Json(json!({ "message": "Session deleted" })))
}

pub async fn stats(
    State(state): State<AppState>,
    Caller(owner): Caller,
) -> Result<Json<Value>, ApiError> {
    let stats = state.services().pomodoro().stats(&owner).await?;
    Ok(Json(json!({ "stats": stats })))
}
