use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};
use study_core::model::{CreateTask, TaskId, UpdateTask};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::{PathId, ValidJson};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Caller(owner): Caller,
) -> Result<Json<Value>, ApiError> {
    let tasks = state.services().tasks().list(&owner).await?;
    Ok(Json(json!({ "tasks": tasks })))
}

pub async fn create(
    State(state): State<AppState>,
    Caller(owner): Caller,
    ValidJson(input): ValidJson<CreateTask>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let task = state.services().tasks().create(&owner, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "task": task }))))
}

pub async fn get(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<TaskId>,
) -> Result<Json<Value>, ApiError> {
    let task = state.services().tasks().get(&owner, id).await?;
    Ok(Json(json!({ "task": task })))
}

pub async fn update(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<TaskId>,
    ValidJson(update): ValidJson<UpdateTask>,
) -> Result<Json<Value>, ApiError> {
    let task = state.services().tasks().update(&owner, id, &update).await?;
    Ok(Json(json!({ "task": task })))
}

pub async fn remove(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<TaskId>,
) -> Result<Json<Value>, ApiError> {
    state.services().tasks().delete(&owner, id).await?;
    Ok(Json(json!({ "message": "Task deleted" })))
}
