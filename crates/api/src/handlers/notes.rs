use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};
use study_core::model::{CreateNote, NoteId, UpdateNote};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::{PathId, ValidJson};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Caller(owner): Caller,
) -> Result<Json<Value>, ApiError> {
    let notes = state.services().notes().list(&owner).await?;
    Ok(Json(json!({ "notes": notes })))
}

pub async fn create(
    State(state): State<AppState>,
    Caller(owner): Caller,
    ValidJson(input): ValidJson<CreateNote>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let note = state.services().notes().create(&owner, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "note": note }))))
}

pub async fn get(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<NoteId>,
) -> Result<Json<Value>, ApiError> {
    let note = state.services().notes().get(&owner, id).await?;
    Ok(Json(json!({ "note": note })))
}

pub async fn update(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<NoteId>,
    ValidJson(update): ValidJson<UpdateNote>,
) -> Result<Json<Value>, ApiError> {
    let note = state.services().notes().update(&owner, id, &update).await?;
    Ok(Json(json!({ "note": note })))
}

pub async fn remove(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<NoteId>,
) -> Result<Json<Value>, ApiError> {
    state.services().notes().delete(&owner, id).await?;
    Ok(Json(json!({ "message": "Note deleted" })))
}
