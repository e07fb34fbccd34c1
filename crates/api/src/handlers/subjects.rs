use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};
use study_core::model::{CreateSubject, SubjectId, UpdateSubject};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::{PathId, ValidJson};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Caller(owner): Caller,
) -> Result<Json<Value>, ApiError> {
    let subjects = state.services().subjects().list(&owner).await?;
    Ok(Json(json!({ "subjects": subjects })))
}

pub async fn create(
    State(state): State<AppState>,
    Caller(owner): Caller,
    ValidJson(input): ValidJson<CreateSubject>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let subject = state.services().subjects().create(&owner, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "subject": subject }))))
}

pub async fn get(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<SubjectId>,
) -> Result<Json<Value>, ApiError> {
    let subject = state.services().subjects().get(&owner, id).await?;
    Ok(Json(json!({ "subject": subject })))
}

pub async fn update(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<SubjectId>,
    ValidJson(update): ValidJson<UpdateSubject>,
) -> Result<Json<Value>, ApiError> {
    let subject = state
        .services()
        .subjects()
        .update(&owner, id, &update)
        .await?;
    Ok(Json(json!({ "subject": subject })))
}

pub async fn remove(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<SubjectId>,
) -> Result<Json<Value>, ApiError> {
    state.services().subjects().delete(&owner, id).await?;
    Ok(Json(json!({ "message": "Subject deleted" })))
}

pub async fn refresh_progress(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<SubjectId>,
) -> Result<Json<Value>, ApiError> {
    let subject = state
        .services()
        .subjects()
        .refresh_progress(&owner, id)
        .await?;
    Ok(Json(json!({ "subject": subject })))
}
