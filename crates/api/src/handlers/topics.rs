use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use study_core::model::{CreateTopic, SubjectId, TopicId, UpdateTopic};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::{PathId, ValidJson, ValidQuery};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TopicFilter {
    #[serde(default)]
    pub subject_id: Option<SubjectId>,
}

pub async fn list(
    State(state): State<AppState>,
    Caller(owner): Caller,
    ValidQuery(filter): ValidQuery<TopicFilter>,
) -> Result<Json<Value>, ApiError> {
    let topics = state
        .services()
        .topics()
        .list(&owner, filter.subject_id)
        .await?;
    Ok(Json(json!({ "topics": topics })))
}

pub async fn create(
    State(state): State<AppState>,
    Caller(owner): Caller,
    ValidJson(input): ValidJson<CreateTopic>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let change = state.services().topics().create(&owner, input).await?;
    Ok((StatusCode::CREATED, Json(json!(change))))
}

pub async fn get(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<TopicId>,
) -> Result<Json<Value>, ApiError> {
    let topic = state.services().topics().get(&owner, id).await?;
    Ok(Json(json!({ "topic": topic })))
}

pub async fn update(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<TopicId>,
    ValidJson(update): ValidJson<UpdateTopic>,
) -> Result<Json<Value>, ApiError> {
    let change = state
        .services()
        .topics()
        .update(&owner, id, &update)
        .await?;
    Ok(Json(json!(change)))
}

pub async fn remove(
    State(state): State<AppState>,
    Caller(owner): Caller,
    PathId(id): PathId<TopicId>,
) -> Result<Json<Value>, ApiError> {
    let removal = state.services().topics().delete(&owner, id).await?;
    Ok(Json(json!({
        "message": "Topic deleted",
        "subjectId": removal.subject_id,
        "subjectProgress": removal.subject_progress,
    })))
}
