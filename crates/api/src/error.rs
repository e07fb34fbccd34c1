use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use services::{
    DashboardError, NoteServiceError, PomodoroServiceError, SubjectServiceError,
    TaskServiceError, TopicServiceError,
};
use storage::repository::StorageError;
use thiserror::Error;
use tracing::error;

/// Every failure a handler can surface, rendered as `{"error": message}`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn storage(e: &StorageError) -> Self {
        match e {
            StorageError::Connection(_) => {
                error!(error = %e, "store unreachable");
                Self::Unavailable("Storage unavailable".to_owned())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                error!(%detail, "internal error");
                "Internal server error".to_owned()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<SubjectServiceError> for ApiError {
    fn from(e: SubjectServiceError) -> Self {
        match e {
            SubjectServiceError::NotFound => Self::NotFound(e.to_string()),
            SubjectServiceError::Subject(inner) => Self::Validation(inner.to_string()),
            SubjectServiceError::Storage(inner) => Self::storage(&inner),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<TopicServiceError> for ApiError {
    fn from(e: TopicServiceError) -> Self {
        match e {
            TopicServiceError::NotFound | TopicServiceError::SubjectNotFound => {
                Self::NotFound(e.to_string())
            }
            TopicServiceError::Topic(inner) => Self::Validation(inner.to_string()),
            TopicServiceError::Storage(inner) => Self::storage(&inner),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<TaskServiceError> for ApiError {
    fn from(e: TaskServiceError) -> Self {
        match e {
            TaskServiceError::NotFound => Self::NotFound(e.to_string()),
            TaskServiceError::Task(inner) => Self::Validation(inner.to_string()),
            TaskServiceError::Storage(inner) => Self::storage(&inner),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<NoteServiceError> for ApiError {
    fn from(e: NoteServiceError) -> Self {
        match e {
            NoteServiceError::NotFound => Self::NotFound(e.to_string()),
            NoteServiceError::Note(inner) => Self::Validation(inner.to_string()),
            NoteServiceError::Storage(inner) => Self::storage(&inner),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<PomodoroServiceError> for ApiError {
    fn from(e: PomodoroServiceError) -> Self {
        match e {
            PomodoroServiceError::NotFound => Self::NotFound(e.to_string()),
            PomodoroServiceError::Pomodoro(inner) => Self::Validation(inner.to_string()),
            PomodoroServiceError::Storage(inner) => Self::storage(&inner),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        match e {
            DashboardError::Storage(inner) => Self::storage(&inner),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::TaskError;

    #[test]
    fn service_errors_map_to_status_codes() {
        let err = ApiError::from(TaskServiceError::NotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Task not found");

        let err = ApiError::from(TaskServiceError::Task(TaskError::EmptyTitle));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(TopicServiceError::SubjectNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err = ApiError::from(SubjectServiceError::Storage(StorageError::Connection(
            "gone".into(),
        )));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err = ApiError::from(TaskServiceError::Storage(StorageError::Conflict));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_detail_is_not_rendered() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
