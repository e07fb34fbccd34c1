//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::model::{NoteError, PomodoroError, SubjectError, TaskError, TopicError};

/// Lifts `StorageError::NotFound` into the service's own `NotFound` so callers
/// can tell "absent for this owner" apart from backend failures.
macro_rules! from_storage {
    ($err:ident) => {
        impl From<StorageError> for $err {
            fn from(e: StorageError) -> Self {
                match e {
                    StorageError::NotFound => Self::NotFound,
                    other => Self::Storage(other),
                }
            }
        }
    };
}

/// Errors emitted by `SubjectService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubjectServiceError {
    #[error("Subject not found")]
    NotFound,
    #[error(transparent)]
    Subject(#[from] SubjectError),
    #[error(transparent)]
    Storage(StorageError),
}

/// Errors emitted by `TopicService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TopicServiceError {
    /// The topic, or the subject it points at, is not visible to the caller.
    #[error("Topic not found")]
    NotFound,
    #[error("Subject not found")]
    SubjectNotFound,
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    Storage(StorageError),
}

/// Errors emitted by `TaskService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskServiceError {
    #[error("Task not found")]
    NotFound,
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Storage(StorageError),
}

/// Errors emitted by `NoteService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NoteServiceError {
    #[error("Note not found")]
    NotFound,
    #[error(transparent)]
    Note(#[from] NoteError),
    #[error(transparent)]
    Storage(StorageError),
}

/// Errors emitted by `PomodoroService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PomodoroServiceError {
    #[error("Session not found")]
    NotFound,
    #[error(transparent)]
    Pomodoro(#[from] PomodoroError),
    #[error(transparent)]
    Storage(StorageError),
}

from_storage!(SubjectServiceError);
from_storage!(TopicServiceError);
from_storage!(TaskServiceError);
from_storage!(NoteServiceError);
from_storage!(PomodoroServiceError);

/// Errors emitted by `DashboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_not_found_is_lifted() {
        let err = TaskServiceError::from(StorageError::NotFound);
        assert!(matches!(err, TaskServiceError::NotFound));
        let err = TaskServiceError::from(StorageError::Conflict);
        assert!(matches!(err, TaskServiceError::Storage(StorageError::Conflict)));
    }
}
