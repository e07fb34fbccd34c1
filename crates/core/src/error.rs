use thiserror::Error;

use crate::model::{NoteError, ParseIdError, PomodoroError, SubjectError, TaskError, TopicError};
use crate::progress::ProgressError;

/// Any validation failure raised by the domain model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Subject(#[from] SubjectError),
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Note(#[from] NoteError),
    #[error(transparent)]
    Pomodoro(#[from] PomodoroError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
}
