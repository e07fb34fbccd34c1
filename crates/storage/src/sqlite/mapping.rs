use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use study_core::SubjectProgress;
use study_core::model::{
    Note, PomodoroSession, SessionKind, Subject, Task, TaskParts, TaskPriority, TaskStatus, Topic,
    UserId,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn db(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Rows touched by a scoped `UPDATE`/`DELETE`; zero means the record is not
/// visible to that owner.
pub(crate) fn expect_row(rows_affected: u64) -> Result<(), StorageError> {
    if rows_affected == 0 {
        Err(StorageError::NotFound)
    } else {
        Ok(())
    }
}

/// Maps a primary-key violation on insert to `Conflict`.
pub(crate) fn insert_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(inner) if inner.is_unique_violation() => StorageError::Conflict,
        _ => db(e),
    }
}

pub(crate) fn tags_to_json(tags: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(tags).map_err(ser)
}

fn tags_from_json(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

fn parse_col<T>(row: &SqliteRow, col: &str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    row.try_get::<String, _>(col).map_err(ser)?.parse().map_err(ser)
}

fn parse_opt_col<T>(row: &SqliteRow, col: &str) -> Result<Option<T>, StorageError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    row.try_get::<Option<String>, _>(col)
        .map_err(ser)?
        .map(|raw| raw.parse().map_err(ser))
        .transpose()
}

fn u32_col(row: &SqliteRow, col: &str) -> Result<u32, StorageError> {
    let raw: i64 = row.try_get(col).map_err(ser)?;
    u32::try_from(raw).map_err(|_| StorageError::Serialization(format!("invalid {col}: {raw}")))
}

fn opt_u32_col(row: &SqliteRow, col: &str) -> Result<Option<u32>, StorageError> {
    row.try_get::<Option<i64>, _>(col)
        .map_err(ser)?
        .map(|raw| {
            u32::try_from(raw)
                .map_err(|_| StorageError::Serialization(format!("invalid {col}: {raw}")))
        })
        .transpose()
}

fn user_col(row: &SqliteRow) -> Result<UserId, StorageError> {
    UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?).map_err(ser)
}

fn time_col(row: &SqliteRow, col: &str) -> Result<DateTime<Utc>, StorageError> {
    row.try_get(col).map_err(ser)
}

pub(crate) fn map_subject_row(row: &SqliteRow) -> Result<Subject, StorageError> {
    let percent: i64 = row.try_get("progress").map_err(ser)?;
    let percent = u8::try_from(percent)
        .map_err(|_| StorageError::Serialization(format!("invalid progress: {percent}")))?;
    let progress = SubjectProgress::from_persisted(
        u32_col(row, "total_topics")?,
        u32_col(row, "completed_topics")?,
        percent,
    )
    .map_err(ser)?;

    Subject::from_persisted(
        parse_col(row, "id")?,
        user_col(row)?,
        row.try_get("name").map_err(ser)?,
        row.try_get("color").map_err(ser)?,
        row.try_get("icon").map_err(ser)?,
        row.try_get("professor").map_err(ser)?,
        row.try_get("schedule").map_err(ser)?,
        progress,
        time_col(row, "created_at")?,
        time_col(row, "updated_at")?,
    )
    .map_err(ser)
}

pub(crate) fn map_topic_row(row: &SqliteRow) -> Result<Topic, StorageError> {
    let resources: String = row.try_get("resources").map_err(ser)?;
    Topic::from_persisted(
        parse_col(row, "id")?,
        user_col(row)?,
        parse_col(row, "subject_id")?,
        row.try_get("name").map_err(ser)?,
        row.try_get("description").map_err(ser)?,
        row.try_get("is_completed").map_err(ser)?,
        u32_col(row, "position")?,
        tags_from_json(&resources)?,
        time_col(row, "created_at")?,
        time_col(row, "updated_at")?,
    )
    .map_err(ser)
}

pub(crate) fn map_task_row(row: &SqliteRow) -> Result<Task, StorageError> {
    let tags: String = row.try_get("tags").map_err(ser)?;
    Task::from_persisted(TaskParts {
        id: parse_col(row, "id")?,
        user_id: user_col(row)?,
        subject_id: parse_opt_col(row, "subject_id")?,
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        due_date: row.try_get("due_date").map_err(ser)?,
        priority: parse_col::<TaskPriority>(row, "priority")?,
        status: parse_col::<TaskStatus>(row, "status")?,
        estimated_pomodoros: opt_u32_col(row, "estimated_pomodoros")?,
        completed_pomodoros: u32_col(row, "completed_pomodoros")?,
        tags: tags_from_json(&tags)?,
        created_at: time_col(row, "created_at")?,
        updated_at: time_col(row, "updated_at")?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
    .map_err(ser)
}

pub(crate) fn map_note_row(row: &SqliteRow) -> Result<Note, StorageError> {
    let tags: String = row.try_get("tags").map_err(ser)?;
    Note::from_persisted(
        parse_col(row, "id")?,
        user_col(row)?,
        parse_opt_col(row, "subject_id")?,
        row.try_get("title").map_err(ser)?,
        row.try_get("content").map_err(ser)?,
        tags_from_json(&tags)?,
        row.try_get("is_favorite").map_err(ser)?,
        time_col(row, "created_at")?,
        time_col(row, "updated_at")?,
    )
    .map_err(ser)
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<PomodoroSession, StorageError> {
    PomodoroSession::from_persisted(
        parse_col(row, "id")?,
        user_col(row)?,
        parse_opt_col(row, "task_id")?,
        parse_opt_col(row, "subject_id")?,
        parse_col::<SessionKind>(row, "kind")?,
        u32_col(row, "duration")?,
        time_col(row, "completed_at")?,
        row.try_get("was_completed").map_err(ser)?,
        time_col(row, "created_at")?,
        time_col(row, "updated_at")?,
    )
    .map_err(ser)
}
