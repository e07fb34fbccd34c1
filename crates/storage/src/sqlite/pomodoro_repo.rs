use study_core::model::{PomodoroSession, PomodoroSessionId, UserId};

use super::SqliteRepository;
use super::mapping::{db, expect_row, insert_err, map_session_row};
use crate::repository::{PomodoroRepository, StorageError};

const SESSION_COLUMNS: &str = r"
    id, user_id, task_id, subject_id, kind, duration, completed_at, was_completed,
    created_at, updated_at
";

#[async_trait::async_trait]
impl PomodoroRepository for SqliteRepository {
    async fn list_sessions(
        &self,
        owner: &UserId,
        limit: Option<u32>,
    ) -> Result<Vec<PomodoroSession>, StorageError> {
        // LIMIT -1 means no limit in SQLite
        let lim = limit.map_or(-1, i64::from);
        let sql = format!(
            r"
            SELECT {SESSION_COLUMNS} FROM pomodoro_sessions
            WHERE user_id = ?1
            ORDER BY completed_at DESC, rowid DESC
            LIMIT ?2
            "
        );
        let rows = sqlx::query(&sql)
            .bind(owner.as_str())
            .bind(lim)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.iter().map(map_session_row).collect()
    }

    async fn get_session(
        &self,
        owner: &UserId,
        id: PomodoroSessionId,
    ) -> Result<PomodoroSession, StorageError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM pomodoro_sessions WHERE id = ?1 AND user_id = ?2"
        );
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?
            .ok_or(StorageError::NotFound)?;
        map_session_row(&row)
    }

    async fn insert_session(&self, session: &PomodoroSession) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO pomodoro_sessions (
                id, user_id, task_id, subject_id, kind, duration, completed_at, was_completed,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(session.id().to_string())
        .bind(session.user_id().as_str())
        .bind(session.task_id().map(|t| t.to_string()))
        .bind(session.subject_id().map(|s| s.to_string()))
        .bind(session.kind().as_str())
        .bind(i64::from(session.duration()))
        .bind(session.completed_at())
        .bind(session.was_completed())
        .bind(session.created_at())
        .bind(session.updated_at())
        .execute(&self.pool)
        .await
        .map_err(insert_err)?;
        Ok(())
    }

    async fn update_session(&self, session: &PomodoroSession) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE pomodoro_sessions SET
                task_id = ?3,
                subject_id = ?4,
                kind = ?5,
                duration = ?6,
                completed_at = ?7,
                was_completed = ?8,
                updated_at = ?9
            WHERE id = ?1 AND user_id = ?2
            ",
        )
        .bind(session.id().to_string())
        .bind(session.user_id().as_str())
        .bind(session.task_id().map(|t| t.to_string()))
        .bind(session.subject_id().map(|s| s.to_string()))
        .bind(session.kind().as_str())
        .bind(i64::from(session.duration()))
        .bind(session.completed_at())
        .bind(session.was_completed())
        .bind(session.updated_at())
        .execute(&self.pool)
        .await
        .map_err(db)?;
        expect_row(res.rows_affected())
    }

    async fn delete_session(
        &self,
        owner: &UserId,
        id: PomodoroSessionId,
    ) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM pomodoro_sessions WHERE id = ?1 AND user_id = ?2")
            .bind(id.to_string())
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(db)?;
        expect_row(res.rows_affected())
    }
}
