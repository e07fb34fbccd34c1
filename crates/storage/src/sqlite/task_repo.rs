use study_core::model::{Task, TaskId, UserId};

use super::SqliteRepository;
use super::mapping::{db, expect_row, insert_err, map_task_row, tags_to_json};
use crate::repository::{StorageError, TaskRepository};

const TASK_COLUMNS: &str = r"
    id, user_id, subject_id, title, description, due_date, priority, status,
    estimated_pomodoros, completed_pomodoros, tags, created_at, updated_at, completed_at
";

#[async_trait::async_trait]
impl TaskRepository for SqliteRepository {
    async fn list_tasks(&self, owner: &UserId) -> Result<Vec<Task>, StorageError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.iter().map(map_task_row).collect()
    }

    async fn get_task(&self, owner: &UserId, id: TaskId) -> Result<Task, StorageError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?
            .ok_or(StorageError::NotFound)?;
        map_task_row(&row)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO tasks (
                id, user_id, subject_id, title, description, due_date, priority, status,
                estimated_pomodoros, completed_pomodoros, tags, created_at, updated_at, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ",
        )
        .bind(task.id().to_string())
        .bind(task.user_id().as_str())
        .bind(task.subject_id().map(|s| s.to_string()))
        .bind(task.title())
        .bind(task.description())
        .bind(task.due_date())
        .bind(task.priority().as_str())
        .bind(task.status().as_str())
        .bind(task.estimated_pomodoros().map(i64::from))
        .bind(i64::from(task.completed_pomodoros()))
        .bind(tags_to_json(task.tags())?)
        .bind(task.created_at())
        .bind(task.updated_at())
        .bind(task.completed_at())
        .execute(&self.pool)
        .await
        .map_err(insert_err)?;
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE tasks SET
                subject_id = ?3,
                title = ?4,
                description = ?5,
                due_date = ?6,
                priority = ?7,
                status = ?8,
                estimated_pomodoros = ?9,
                completed_pomodoros = ?10,
                tags = ?11,
                updated_at = ?12,
                completed_at = ?13
            WHERE id = ?1 AND user_id = ?2
            ",
        )
        .bind(task.id().to_string())
        .bind(task.user_id().as_str())
        .bind(task.subject_id().map(|s| s.to_string()))
        .bind(task.title())
        .bind(task.description())
        .bind(task.due_date())
        .bind(task.priority().as_str())
        .bind(task.status().as_str())
        .bind(task.estimated_pomodoros().map(i64::from))
        .bind(i64::from(task.completed_pomodoros()))
        .bind(tags_to_json(task.tags())?)
        .bind(task.updated_at())
        .bind(task.completed_at())
        .execute(&self.pool)
        .await
        .map_err(db)?;
        expect_row(res.rows_affected())
    }

    async fn delete_task(&self, owner: &UserId, id: TaskId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM tasks WHERE id = ?1 AND user_id = ?2")
            .bind(id.to_string())
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(db)?;
        expect_row(res.rows_affected())
    }
}
