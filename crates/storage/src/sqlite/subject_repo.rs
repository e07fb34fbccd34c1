use study_core::model::{Subject, SubjectId, UserId};

use super::SqliteRepository;
use super::mapping::{db, expect_row, insert_err, map_subject_row};
use crate::repository::{StorageError, SubjectRepository};

const SUBJECT_COLUMNS: &str = r"
    id, user_id, name, color, icon, professor, schedule,
    total_topics, completed_topics, progress, created_at, updated_at
";

#[async_trait::async_trait]
impl SubjectRepository for SqliteRepository {
    async fn list_subjects(&self, owner: &UserId) -> Result<Vec<Subject>, StorageError> {
        let sql = format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.iter().map(map_subject_row).collect()
    }

    async fn get_subject(&self, owner: &UserId, id: SubjectId) -> Result<Subject, StorageError> {
        let sql = format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = ?1 AND user_id = ?2");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?
            .ok_or(StorageError::NotFound)?;
        map_subject_row(&row)
    }

    async fn insert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        let progress = subject.progress();
        sqlx::query(
            r"
            INSERT INTO subjects (
                id, user_id, name, color, icon, professor, schedule,
                total_topics, completed_topics, progress, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ",
        )
        .bind(subject.id().to_string())
        .bind(subject.user_id().as_str())
        .bind(subject.name())
        .bind(subject.color())
        .bind(subject.icon())
        .bind(subject.professor())
        .bind(subject.schedule())
        .bind(i64::from(progress.total_topics()))
        .bind(i64::from(progress.completed_topics()))
        .bind(i64::from(progress.percent()))
        .bind(subject.created_at())
        .bind(subject.updated_at())
        .execute(&self.pool)
        .await
        .map_err(insert_err)?;
        Ok(())
    }

    async fn update_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        // progress columns belong to the topic write path
        let res = sqlx::query(
            r"
            UPDATE subjects SET
                name = ?3,
                color = ?4,
                icon = ?5,
                professor = ?6,
                schedule = ?7,
                updated_at = ?8
            WHERE id = ?1 AND user_id = ?2
            ",
        )
        .bind(subject.id().to_string())
        .bind(subject.user_id().as_str())
        .bind(subject.name())
        .bind(subject.color())
        .bind(subject.icon())
        .bind(subject.professor())
        .bind(subject.schedule())
        .bind(subject.updated_at())
        .execute(&self.pool)
        .await
        .map_err(db)?;
        expect_row(res.rows_affected())
    }

    async fn delete_subject(&self, owner: &UserId, id: SubjectId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM subjects WHERE id = ?1 AND user_id = ?2")
            .bind(id.to_string())
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(db)?;
        expect_row(res.rows_affected())
    }
}
