use study_core::model::{Note, NoteId, UserId};

use super::SqliteRepository;
use super::mapping::{db, expect_row, insert_err, map_note_row, tags_to_json};
use crate::repository::{NoteRepository, StorageError};

const NOTE_COLUMNS: &str =
    "id, user_id, subject_id, title, content, tags, is_favorite, created_at, updated_at";

#[async_trait::async_trait]
impl NoteRepository for SqliteRepository {
    async fn list_notes(&self, owner: &UserId) -> Result<Vec<Note>, StorageError> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = ?1 ORDER BY updated_at DESC, rowid DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.iter().map(map_note_row).collect()
    }

    async fn get_note(&self, owner: &UserId, id: NoteId) -> Result<Note, StorageError> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1 AND user_id = ?2");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?
            .ok_or(StorageError::NotFound)?;
        map_note_row(&row)
    }

    async fn insert_note(&self, note: &Note) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO notes (
                id, user_id, subject_id, title, content, tags, is_favorite, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(note.id().to_string())
        .bind(note.user_id().as_str())
        .bind(note.subject_id().map(|s| s.to_string()))
        .bind(note.title())
        .bind(note.content())
        .bind(tags_to_json(note.tags())?)
        .bind(note.is_favorite())
        .bind(note.created_at())
        .bind(note.updated_at())
        .execute(&self.pool)
        .await
        .map_err(insert_err)?;
        Ok(())
    }

    async fn update_note(&self, note: &Note) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE notes SET
                subject_id = ?3,
                title = ?4,
                content = ?5,
                tags = ?6,
                is_favorite = ?7,
                updated_at = ?8
            WHERE id = ?1 AND user_id = ?2
            ",
        )
        .bind(note.id().to_string())
        .bind(note.user_id().as_str())
        .bind(note.subject_id().map(|s| s.to_string()))
        .bind(note.title())
        .bind(note.content())
        .bind(tags_to_json(note.tags())?)
        .bind(note.is_favorite())
        .bind(note.updated_at())
        .execute(&self.pool)
        .await
        .map_err(db)?;
        expect_row(res.rows_affected())
    }

    async fn delete_note(&self, owner: &UserId, id: NoteId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM notes WHERE id = ?1 AND user_id = ?2")
            .bind(id.to_string())
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(db)?;
        expect_row(res.rows_affected())
    }
}
