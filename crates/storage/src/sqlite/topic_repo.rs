use sqlx::{Row, SqliteConnection};
use study_core::SubjectProgress;
use study_core::model::{Subject, SubjectId, Topic, TopicId, UserId};

use super::SqliteRepository;
use super::mapping::{db, expect_row, insert_err, map_subject_row, map_topic_row, ser, tags_to_json};
use crate::repository::{StorageError, TopicRepository};

const TOPIC_COLUMNS: &str = r"
    id, user_id, subject_id, name, description, is_completed, position,
    resources, created_at, updated_at
";

/// Recount the subject's topics and write the aggregate back on `conn`.
async fn write_progress(
    conn: &mut SqliteConnection,
    owner: &UserId,
    subject: SubjectId,
) -> Result<SubjectProgress, StorageError> {
    let rows = sqlx::query("SELECT is_completed FROM topics WHERE subject_id = ?1 AND user_id = ?2")
        .bind(subject.to_string())
        .bind(owner.as_str())
        .fetch_all(&mut *conn)
        .await
        .map_err(db)?;
    let flags = rows
        .iter()
        .map(|row| row.try_get::<bool, _>("is_completed").map_err(ser))
        .collect::<Result<Vec<_>, _>>()?;
    let progress = SubjectProgress::from_completion_flags(flags);

    let res = sqlx::query(
        r"
        UPDATE subjects SET
            total_topics = ?3,
            completed_topics = ?4,
            progress = ?5
        WHERE id = ?1 AND user_id = ?2
        ",
    )
    .bind(subject.to_string())
    .bind(owner.as_str())
    .bind(i64::from(progress.total_topics()))
    .bind(i64::from(progress.completed_topics()))
    .bind(i64::from(progress.percent()))
    .execute(&mut *conn)
    .await
    .map_err(db)?;
    expect_row(res.rows_affected())?;

    tracing::debug!(%subject, percent = progress.percent(), "subject progress recomputed");
    Ok(progress)
}

async fn subject_exists(
    conn: &mut SqliteConnection,
    owner: &UserId,
    subject: SubjectId,
) -> Result<bool, StorageError> {
    let row = sqlx::query("SELECT 1 FROM subjects WHERE id = ?1 AND user_id = ?2")
        .bind(subject.to_string())
        .bind(owner.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(db)?;
    Ok(row.is_some())
}

#[async_trait::async_trait]
impl TopicRepository for SqliteRepository {
    async fn list_topics(
        &self,
        owner: &UserId,
        subject: Option<SubjectId>,
    ) -> Result<Vec<Topic>, StorageError> {
        let sql = format!(
            r"
            SELECT {TOPIC_COLUMNS} FROM topics
            WHERE user_id = ?1 AND (?2 IS NULL OR subject_id = ?2)
            ORDER BY position ASC, created_at ASC, rowid ASC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(owner.as_str())
            .bind(subject.map(|s| s.to_string()))
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.iter().map(map_topic_row).collect()
    }

    async fn get_topic(&self, owner: &UserId, id: TopicId) -> Result<Topic, StorageError> {
        let sql = format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE id = ?1 AND user_id = ?2");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?
            .ok_or(StorageError::NotFound)?;
        map_topic_row(&row)
    }

    async fn insert_topic(&self, topic: &Topic) -> Result<SubjectProgress, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        if !subject_exists(&mut tx, topic.user_id(), topic.subject_id()).await? {
            return Err(StorageError::NotFound);
        }

        sqlx::query(
            r"
            INSERT INTO topics (
                id, user_id, subject_id, name, description, is_completed, position,
                resources, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(topic.id().to_string())
        .bind(topic.user_id().as_str())
        .bind(topic.subject_id().to_string())
        .bind(topic.name())
        .bind(topic.description())
        .bind(topic.is_completed())
        .bind(i64::from(topic.order()))
        .bind(tags_to_json(topic.resources())?)
        .bind(topic.created_at())
        .bind(topic.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(insert_err)?;

        let progress = write_progress(&mut tx, topic.user_id(), topic.subject_id()).await?;
        tx.commit().await.map_err(db)?;
        Ok(progress)
    }

    async fn update_topic(&self, topic: &Topic) -> Result<SubjectProgress, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        let res = sqlx::query(
            r"
            UPDATE topics SET
                name = ?4,
                description = ?5,
                is_completed = ?6,
                position = ?7,
                resources = ?8,
                updated_at = ?9
            WHERE id = ?1 AND user_id = ?2 AND subject_id = ?3
            ",
        )
        .bind(topic.id().to_string())
        .bind(topic.user_id().as_str())
        .bind(topic.subject_id().to_string())
        .bind(topic.name())
        .bind(topic.description())
        .bind(topic.is_completed())
        .bind(i64::from(topic.order()))
        .bind(tags_to_json(topic.resources())?)
        .bind(topic.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(db)?;
        expect_row(res.rows_affected())?;

        let progress = write_progress(&mut tx, topic.user_id(), topic.subject_id()).await?;
        tx.commit().await.map_err(db)?;
        Ok(progress)
    }

    async fn delete_topic(
        &self,
        owner: &UserId,
        id: TopicId,
    ) -> Result<(SubjectId, SubjectProgress), StorageError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        let row = sqlx::query("DELETE FROM topics WHERE id = ?1 AND user_id = ?2 RETURNING subject_id")
            .bind(id.to_string())
            .bind(owner.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db)?
            .ok_or(StorageError::NotFound)?;
        let subject: SubjectId = row
            .try_get::<String, _>("subject_id")
            .map_err(ser)?
            .parse()
            .map_err(ser)?;

        let progress = write_progress(&mut tx, owner, subject).await?;
        tx.commit().await.map_err(db)?;
        Ok((subject, progress))
    }

    async fn refresh_subject_progress(
        &self,
        owner: &UserId,
        subject: SubjectId,
    ) -> Result<Subject, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        write_progress(&mut tx, owner, subject).await?;
        let row = sqlx::query(
            r"
            SELECT
                id, user_id, name, color, icon, professor, schedule,
                total_topics, completed_topics, progress, created_at, updated_at
            FROM subjects
            WHERE id = ?1 AND user_id = ?2
            ",
        )
        .bind(subject.to_string())
        .bind(owner.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(db)?;
        tx.commit().await.map_err(db)?;
        map_subject_row(&row)
    }
}
