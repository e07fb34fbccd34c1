use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS subjects (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            color TEXT NOT NULL,
            icon TEXT,
            professor TEXT,
            schedule TEXT,
            total_topics INTEGER NOT NULL DEFAULT 0 CHECK (total_topics >= 0),
            completed_topics INTEGER NOT NULL DEFAULT 0
                CHECK (completed_topics >= 0 AND completed_topics <= total_topics),
            progress INTEGER NOT NULL DEFAULT 0 CHECK (progress BETWEEN 0 AND 100),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS topics (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            is_completed INTEGER NOT NULL CHECK (is_completed IN (0, 1)),
            position INTEGER NOT NULL CHECK (position >= 0),
            resources TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            subject_id TEXT,
            title TEXT NOT NULL,
            description TEXT,
            due_date TEXT,
            priority TEXT NOT NULL,
            status TEXT NOT NULL,
            estimated_pomodoros INTEGER CHECK (estimated_pomodoros >= 0),
            completed_pomodoros INTEGER NOT NULL DEFAULT 0 CHECK (completed_pomodoros >= 0),
            tags TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            completed_at TEXT
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            subject_id TEXT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            is_favorite INTEGER NOT NULL DEFAULT 0 CHECK (is_favorite IN (0, 1)),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS pomodoro_sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            task_id TEXT,
            subject_id TEXT,
            kind TEXT NOT NULL,
            duration INTEGER NOT NULL CHECK (duration > 0),
            completed_at TEXT NOT NULL,
            was_completed INTEGER NOT NULL CHECK (was_completed IN (0, 1)),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_subjects_user_created
            ON subjects (user_id, created_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_topics_user_subject_position
            ON topics (user_id, subject_id, position, created_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_tasks_user_created
            ON tasks (user_id, created_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_notes_user_updated
            ON notes (user_id, updated_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_pomodoro_user_completed
            ON pomodoro_sessions (user_id, completed_at);
    ",
];

/// Applies pending schema versions, each inside its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    for (version, statements) in [(1_i64, SCHEMA_V1)] {
        if is_applied(pool, version).await? {
            continue;
        }
        let mut tx = pool.begin().await?;
        for statement in statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        tracing::info!(version, "applied schema migration");
    }

    Ok(())
}
