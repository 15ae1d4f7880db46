use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates exams with their questions, submitted attempts and
/// the XP ledger.
#[allow(clippy::too_many_lines)]
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

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS exams (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    duration_minutes INTEGER NOT NULL CHECK (duration_minutes >= 0),
                    pass_score_percent INTEGER NOT NULL
                        CHECK (pass_score_percent BETWEEN 0 AND 100),
                    updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS exam_questions (
                    exam_id TEXT NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    question_id INTEGER NOT NULL,
                    kind TEXT NOT NULL CHECK (kind IN ('mcq', 'descriptive')),
                    text TEXT NOT NULL,
                    marks INTEGER NOT NULL CHECK (marks > 0),
                    options TEXT NOT NULL DEFAULT '[]',
                    correct_answer TEXT,
                    PRIMARY KEY (exam_id, position),
                    FOREIGN KEY (exam_id) REFERENCES exams(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // Attempts outlive the exam definition they were taken against.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS exam_attempts (
                    id INTEGER PRIMARY KEY,
                    session_id TEXT NOT NULL UNIQUE,
                    exam_id TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    started_at TEXT NOT NULL,
                    submitted_at TEXT NOT NULL,
                    submit_trigger TEXT NOT NULL CHECK (submit_trigger IN ('manual', 'time_expired')),
                    percent INTEGER NOT NULL CHECK (percent BETWEEN 0 AND 100),
                    passed INTEGER NOT NULL CHECK (passed IN (0, 1)),
                    gained_marks INTEGER NOT NULL CHECK (gained_marks >= 0),
                    total_marks INTEGER NOT NULL CHECK (total_marks >= gained_marks)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_xp (
                    user_id TEXT PRIMARY KEY,
                    xp INTEGER NOT NULL CHECK (xp >= 0),
                    last_award_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS xp_awards (
                    id INTEGER PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    amount INTEGER NOT NULL CHECK (amount >= 0),
                    reason TEXT NOT NULL,
                    awarded_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_exam_attempts_exam_user_submitted
                    ON exam_attempts (exam_id, user_id, submitted_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_xp_awards_user_awarded
                    ON xp_awards (user_id, awarded_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
