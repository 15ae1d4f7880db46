use exam_core::model::{AttemptSummary, ExamId, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db, map_attempt_row, ser, write_err};
use crate::repository::{AttemptRepository, AttemptRow, StorageError};

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &AttemptSummary) -> Result<i64, StorageError> {
        let result = attempt.result();
        let res = sqlx::query(
            r"
            INSERT INTO exam_attempts (
                session_id, exam_id, user_id, started_at, submitted_at,
                submit_trigger, percent, passed, gained_marks, total_marks
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(attempt.session_id().to_string())
        .bind(attempt.exam_id().as_str())
        .bind(attempt.user_id().as_str())
        .bind(attempt.started_at())
        .bind(attempt.submitted_at())
        .bind(attempt.trigger().as_str())
        .bind(i64::from(result.percent))
        .bind(i64::from(result.passed))
        .bind(i64::from(result.gained_marks))
        .bind(i64::from(result.total_marks))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_attempt(&self, id: i64) -> Result<AttemptSummary, StorageError> {
        let row = sqlx::query(
            r"
                SELECT session_id, exam_id, user_id, started_at, submitted_at,
                       submit_trigger, percent, passed, gained_marks, total_marks
                FROM exam_attempts
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?
        .ok_or(StorageError::NotFound)?;

        map_attempt_row(&row)
    }

    async fn list_attempts(
        &self,
        exam_id: &ExamId,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, session_id, exam_id, user_id, started_at, submitted_at,
                       submit_trigger, percent, passed, gained_marks, total_marks
                FROM exam_attempts
                WHERE exam_id = ?1 AND user_id = ?2
                ORDER BY submitted_at DESC, id DESC
                LIMIT ?3
            ",
        )
        .bind(exam_id.as_str())
        .bind(user_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("id").map_err(ser)?;
                Ok(AttemptRow::new(id, map_attempt_row(row)?))
            })
            .collect()
    }
}
