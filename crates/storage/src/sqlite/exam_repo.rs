use exam_core::model::{Exam, ExamId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{db, i64_from_u64, map_question_row, question_kind_parts, ser, u32_from_i64};
use crate::repository::{ExamRepository, StorageError};

impl SqliteRepository {
    async fn load_questions(
        &self,
        exam_id: &str,
    ) -> Result<Vec<exam_core::model::Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT question_id, kind, text, marks, options, correct_answer
                FROM exam_questions
                WHERE exam_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn exam_from_row(&self, row: &SqliteRow) -> Result<Exam, StorageError> {
        let id: String = row.try_get("id").map_err(ser)?;
        let title: String = row.try_get("title").map_err(ser)?;
        let duration = u32_from_i64(
            "duration_minutes",
            row.try_get::<i64, _>("duration_minutes").map_err(ser)?,
        )?;
        let pass = u32_from_i64(
            "pass_score_percent",
            row.try_get::<i64, _>("pass_score_percent").map_err(ser)?,
        )?;
        let questions = self.load_questions(&id).await?;

        Exam::new(ExamId::new(id), title, duration, pass, questions).map_err(ser)
    }
}

#[async_trait::async_trait]
impl ExamRepository for SqliteRepository {
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        sqlx::query(
            r"
            INSERT INTO exams (id, title, duration_minutes, pass_score_percent, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                duration_minutes = excluded.duration_minutes,
                pass_score_percent = excluded.pass_score_percent,
                updated_at = excluded.updated_at
            ",
        )
        .bind(exam.id().as_str())
        .bind(exam.title())
        .bind(i64::from(exam.duration_minutes()))
        .bind(i64::from(exam.pass_score_percent()))
        .bind(self.clock.now())
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        sqlx::query("DELETE FROM exam_questions WHERE exam_id = ?1")
            .bind(exam.id().as_str())
            .execute(&mut *tx)
            .await
            .map_err(db)?;

        for (position, question) in exam.questions().iter().enumerate() {
            let (options, correct_answer) = question_kind_parts(question.kind())?;
            sqlx::query(
                r"
                INSERT INTO exam_questions (
                    exam_id, position, question_id, kind, text, marks, options, correct_answer
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
            )
            .bind(exam.id().as_str())
            .bind(i64::try_from(position).map_err(ser)?)
            .bind(i64_from_u64("question_id", question.id().value())?)
            .bind(question.kind().as_str())
            .bind(question.text())
            .bind(i64::from(question.marks()))
            .bind(options)
            .bind(correct_answer)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        }

        tx.commit().await.map_err(db)?;
        tracing::debug!(exam_id = %exam.id(), questions = exam.question_count(), "exam stored");
        Ok(())
    }

    async fn get_exam(&self, id: &ExamId) -> Result<Exam, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, title, duration_minutes, pass_score_percent
                FROM exams
                WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?
        .ok_or(StorageError::NotFound)?;

        self.exam_from_row(&row).await
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, title, duration_minutes, pass_score_percent
                FROM exams
                ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(self.exam_from_row(row).await?);
        }
        Ok(out)
    }
}
