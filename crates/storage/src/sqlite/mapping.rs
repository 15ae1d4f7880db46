use exam_core::model::{
    AttemptSummary, ExamId, ExamResult, Question, QuestionId, QuestionKind, SessionId,
    SubmitTrigger, UserId,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn db<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Maps unique-constraint violations to `Conflict`, everything else to `Connection`.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(d) if d.is_unique_violation() => StorageError::Conflict,
        _ => db(e),
    }
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn i64_from_u64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn question_kind_parts(kind: &QuestionKind) -> Result<(String, Option<&str>), StorageError> {
    match kind {
        QuestionKind::MultipleChoice {
            options,
            correct_answer,
        } => Ok((
            serde_json::to_string(options).map_err(ser)?,
            Some(correct_answer.as_str()),
        )),
        QuestionKind::Descriptive => Ok(("[]".to_owned(), None)),
    }
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = row.try_get::<i64, _>("question_id").map_err(ser)?;
    let id = QuestionId::new(
        u64::try_from(id).map_err(|_| ser(format!("invalid question_id: {id}")))?,
    );
    let text: String = row.try_get("text").map_err(ser)?;
    let marks = u32_from_i64("marks", row.try_get::<i64, _>("marks").map_err(ser)?)?;

    let kind_str: String = row.try_get("kind").map_err(ser)?;
    let kind = match kind_str.as_str() {
        "mcq" => {
            let options_json: String = row.try_get("options").map_err(ser)?;
            let options: Vec<String> = serde_json::from_str(&options_json).map_err(ser)?;
            let correct_answer: Option<String> = row.try_get("correct_answer").map_err(ser)?;
            QuestionKind::MultipleChoice {
                options,
                correct_answer: correct_answer.unwrap_or_default(),
            }
        }
        "descriptive" => QuestionKind::Descriptive,
        other => return Err(ser(format!("invalid question kind: {other}"))),
    };

    Question::new(id, text, marks, kind).map_err(ser)
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptSummary, StorageError> {
    let session_raw: String = row.try_get("session_id").map_err(ser)?;
    let session_id: SessionId = session_raw.parse().map_err(ser)?;
    let exam_id = ExamId::new(row.try_get::<String, _>("exam_id").map_err(ser)?);
    let user_id = UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?);
    let started_at = row.try_get("started_at").map_err(ser)?;
    let submitted_at = row.try_get("submitted_at").map_err(ser)?;

    let trigger_raw: String = row.try_get("submit_trigger").map_err(ser)?;
    let trigger = SubmitTrigger::parse(&trigger_raw)
        .ok_or_else(|| ser(format!("invalid submit_trigger: {trigger_raw}")))?;

    let result = ExamResult {
        percent: u8_from_i64("percent", row.try_get::<i64, _>("percent").map_err(ser)?)?,
        passed: row.try_get::<i64, _>("passed").map_err(ser)? != 0,
        gained_marks: u32_from_i64(
            "gained_marks",
            row.try_get::<i64, _>("gained_marks").map_err(ser)?,
        )?,
        total_marks: u32_from_i64(
            "total_marks",
            row.try_get::<i64, _>("total_marks").map_err(ser)?,
        )?,
    };

    AttemptSummary::new(
        session_id,
        exam_id,
        user_id,
        started_at,
        submitted_at,
        trigger,
        result,
    )
    .map_err(ser)
}
