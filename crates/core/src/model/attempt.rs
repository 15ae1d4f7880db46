use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{ExamId, SessionId, UserId};
use crate::model::result::{ExamResult, SubmitTrigger};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("submitted_at is before started_at")]
    InvalidTimeRange,

    #[error("gained marks ({gained}) exceed total marks ({total})")]
    MarksOverflow { gained: u32, total: u32 },

    #[error("percent out of range: {0}")]
    InvalidPercent(u8),
}

/// Durable record of one submitted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSummary {
    session_id: SessionId,
    exam_id: ExamId,
    user_id: UserId,
    started_at: DateTime<Utc>,
    submitted_at: DateTime<Utc>,
    trigger: SubmitTrigger,
    result: ExamResult,
}

impl AttemptSummary {
    /// Builds an attempt summary, checking timestamps and marks line up.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidTimeRange` if `submitted_at < started_at`.
    /// Returns `AttemptError::MarksOverflow` if gained marks exceed total marks.
    /// Returns `AttemptError::InvalidPercent` if the percent exceeds 100.
    pub fn new(
        session_id: SessionId,
        exam_id: ExamId,
        user_id: UserId,
        started_at: DateTime<Utc>,
        submitted_at: DateTime<Utc>,
        trigger: SubmitTrigger,
        result: ExamResult,
    ) -> Result<Self, AttemptError> {
        if submitted_at < started_at {
            return Err(AttemptError::InvalidTimeRange);
        }
        if result.gained_marks > result.total_marks {
            return Err(AttemptError::MarksOverflow {
                gained: result.gained_marks,
                total: result.total_marks,
            });
        }
        if result.percent > 100 {
            return Err(AttemptError::InvalidPercent(result.percent));
        }

        Ok(Self {
            session_id,
            exam_id,
            user_id,
            started_at,
            submitted_at,
            trigger,
            result,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    #[must_use]
    pub fn trigger(&self) -> SubmitTrigger {
        self.trigger
    }

    #[must_use]
    pub fn result(&self) -> ExamResult {
        self.result
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.result.passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn result(gained: u32, total: u32) -> ExamResult {
        ExamResult {
            percent: 50,
            passed: true,
            gained_marks: gained,
            total_marks: total,
        }
    }

    #[test]
    fn rejects_submission_before_start() {
        let now = fixed_now();
        let err = AttemptSummary::new(
            SessionId::generate(),
            ExamId::new("e1"),
            UserId::new("u1"),
            now,
            now - chrono::Duration::seconds(1),
            SubmitTrigger::Manual,
            result(5, 10),
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::InvalidTimeRange);
    }

    #[test]
    fn rejects_gained_above_total() {
        let now = fixed_now();
        let err = AttemptSummary::new(
            SessionId::generate(),
            ExamId::new("e1"),
            UserId::new("u1"),
            now,
            now,
            SubmitTrigger::TimeExpired,
            result(11, 10),
        )
        .unwrap_err();
        assert_eq!(err, AttemptError::MarksOverflow { gained: 11, total: 10 });
    }
}
