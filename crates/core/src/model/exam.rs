use thiserror::Error;

use crate::model::ids::ExamId;
use crate::model::question::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("exam id cannot be empty")]
    EmptyId,

    #[error("exam title cannot be empty")]
    EmptyTitle,

    #[error("pass score must be between 0 and 100, got {0}")]
    InvalidPassScore(u32),
}

//
// ─── EXAM ──────────────────────────────────────────────────────────────────────
//

/// A timed (or untimed) assessment made of ordered questions.
///
/// Exams are immutable once built; a running session holds its own copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exam {
    id: ExamId,
    title: String,
    duration_minutes: u32,
    pass_score_percent: u8,
    questions: Vec<Question>,
}

impl Exam {
    /// Creates an exam definition.
    ///
    /// `duration_minutes == 0` means the exam is untimed. An exam with no
    /// questions is allowed and always grades to zero.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` if id or title are blank or the pass score exceeds 100.
    pub fn new(
        id: ExamId,
        title: impl Into<String>,
        duration_minutes: u32,
        pass_score_percent: u32,
        questions: Vec<Question>,
    ) -> Result<Self, ExamError> {
        let title = title.into();
        if id.as_str().trim().is_empty() {
            return Err(ExamError::EmptyId);
        }
        if title.trim().is_empty() {
            return Err(ExamError::EmptyTitle);
        }
        let pass_score_percent = u8::try_from(pass_score_percent)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or(ExamError::InvalidPassScore(pass_score_percent))?;

        Ok(Self {
            id,
            title,
            duration_minutes,
            pass_score_percent,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> &ExamId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    #[must_use]
    pub fn pass_score_percent(&self) -> u8 {
        self.pass_score_percent
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.duration_minutes > 0
    }

    /// Countdown length in seconds (0 for untimed exams).
    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    /// Sum of marks over all questions.
    #[must_use]
    pub fn total_marks(&self) -> u32 {
        self.questions
            .iter()
            .fold(0_u32, |acc, q| acc.saturating_add(q.marks()))
    }
}
