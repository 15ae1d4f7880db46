use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question marks must be > 0")]
    InvalidMarks,

    #[error("multiple-choice question needs at least one option")]
    NoOptions,

    #[error("multiple-choice question needs a correct answer")]
    MissingCorrectAnswer,
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// How a question is answered and graded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    /// Learner picks one of `options`; graded by exact match with `correct_answer`.
    MultipleChoice {
        options: Vec<String>,
        correct_answer: String,
    },
    /// Learner writes free text.
    Descriptive,
}

impl QuestionKind {
    /// Short label used in persisted rows and the JSON catalogue.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice { .. } => "mcq",
            QuestionKind::Descriptive => "descriptive",
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    marks: u32,
    kind: QuestionKind,
}

impl Question {
    /// Builds a multiple-choice question.
    ///
    /// The correct answer is not required to be one of the options; exam
    /// builders may save a question before the options are filled in.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if text is blank, marks are zero, no options
    /// are given or the correct answer is empty.
    pub fn multiple_choice(
        id: QuestionId,
        text: impl Into<String>,
        marks: u32,
        options: Vec<String>,
        correct_answer: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        Self::new(
            id,
            text,
            marks,
            QuestionKind::MultipleChoice {
                options,
                correct_answer: correct_answer.into(),
            },
        )
    }

    /// Builds a descriptive (free-text) question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if text is blank or marks are zero.
    pub fn descriptive(
        id: QuestionId,
        text: impl Into<String>,
        marks: u32,
    ) -> Result<Self, QuestionError> {
        Self::new(id, text, marks, QuestionKind::Descriptive)
    }

    /// Builds a question of any kind, validating its fields.
    ///
    /// # Errors
    ///
    /// See [`Question::multiple_choice`] and [`Question::descriptive`].
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        marks: u32,
        kind: QuestionKind,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if marks == 0 {
            return Err(QuestionError::InvalidMarks);
        }
        if let QuestionKind::MultipleChoice {
            options,
            correct_answer,
        } = &kind
        {
            if options.is_empty() {
                return Err(QuestionError::NoOptions);
            }
            if correct_answer.is_empty() {
                return Err(QuestionError::MissingCorrectAnswer);
            }
        }

        Ok(Self {
            id,
            text,
            marks,
            kind,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn marks(&self) -> u32 {
        self.marks
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    #[must_use]
    pub fn is_multiple_choice(&self) -> bool {
        matches!(self.kind, QuestionKind::MultipleChoice { .. })
    }

    /// Options in display order; empty for descriptive questions.
    #[must_use]
    pub fn options(&self) -> &[String] {
        match &self.kind {
            QuestionKind::MultipleChoice { options, .. } => options,
            QuestionKind::Descriptive => &[],
        }
    }

    #[must_use]
    pub fn correct_answer(&self) -> Option<&str> {
        match &self.kind {
            QuestionKind::MultipleChoice { correct_answer, .. } => Some(correct_answer),
            QuestionKind::Descriptive => None,
        }
    }
}
