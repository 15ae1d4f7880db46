//! The timed exam session state machine and its parts.

mod countdown;
mod navigator;
mod state;

use thiserror::Error;

use crate::model::AttemptError;

pub use countdown::{Countdown, CountdownTick};
pub use navigator::Navigator;
pub use state::{ExamSession, SessionPhase, SubmitOutcome, Submission, TickOutcome};

/// Rejected session mutations.
///
/// None of these are fatal; callers usually log and carry on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session has not started")]
    NotStarted,

    #[error("session already submitted")]
    Submitted,

    #[error("session has not been submitted")]
    NotSubmitted,

    #[error("question {index} out of range (exam has {len})")]
    QuestionOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Attempt(#[from] AttemptError),
}
