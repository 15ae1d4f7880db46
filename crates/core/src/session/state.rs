use chrono::{DateTime, Utc};
use std::fmt;

use super::SessionError;
use super::countdown::{Countdown, CountdownTick};
use super::navigator::Navigator;
use crate::grading::{Grader, grade};
use crate::model::{
    Answer, AnswerSheet, AttemptSummary, Exam, ExamResult, Question, SessionId, SubmitTrigger,
    UserId,
};

//
// ─── PHASE & OUTCOMES ──────────────────────────────────────────────────────────
//

/// Lifecycle of an exam session. `Submitted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    InProgress,
    Submitted,
}

/// Stored outcome of the one and only submission of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub trigger: SubmitTrigger,
    pub submitted_at: DateTime<Utc>,
    pub result: ExamResult,
}

/// What a call to [`ExamSession::submit`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// This call graded and froze the session.
    Submitted(Submission),
    /// The session was already submitted; the stored submission is returned unchanged.
    AlreadySubmitted(Submission),
}

impl SubmitOutcome {
    #[must_use]
    pub fn submission(&self) -> Submission {
        match self {
            SubmitOutcome::Submitted(s) | SubmitOutcome::AlreadySubmitted(s) => *s,
        }
    }

    #[must_use]
    pub fn result(&self) -> ExamResult {
        self.submission().result
    }

    /// True only for the call that performed the transition.
    #[must_use]
    pub fn is_first(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted(_))
    }
}

/// What a countdown tick did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not started, untimed, or already submitted.
    Idle,
    Running { remaining_secs: u64 },
    /// Time ran out on this tick and the session was submitted.
    Expired(Submission),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One learner's attempt at one exam.
///
/// Single-threaded state machine; callers that share it between a timer
/// and user input must serialise access (the services layer wraps it in a
/// mutex).
pub struct ExamSession {
    id: SessionId,
    user_id: UserId,
    exam: Exam,
    phase: SessionPhase,
    navigator: Navigator,
    answers: AnswerSheet,
    countdown: Countdown,
    started_at: Option<DateTime<Utc>>,
    submission: Option<Submission>,
}

impl ExamSession {
    #[must_use]
    pub fn new(exam: Exam, user_id: UserId) -> Self {
        Self::with_id(SessionId::generate(), exam, user_id)
    }

    #[must_use]
    pub fn with_id(id: SessionId, exam: Exam, user_id: UserId) -> Self {
        let navigator = Navigator::new(exam.question_count());
        let countdown = Countdown::new(exam.duration_secs());
        Self {
            id,
            user_id,
            exam,
            phase: SessionPhase::NotStarted,
            navigator,
            answers: AnswerSheet::new(),
            countdown,
            started_at: None,
            submission: None,
        }
    }

    /// Moves `NotStarted -> InProgress`. Returns `false` if already started.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.phase != SessionPhase::NotStarted {
            return false;
        }
        self.navigator = Navigator::new(self.exam.question_count());
        self.answers = AnswerSheet::new();
        self.countdown = Countdown::new(self.exam.duration_secs());
        self.started_at = Some(now);
        self.phase = SessionPhase::InProgress;
        true
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.phase == SessionPhase::Submitted
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.navigator.current()
    }

    #[must_use]
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.exam.question(self.navigator.current())
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<&Answer> {
        self.answers.get(index)
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u64 {
        self.countdown.remaining_secs()
    }

    #[must_use]
    pub fn is_timer_running(&self) -> bool {
        self.phase == SessionPhase::InProgress && self.countdown.is_active()
    }

    #[must_use]
    pub fn submission(&self) -> Option<Submission> {
        self.submission
    }

    #[must_use]
    pub fn result(&self) -> Option<ExamResult> {
        self.submission.map(|s| s.result)
    }

    //
    // ── navigation ──
    //

    pub fn next(&mut self) -> bool {
        self.is_in_progress() && self.navigator.next()
    }

    pub fn previous(&mut self) -> bool {
        self.is_in_progress() && self.navigator.previous()
    }

    pub fn jump_to(&mut self, index: i64) -> bool {
        self.is_in_progress() && self.navigator.jump_to(index)
    }

    //
    // ── answers ──
    //

    /// Stores `answer` for the question at `index`, replacing any earlier one.
    ///
    /// The answer variant is not checked against the question kind.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` / `SessionError::Submitted` outside
    /// `InProgress`, and `SessionError::QuestionOutOfRange` for an index past
    /// the last question.
    pub fn set_answer(&mut self, index: usize, answer: Answer) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        let len = self.exam.question_count();
        if index >= len {
            return Err(SessionError::QuestionOutOfRange { index, len });
        }
        self.answers.set(index, answer);
        Ok(())
    }

    /// Stores `value` for the question on screen, tagged by its kind.
    ///
    /// # Errors
    ///
    /// See [`ExamSession::set_answer`].
    pub fn answer_current(&mut self, value: impl Into<String>) -> Result<(), SessionError> {
        let index = self.navigator.current();
        let answer = match self.exam.question(index) {
            Some(question) => Answer::for_question(question, value),
            None => {
                self.ensure_in_progress()?;
                return Err(SessionError::QuestionOutOfRange {
                    index,
                    len: self.exam.question_count(),
                });
            }
        };
        self.set_answer(index, answer)
    }

    //
    // ── timer & submission ──
    //

    /// Advances the countdown by one second, submitting when it reaches zero.
    pub fn tick(&mut self, now: DateTime<Utc>, grader: &dyn Grader) -> TickOutcome {
        if !self.is_in_progress() {
            return TickOutcome::Idle;
        }
        match self.countdown.tick() {
            CountdownTick::Inactive => TickOutcome::Idle,
            CountdownTick::Running { remaining_secs } => TickOutcome::Running { remaining_secs },
            CountdownTick::Expired => {
                let submission = self.finalize(SubmitTrigger::TimeExpired, now, grader);
                TickOutcome::Expired(submission)
            }
        }
    }

    /// Grades and freezes the session.
    ///
    /// Idempotent: once submitted, later calls return the stored submission.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` if the session was never started.
    pub fn submit(
        &mut self,
        trigger: SubmitTrigger,
        now: DateTime<Utc>,
        grader: &dyn Grader,
    ) -> Result<SubmitOutcome, SessionError> {
        match (self.phase, self.submission) {
            (SessionPhase::NotStarted, _) => Err(SessionError::NotStarted),
            (SessionPhase::Submitted, Some(existing)) => {
                Ok(SubmitOutcome::AlreadySubmitted(existing))
            }
            _ => Ok(SubmitOutcome::Submitted(self.finalize(trigger, now, grader))),
        }
    }

    /// Builds the durable record of this session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitted` before submission, or
    /// `SessionError::Attempt` if timestamps are inconsistent.
    pub fn attempt_summary(&self) -> Result<AttemptSummary, SessionError> {
        let (Some(started_at), Some(submission)) = (self.started_at, self.submission) else {
            return Err(SessionError::NotSubmitted);
        };
        Ok(AttemptSummary::new(
            self.id,
            self.exam.id().clone(),
            self.user_id.clone(),
            started_at,
            submission.submitted_at,
            submission.trigger,
            submission.result,
        )?)
    }

    fn finalize(
        &mut self,
        trigger: SubmitTrigger,
        now: DateTime<Utc>,
        grader: &dyn Grader,
    ) -> Submission {
        let result = grade(&self.exam, &self.answers, grader);
        // Clamp so a clock that moved backwards cannot produce an invalid attempt.
        let submitted_at = self.started_at.map_or(now, |started| now.max(started));
        let submission = Submission {
            trigger,
            submitted_at,
            result,
        };
        self.countdown.stop();
        self.submission = Some(submission);
        self.phase = SessionPhase::Submitted;
        submission
    }

    fn is_in_progress(&self) -> bool {
        self.phase == SessionPhase::InProgress
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::NotStarted => Err(SessionError::NotStarted),
            SessionPhase::InProgress => Ok(()),
            SessionPhase::Submitted => Err(SessionError::Submitted),
        }
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("id", &self.id)
            .field("exam_id", self.exam.id())
            .field("phase", &self.phase)
            .field("current", &self.navigator.current())
            .field("answered", &self.answers.answered_count())
            .field("remaining_secs", &self.countdown.remaining_secs())
            .field("submission", &self.submission)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
