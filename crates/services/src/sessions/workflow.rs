use std::sync::Arc;

use exam_core::model::{AttemptSummary, Exam, ExamId, UserId};
use exam_core::session::ExamSession;
use exam_core::{Grader, PlaceholderGrader};
use storage::repository::{AttemptRepository, AttemptRow, ExamRepository, Storage, StorageError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::controller::{SessionController, SessionEvent};
use crate::Clock;
use crate::config::SessionConfig;
use crate::error::SessionServiceError;
use crate::rewards::{LedgerRewardSink, RewardSink};

/// What happened after a session was submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub attempt: AttemptSummary,
    /// `None` if the attempt could not be stored.
    pub attempt_id: Option<i64>,
    pub reward_granted: bool,
}

/// Orchestrates loading an exam, running its session and the follow-up
/// effects: storing the attempt and granting the pass reward.
#[derive(Clone)]
pub struct ExamSessionService {
    clock: Clock,
    config: SessionConfig,
    grader: Arc<dyn Grader>,
    exams: Arc<dyn ExamRepository>,
    attempts: Arc<dyn AttemptRepository>,
    rewards: Arc<dyn RewardSink>,
}

impl ExamSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        exams: Arc<dyn ExamRepository>,
        attempts: Arc<dyn AttemptRepository>,
        rewards: Arc<dyn RewardSink>,
    ) -> Self {
        Self {
            clock,
            config: SessionConfig::default(),
            grader: Arc::new(PlaceholderGrader),
            exams,
            attempts,
            rewards,
        }
    }

    /// Wires the service to `storage`, granting rewards through its XP ledger.
    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        let rewards = Arc::new(LedgerRewardSink::new(clock, Arc::clone(&storage.xp)));
        Self::new(
            clock,
            Arc::clone(&storage.exams),
            Arc::clone(&storage.attempts),
            rewards,
        )
    }

    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_grader(mut self, grader: Arc<dyn Grader>) -> Self {
        self.grader = grader;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// # Errors
    ///
    /// Returns `SessionServiceError::ExamNotFound` for unknown ids, or
    /// `SessionServiceError::Storage` on other repository failures.
    pub async fn load_exam(&self, exam_id: &ExamId) -> Result<Exam, SessionServiceError> {
        match self.exams.get_exam(exam_id).await {
            Ok(exam) => Ok(exam),
            Err(StorageError::NotFound) => Err(SessionServiceError::ExamNotFound(exam_id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` on repository failures.
    pub async fn list_exams(&self) -> Result<Vec<Exam>, SessionServiceError> {
        Ok(self.exams.list_exams().await?)
    }

    /// Most recent attempts first, up to the configured history limit.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` on repository failures.
    pub async fn history(
        &self,
        exam_id: &ExamId,
        user_id: &UserId,
    ) -> Result<Vec<AttemptRow>, SessionServiceError> {
        Ok(self
            .attempts
            .list_attempts(exam_id, user_id, self.config.history_limit)
            .await?)
    }

    /// Loads `exam_id` and starts a session for `user_id`.
    ///
    /// # Errors
    ///
    /// See [`ExamSessionService::load_exam`].
    pub async fn start_session(
        &self,
        exam_id: &ExamId,
        user_id: UserId,
    ) -> Result<RunningSession, SessionServiceError> {
        let exam = self.load_exam(exam_id).await?;
        Ok(self.start_exam(exam, user_id).await)
    }

    /// Starts a session for an already loaded exam: the countdown begins and
    /// the effects task starts listening for submission.
    pub async fn start_exam(&self, exam: Exam, user_id: UserId) -> RunningSession {
        let session = ExamSession::new(exam, user_id);
        let (controller, events) =
            SessionController::new(session, Arc::clone(&self.grader), self.clock);
        controller.start();
        controller.start_timer(self.config.tick_interval);

        let effects = tokio::spawn(run_effects(
            events,
            Arc::clone(&self.attempts),
            Arc::clone(&self.rewards),
            self.config.clone(),
        ));

        RunningSession {
            controller,
            effects,
        }
    }
}

/// Persists the attempt and grants the reward. Failures are logged and
/// never touch the stored result.
async fn run_effects(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    attempts: Arc<dyn AttemptRepository>,
    rewards: Arc<dyn RewardSink>,
    config: SessionConfig,
) -> Option<SessionOutcome> {
    let mut outcome: Option<SessionOutcome> = None;

    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Submitted(attempt) => {
                let attempt_id = match attempts.append_attempt(&attempt).await {
                    Ok(id) => Some(id),
                    Err(e) => {
                        tracing::warn!(session = %attempt.session_id(), "attempt not stored: {e}");
                        None
                    }
                };
                let passed = attempt.passed();
                outcome = Some(SessionOutcome {
                    attempt,
                    attempt_id,
                    reward_granted: false,
                });
                if !passed {
                    break;
                }
            }
            SessionEvent::Passed(passed) => {
                let granted = match rewards
                    .notify_passed(
                        &passed.user_id,
                        config.pass_reward_xp,
                        &config.pass_reward_reason,
                    )
                    .await
                {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(user = %passed.user_id, "reward not granted: {e}");
                        false
                    }
                };
                if let Some(outcome) = outcome.as_mut() {
                    outcome.reward_granted = granted;
                }
                break;
            }
        }
    }

    outcome
}

/// A started session plus its background effects.
#[derive(Debug)]
pub struct RunningSession {
    controller: SessionController,
    effects: JoinHandle<Option<SessionOutcome>>,
}

impl RunningSession {
    #[must_use]
    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Tears the session down.
    ///
    /// For a submitted session this waits for the attempt to be stored and
    /// the reward to be granted. An unsubmitted session is abandoned and
    /// nothing is stored.
    pub async fn finish(self) -> Option<SessionOutcome> {
        self.controller.shutdown_timer().await;
        // Read under the session lock: an expiry can land after the watch flag was checked.
        if !self.controller.with_session(ExamSession::is_submitted) {
            self.effects.abort();
            tracing::debug!("session abandoned before submission");
            return None;
        }
        match self.effects.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("session effects failed: {e}");
                None
            }
        }
    }
}
