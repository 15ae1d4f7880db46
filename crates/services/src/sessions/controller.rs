use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use exam_core::Grader;
use exam_core::model::{Answer, AttemptSummary, ExamResult, SubmitTrigger};
use exam_core::session::{ExamSession, SessionError, SubmitOutcome, TickOutcome};
use tokio::sync::{mpsc, watch};

use super::timer::{SessionTimer, TimerHandle};
use super::view::SessionView;
use crate::Clock;
use crate::rewards::ExamPassed;

/// Emitted once per session, in this order, on first submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Submitted(AttemptSummary),
    /// Only when the attempt met the pass threshold.
    Passed(ExamPassed),
}

struct Shared {
    session: Mutex<ExamSession>,
    grader: Arc<dyn Grader>,
    clock: Clock,
    events: mpsc::UnboundedSender<SessionEvent>,
    submitted: watch::Sender<bool>,
    timer: Mutex<Option<TimerHandle>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Every transition leaves the session consistent, so a poisoned lock is safe to reuse.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handle to a running exam session.
///
/// Timer ticks and learner actions go through the same lock, so submission
/// happens exactly once regardless of which side triggers it. Clones refer
/// to the same session.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    /// Wraps `session` and returns the receiving end of its event stream.
    #[must_use]
    pub fn new(
        session: ExamSession,
        grader: Arc<dyn Grader>,
        clock: Clock,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (submitted, _) = watch::channel(session.is_submitted());
        let shared = Arc::new(Shared {
            session: Mutex::new(session),
            grader,
            clock,
            events,
            submitted,
            timer: Mutex::new(None),
        });
        (Self { shared }, rx)
    }

    /// Moves the session into progress. Returns `false` if it had already started.
    pub fn start(&self) -> bool {
        let mut session = lock(&self.shared.session);
        let started = session.start(self.shared.clock.now());
        if started {
            tracing::debug!(
                session = %session.id(),
                exam = %session.exam().id(),
                remaining_secs = session.remaining_secs(),
                "session started"
            );
        }
        started
    }

    /// Spawns the countdown task ticking every `period`.
    ///
    /// Returns `false` when the session is untimed, not in progress, or
    /// already has a timer. Must be called from within a tokio runtime.
    pub fn start_timer(&self, period: Duration) -> bool {
        if !lock(&self.shared.session).is_timer_running() {
            return false;
        }
        let mut timer = lock(&self.shared.timer);
        if timer.as_ref().is_some_and(|t| !t.is_finished()) {
            return false;
        }

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        *timer = Some(SessionTimer::spawn(period, move || {
            let Some(shared) = weak.upgrade() else {
                return false;
            };
            matches!(
                SessionController { shared }.tick(),
                TickOutcome::Running { .. }
            )
        }));
        true
    }

    /// Stops the countdown task, if any. The session itself is unchanged.
    pub fn stop_timer(&self) {
        let handle = lock(&self.shared.timer).take();
        if let Some(handle) = handle {
            handle.cancel();
        }
    }

    /// Like [`SessionController::stop_timer`], but also waits for a tick that
    /// is already running to finish.
    pub async fn shutdown_timer(&self) {
        let handle = lock(&self.shared.timer).take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }

    /// Advances the countdown by one second, auto-submitting at zero.
    pub fn tick(&self) -> TickOutcome {
        let outcome = {
            let mut session = lock(&self.shared.session);
            let outcome = session.tick(self.shared.clock.now(), self.shared.grader.as_ref());
            if matches!(outcome, TickOutcome::Expired(_)) {
                self.publish(&session);
            }
            outcome
        };
        if matches!(outcome, TickOutcome::Expired(_)) {
            self.after_submit();
        }
        outcome
    }

    /// Manual submission. Confirmation is the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` if the session was never started.
    pub fn submit(&self) -> Result<SubmitOutcome, SessionError> {
        let outcome = {
            let mut session = lock(&self.shared.session);
            let outcome = session.submit(
                SubmitTrigger::Manual,
                self.shared.clock.now(),
                self.shared.grader.as_ref(),
            )?;
            if outcome.is_first() {
                self.publish(&session);
            }
            outcome
        };
        if outcome.is_first() {
            self.after_submit();
        }
        Ok(outcome)
    }

    pub fn next(&self) -> bool {
        lock(&self.shared.session).next()
    }

    pub fn previous(&self) -> bool {
        lock(&self.shared.session).previous()
    }

    pub fn jump_to(&self, index: i64) -> bool {
        lock(&self.shared.session).jump_to(index)
    }

    /// # Errors
    ///
    /// See [`ExamSession::set_answer`].
    pub fn set_answer(&self, index: usize, answer: Answer) -> Result<(), SessionError> {
        lock(&self.shared.session).set_answer(index, answer)
    }

    /// # Errors
    ///
    /// See [`ExamSession::answer_current`].
    pub fn answer_current(&self, value: impl Into<String>) -> Result<(), SessionError> {
        lock(&self.shared.session).answer_current(value)
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView::from_session(&lock(&self.shared.session))
    }

    #[must_use]
    pub fn result(&self) -> Option<ExamResult> {
        lock(&self.shared.session).result()
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        *self.shared.submitted.borrow()
    }

    /// Read-only access to the underlying session.
    pub fn with_session<R>(&self, f: impl FnOnce(&ExamSession) -> R) -> R {
        f(&lock(&self.shared.session))
    }

    #[must_use]
    pub fn subscribe_submitted(&self) -> watch::Receiver<bool> {
        self.shared.submitted.subscribe()
    }

    /// Resolves once the session has been submitted by either trigger.
    pub async fn wait_submitted(&self) {
        let mut rx = self.subscribe_submitted();
        // The sender lives as long as `self`, so this only returns on submission.
        let _ = rx.wait_for(|submitted| *submitted).await;
    }

    fn publish(&self, session: &ExamSession) {
        let attempt = match session.attempt_summary() {
            Ok(attempt) => attempt,
            Err(e) => {
                tracing::warn!(session = %session.id(), "cannot build attempt: {e}");
                return;
            }
        };
        let result = attempt.result();
        tracing::info!(
            session = %attempt.session_id(),
            exam = %attempt.exam_id(),
            trigger = attempt.trigger().as_str(),
            percent = result.percent,
            passed = result.passed,
            "session submitted"
        );

        let passed = attempt.passed().then(|| ExamPassed {
            session_id: attempt.session_id(),
            exam_id: attempt.exam_id().clone(),
            user_id: attempt.user_id().clone(),
            percent: result.percent,
            passed_at: attempt.submitted_at(),
        });
        if self.shared.events.send(SessionEvent::Submitted(attempt)).is_err() {
            tracing::debug!("no listener for session events");
            return;
        }
        if let Some(passed) = passed {
            let _ = self.shared.events.send(SessionEvent::Passed(passed));
        }
    }

    fn after_submit(&self) {
        self.shared.submitted.send_replace(true);
        self.stop_timer();
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = lock(&self.shared.session);
        f.debug_struct("SessionController")
            .field("session", &session.id())
            .field("phase", &session.phase())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::PlaceholderGrader;
    use exam_core::model::{Exam, ExamId, Question, QuestionId, UserId};
    use exam_core::session::SessionPhase;
    use exam_core::time::fixed_clock;

    fn exam(duration_minutes: u32) -> Exam {
        Exam::new(
            ExamId::new("exam_demo"),
            "React",
            duration_minutes,
            60,
            vec![
                Question::multiple_choice(
                    QuestionId::new(1),
                    "Which hook handles side effects?",
                    10,
                    vec!["useState".into(), "useEffect".into()],
                    "useEffect",
                )
                .unwrap(),
            ],
        )
        .unwrap()
    }

    fn controller(
        duration_minutes: u32,
    ) -> (SessionController, mpsc::UnboundedReceiver<SessionEvent>) {
        let session = ExamSession::new(exam(duration_minutes), UserId::new("u1"));
        SessionController::new(session, Arc::new(PlaceholderGrader), fixed_clock())
    }

    #[test]
    fn manual_submit_publishes_submitted_then_passed() {
        let (ctl, mut rx) = controller(45);
        assert!(ctl.start());
        ctl.answer_current("useEffect").unwrap();

        let outcome = ctl.submit().unwrap();
        assert!(outcome.is_first());
        assert_eq!(outcome.result().percent, 100);
        assert!(ctl.is_submitted());

        let Ok(SessionEvent::Submitted(attempt)) = rx.try_recv() else {
            panic!("expected submitted event");
        };
        assert_eq!(attempt.trigger(), SubmitTrigger::Manual);
        let Ok(SessionEvent::Passed(passed)) = rx.try_recv() else {
            panic!("expected passed event");
        };
        assert_eq!(passed.percent, 100);
        assert_eq!(passed.user_id, UserId::new("u1"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn failing_attempt_publishes_only_submitted() {
        let (ctl, mut rx) = controller(45);
        ctl.start();
        ctl.answer_current("useState").unwrap();
        ctl.submit().unwrap();

        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Submitted(_))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn second_submit_returns_stored_result_without_events() {
        let (ctl, mut rx) = controller(45);
        ctl.start();
        let first = ctl.submit().unwrap();
        while rx.try_recv().is_ok() {}

        let second = ctl.submit().unwrap();
        assert!(!second.is_first());
        assert_eq!(second.result(), first.result());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn submit_before_start_is_rejected() {
        let (ctl, _rx) = controller(45);
        assert_eq!(ctl.submit().unwrap_err(), SessionError::NotStarted);
        assert!(!ctl.is_submitted());
    }

    #[test]
    fn answers_and_navigation_freeze_after_submit() {
        let (ctl, _rx) = controller(45);
        ctl.start();
        ctl.submit().unwrap();
        assert_eq!(
            ctl.answer_current("useEffect").unwrap_err(),
            SessionError::Submitted
        );
        assert!(!ctl.next());
        assert!(!ctl.jump_to(0));
        assert_eq!(ctl.view().phase, SessionPhase::Submitted);
    }

    #[test]
    fn clones_share_one_session() {
        let (ctl, _rx) = controller(45);
        let other = ctl.clone();
        ctl.start();
        other.submit().unwrap();
        assert!(ctl.is_submitted());
        assert_eq!(ctl.result(), other.result());
    }

    #[test]
    fn untimed_session_has_no_timer() {
        let (ctl, _rx) = controller(0);
        ctl.start();
        assert!(!ctl.start_timer(Duration::from_secs(1)));
        assert_eq!(ctl.tick(), TickOutcome::Idle);
    }

    #[test]
    fn manual_ticks_expire_exactly_once() {
        let (ctl, mut rx) = controller(1);
        ctl.start();
        for _ in 0..59 {
            assert!(matches!(ctl.tick(), TickOutcome::Running { .. }));
        }
        let TickOutcome::Expired(submission) = ctl.tick() else {
            panic!("expected expiry on the sixtieth tick");
        };
        assert_eq!(submission.trigger, SubmitTrigger::TimeExpired);
        assert_eq!(ctl.tick(), TickOutcome::Idle);
        assert!(!ctl.submit().unwrap().is_first());

        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Submitted(_))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_auto_submits_when_time_runs_out() {
        let (ctl, mut rx) = controller(1);
        ctl.start();
        assert!(ctl.start_timer(Duration::from_secs(1)));
        assert!(!ctl.start_timer(Duration::from_secs(1)));

        tokio::time::sleep(Duration::from_millis(59_500)).await;
        assert!(!ctl.is_submitted());
        assert_eq!(ctl.view().remaining_secs, 1);

        tokio::time::timeout(Duration::from_secs(5), ctl.wait_submitted())
            .await
            .expect("auto-submit");
        let Some(SessionEvent::Submitted(attempt)) = rx.recv().await else {
            panic!("expected submitted event");
        };
        assert_eq!(attempt.trigger(), SubmitTrigger::TimeExpired);
        assert_eq!(attempt.result().percent, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_stops_the_timer() {
        let (ctl, _rx) = controller(1);
        ctl.start();
        ctl.start_timer(Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        ctl.submit().unwrap();
        let frozen = ctl.view().remaining_secs;
        assert_eq!(frozen, 50);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(ctl.view().remaining_secs, frozen);
        assert_eq!(
            ctl.with_session(|s| s.submission().map(|s| s.trigger)),
            Some(SubmitTrigger::Manual)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_controller_ends_the_timer_task() {
        let metrics = tokio::runtime::Handle::current().metrics();
        let (ctl, mut rx) = controller(1);
        let other = ctl.clone();
        ctl.start();
        assert!(ctl.start_timer(Duration::from_secs(1)));
        assert_eq!(metrics.num_alive_tasks(), 1);

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        drop(ctl);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(other.view().remaining_secs, 56);

        drop(other);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(metrics.num_alive_tasks(), 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_timer_freezes_the_countdown() {
        let (ctl, _rx) = controller(1);
        ctl.start();
        ctl.start_timer(Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        ctl.shutdown_timer().await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(ctl.view().remaining_secs, 57);
        assert!(!ctl.is_submitted());
    }
}
