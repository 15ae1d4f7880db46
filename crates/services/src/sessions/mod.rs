mod controller;
mod timer;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionServiceError;
pub use controller::{SessionController, SessionEvent};
pub use timer::{SessionTimer, TimerHandle};
pub use view::{LOW_TIME_THRESHOLD_SECS, QuestionStatus, QuestionView, SessionView, format_remaining};
pub use workflow::{ExamSessionService, RunningSession, SessionOutcome};
