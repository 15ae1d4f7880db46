#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod rewards;
pub mod sessions;

pub use exam_core::Clock;

pub use app_services::AppServices;
pub use config::SessionConfig;
pub use error::{AppServicesError, RewardError, SessionServiceError};
pub use rewards::{ExamPassed, LedgerRewardSink, RewardSink};
pub use sessions::{
    ExamSessionService, QuestionStatus, QuestionView, RunningSession, SessionController,
    SessionEvent, SessionOutcome, SessionTimer, SessionView, TimerHandle,
};
