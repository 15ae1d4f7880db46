use serde::{Deserialize, Serialize};

/// Outcome of grading a submitted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResult {
    pub percent: u8,
    pub passed: bool,
    pub gained_marks: u32,
    pub total_marks: u32,
}

impl ExamResult {
    /// Result used when an exam carries no marks at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            percent: 0,
            passed: false,
            gained_marks: 0,
            total_marks: 0,
        }
    }
}

/// What caused a session to be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    /// The learner asked to submit.
    Manual,
    /// The countdown reached zero.
    TimeExpired,
}

impl SubmitTrigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubmitTrigger::Manual => "manual",
            SubmitTrigger::TimeExpired => "time_expired",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "manual" => Some(Self::Manual),
            "time_expired" => Some(Self::TimeExpired),
            _ => None,
        }
    }
}
