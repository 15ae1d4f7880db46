mod answer;
mod attempt;
mod exam;
mod ids;
mod question;
mod result;

pub use ids::{ExamId, ParseIdError, QuestionId, SessionId, UserId};

pub use answer::{Answer, AnswerSheet};
pub use attempt::{AttemptError, AttemptSummary};
pub use exam::{Exam, ExamError};
pub use question::{Question, QuestionError, QuestionKind};
pub use result::{ExamResult, SubmitTrigger};
