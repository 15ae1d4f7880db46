use exam_core::model::ExamResult;
use exam_core::session::{ExamSession, SessionPhase};

/// Remaining time below which the countdown is shown as a warning.
pub const LOW_TIME_THRESHOLD_SECS: u64 = 300;

/// Status of one entry in the question map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    Current,
    Answered,
    Unvisited,
}

/// The question on screen together with the learner's current answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub text: String,
    pub marks: u32,
    pub is_multiple_choice: bool,
    pub options: Vec<String>,
    pub answer: Option<String>,
}

/// Snapshot of a session for a shell to render.
///
/// Everything is copied out of the session so the snapshot can be held
/// without keeping the session locked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub exam_title: String,
    pub phase: SessionPhase,
    /// One-based position of the current question; zero for an empty exam.
    pub position: usize,
    pub question_count: usize,
    pub question: Option<QuestionView>,
    pub is_first: bool,
    pub is_last: bool,
    pub is_timed: bool,
    pub remaining_secs: u64,
    pub remaining_label: String,
    pub low_time: bool,
    pub answered_count: usize,
    pub question_map: Vec<QuestionStatus>,
    pub result: Option<ExamResult>,
}

impl SessionView {
    #[must_use]
    pub fn from_session(session: &ExamSession) -> Self {
        let exam = session.exam();
        let current = session.current_index();
        let question_count = exam.question_count();
        let remaining_secs = session.remaining_secs();
        let is_timed = exam.is_timed();

        let question = session.current_question().map(|q| QuestionView {
            text: q.text().to_owned(),
            marks: q.marks(),
            is_multiple_choice: q.is_multiple_choice(),
            options: q.options().to_vec(),
            answer: session.answer(current).map(|a| a.text().to_owned()),
        });

        let question_map = (0..question_count)
            .map(|i| {
                if i == current {
                    QuestionStatus::Current
                } else if session.answers().is_answered(i) {
                    QuestionStatus::Answered
                } else {
                    QuestionStatus::Unvisited
                }
            })
            .collect();

        Self {
            exam_title: exam.title().to_owned(),
            phase: session.phase(),
            position: if question_count == 0 { 0 } else { current + 1 },
            question_count,
            question,
            is_first: session.navigator().is_first(),
            is_last: session.navigator().is_last(),
            is_timed,
            remaining_secs,
            remaining_label: format_remaining(remaining_secs),
            low_time: is_timed
                && session.phase() == SessionPhase::InProgress
                && remaining_secs < LOW_TIME_THRESHOLD_SECS,
            answered_count: session.answers().answered_count(),
            question_map,
            result: session.result(),
        }
    }
}

/// Formats seconds as `m:ss`.
#[must_use]
pub fn format_remaining(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Exam, ExamId, Question, QuestionId, UserId};
    use exam_core::time::fixed_now;

    fn session(duration_minutes: u32) -> ExamSession {
        let exam = Exam::new(
            ExamId::new("e"),
            "Demo",
            duration_minutes,
            60,
            vec![
                Question::multiple_choice(
                    QuestionId::new(1),
                    "Pick",
                    10,
                    vec!["a".into(), "b".into()],
                    "a",
                )
                .unwrap(),
                Question::descriptive(QuestionId::new(2), "Explain", 10).unwrap(),
                Question::descriptive(QuestionId::new(3), "Explain more", 10).unwrap(),
            ],
        )
        .unwrap();
        ExamSession::new(exam, UserId::new("u"))
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_remaining(2700), "45:00");
        assert_eq!(format_remaining(299), "4:59");
        assert_eq!(format_remaining(5), "0:05");
        assert_eq!(format_remaining(0), "0:00");
    }

    #[test]
    fn question_map_marks_current_answered_and_unvisited() {
        let mut s = session(45);
        s.start(fixed_now());
        s.answer_current("a").unwrap();
        s.next();

        let view = SessionView::from_session(&s);
        assert_eq!(view.position, 2);
        assert_eq!(
            view.question_map,
            vec![
                QuestionStatus::Answered,
                QuestionStatus::Current,
                QuestionStatus::Unvisited,
            ]
        );
        assert_eq!(view.answered_count, 1);
        assert_eq!(view.remaining_label, "45:00");
        assert!(!view.low_time);
        assert!(!view.question.unwrap().is_multiple_choice);
    }

    #[test]
    fn low_time_warning_below_five_minutes() {
        let mut s = session(5);
        s.start(fixed_now());
        assert!(!SessionView::from_session(&s).low_time);

        let grader = exam_core::PlaceholderGrader;
        s.tick(fixed_now(), &grader);
        let view = SessionView::from_session(&s);
        assert_eq!(view.remaining_label, "4:59");
        assert!(view.low_time);
    }

    #[test]
    fn untimed_exam_never_warns() {
        let mut s = session(0);
        s.start(fixed_now());
        let view = SessionView::from_session(&s);
        assert!(!view.is_timed);
        assert!(!view.low_time);
    }

    #[test]
    fn submitted_view_carries_result() {
        let mut s = session(45);
        s.start(fixed_now());
        s.answer_current("a").unwrap();
        s.submit(
            exam_core::model::SubmitTrigger::Manual,
            fixed_now(),
            &exam_core::PlaceholderGrader,
        )
        .unwrap();
        let view = SessionView::from_session(&s);
        assert_eq!(view.phase, SessionPhase::Submitted);
        assert_eq!(view.result.unwrap().percent, 33);
    }
}
