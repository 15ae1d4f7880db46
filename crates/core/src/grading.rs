//! Scoring of submitted answer sheets.

use crate::model::{Answer, AnswerSheet, Exam, ExamResult, Question, QuestionKind};

/// Descriptive answers longer than this many characters earn full marks
/// under [`PlaceholderGrader`].
pub const DESCRIPTIVE_MIN_CHARS: usize = 20;

//
// ─── STRATEGY ──────────────────────────────────────────────────────────────────
//

/// Decides how many marks a single answer earns.
///
/// Implementations must be pure: the same question and answer always
/// yield the same marks.
pub trait Grader: Send + Sync {
    fn marks_for(&self, question: &Question, answer: &Answer) -> u32;
}

/// All-or-nothing grading with a length heuristic for free text.
///
/// - multiple choice: full marks iff the answer text equals the correct
///   answer exactly (case-sensitive, no trimming)
/// - descriptive: full marks iff the answer has more than
///   [`DESCRIPTIVE_MIN_CHARS`] characters
///
/// The descriptive rule is a stand-in until real grading exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderGrader;

impl Grader for PlaceholderGrader {
    fn marks_for(&self, question: &Question, answer: &Answer) -> u32 {
        let earned = match question.kind() {
            QuestionKind::MultipleChoice { correct_answer, .. } => {
                answer.text() == correct_answer
            }
            QuestionKind::Descriptive => answer.text().chars().count() > DESCRIPTIVE_MIN_CHARS,
        };
        if earned { question.marks() } else { 0 }
    }
}

//
// ─── AGGREGATION ───────────────────────────────────────────────────────────────
//

/// Grades `answers` against `exam`.
///
/// Every question contributes to the total; unanswered questions earn
/// nothing. Percent is rounded half-up. An exam with no marks grades to
/// `0%` and fails regardless of its pass threshold.
#[must_use]
pub fn grade(exam: &Exam, answers: &AnswerSheet, grader: &dyn Grader) -> ExamResult {
    let mut total: u64 = 0;
    let mut gained: u64 = 0;

    for (index, question) in exam.questions().iter().enumerate() {
        total += u64::from(question.marks());
        if let Some(answer) = answers.get(index) {
            // A grader may not award more than the question is worth.
            gained += u64::from(grader.marks_for(question, answer).min(question.marks()));
        }
    }

    if total == 0 {
        return ExamResult::empty();
    }

    let percent = round_percent(gained, total);
    ExamResult {
        percent,
        passed: percent >= exam.pass_score_percent(),
        gained_marks: u32::try_from(gained).unwrap_or(u32::MAX),
        total_marks: u32::try_from(total).unwrap_or(u32::MAX),
    }
}

/// `round(gained / total * 100)` in integer arithmetic; `gained <= total`.
fn round_percent(gained: u64, total: u64) -> u8 {
    let pct = (gained * 200 + total) / (total * 2);
    u8::try_from(pct.min(100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExamId, QuestionId};

    fn mcq(id: u64, marks: u32, correct: &str) -> Question {
        Question::multiple_choice(
            QuestionId::new(id),
            format!("Question {id}"),
            marks,
            vec!["A".into(), "B".into(), "C".into()],
            correct,
        )
        .unwrap()
    }

    fn descriptive(id: u64, marks: u32) -> Question {
        Question::descriptive(QuestionId::new(id), format!("Explain {id}"), marks).unwrap()
    }

    fn exam(pass: u32, questions: Vec<Question>) -> Exam {
        Exam::new(ExamId::new("exam"), "Exam", 10, pass, questions).unwrap()
    }

    fn sheet(entries: &[(usize, Answer)]) -> AnswerSheet {
        entries.iter().cloned().collect()
    }

    #[test]
    fn correct_choice_scores_full_marks() {
        let exam = exam(60, vec![mcq(1, 10, "B")]);
        let result = grade(&exam, &sheet(&[(0, Answer::Choice("B".into()))]), &PlaceholderGrader);
        assert_eq!(result.percent, 100);
        assert!(result.passed);
        assert_eq!(result.gained_marks, 10);
        assert_eq!(result.total_marks, 10);
    }

    #[test]
    fn wrong_choice_scores_zero() {
        let exam = exam(60, vec![mcq(1, 10, "B")]);
        let result = grade(&exam, &sheet(&[(0, Answer::Choice("A".into()))]), &PlaceholderGrader);
        assert_eq!(result.percent, 0);
        assert!(!result.passed);
    }

    #[test]
    fn choice_match_is_exact() {
        let exam = exam(60, vec![mcq(1, 10, "B")]);
        for near_miss in ["b", " B", "B "] {
            let result = grade(
                &exam,
                &sheet(&[(0, Answer::Choice(near_miss.into()))]),
                &PlaceholderGrader,
            );
            assert_eq!(result.gained_marks, 0, "{near_miss:?} should not match");
        }
    }

    #[test]
    fn descriptive_uses_length_threshold() {
        let exam = exam(50, vec![descriptive(1, 20)]);

        let long = "x".repeat(25);
        let result = grade(&exam, &sheet(&[(0, Answer::Text(long))]), &PlaceholderGrader);
        assert_eq!(result.gained_marks, 20);
        assert_eq!(result.percent, 100);

        let short = "x".repeat(10);
        let result = grade(&exam, &sheet(&[(0, Answer::Text(short))]), &PlaceholderGrader);
        assert_eq!(result.gained_marks, 0);
        assert_eq!(result.percent, 0);

        let exactly = "x".repeat(DESCRIPTIVE_MIN_CHARS);
        let result = grade(&exam, &sheet(&[(0, Answer::Text(exactly))]), &PlaceholderGrader);
        assert_eq!(result.gained_marks, 0);
    }

    #[test]
    fn descriptive_counts_characters_not_bytes() {
        let exam = exam(50, vec![descriptive(1, 20)]);
        // 15 characters, 30 bytes.
        let answer = "é".repeat(15);
        let result = grade(&exam, &sheet(&[(0, Answer::Text(answer))]), &PlaceholderGrader);
        assert_eq!(result.gained_marks, 0);
    }

    #[test]
    fn mixed_exam_rounds_down_and_fails() {
        let exam = exam(50, vec![mcq(1, 10, "B"), descriptive(2, 20)]);
        let answers = sheet(&[
            (0, Answer::Choice("B".into())),
            (1, Answer::Text("too short".into())),
        ]);
        let result = grade(&exam, &answers, &PlaceholderGrader);
        assert_eq!(result.gained_marks, 10);
        assert_eq!(result.total_marks, 30);
        assert_eq!(result.percent, 33);
        assert!(!result.passed);
    }

    #[test]
    fn rounds_half_up() {
        // 1 of 8 marks = 12.5%
        let exam = exam(0, vec![mcq(1, 1, "A"), mcq(2, 7, "A")]);
        let result = grade(&exam, &sheet(&[(0, Answer::Choice("A".into()))]), &PlaceholderGrader);
        assert_eq!(result.percent, 13);
    }

    #[test]
    fn empty_exam_grades_to_zero_and_fails() {
        let exam = exam(0, Vec::new());
        let result = grade(&exam, &AnswerSheet::new(), &PlaceholderGrader);
        assert_eq!(result, ExamResult::empty());
        assert!(!result.passed);
    }

    #[test]
    fn unanswered_questions_count_towards_total() {
        let exam = exam(50, vec![mcq(1, 10, "A"), mcq(2, 10, "A")]);
        let result = grade(&exam, &sheet(&[(1, Answer::Choice("A".into()))]), &PlaceholderGrader);
        assert_eq!(result.percent, 50);
        assert!(result.passed);
    }

    #[test]
    fn mismatched_answer_kind_is_graded_by_text() {
        let exam = exam(50, vec![mcq(1, 10, "B")]);
        let result = grade(&exam, &sheet(&[(0, Answer::Text("B".into()))]), &PlaceholderGrader);
        assert_eq!(result.percent, 100);
    }

    #[test]
    fn grader_cannot_exceed_question_marks() {
        struct Generous;
        impl Grader for Generous {
            fn marks_for(&self, _: &Question, _: &Answer) -> u32 {
                1_000
            }
        }
        let exam = exam(50, vec![descriptive(1, 10)]);
        let result = grade(&exam, &sheet(&[(0, Answer::Text("a".into()))]), &Generous);
        assert_eq!(result.percent, 100);
        assert_eq!(result.gained_marks, 10);
    }

    #[test]
    fn percent_stays_within_bounds_for_any_subset() {
        let questions: Vec<_> = (1..=6_u32).map(|i| mcq(u64::from(i), i * 3, "C")).collect();
        let exam = exam(70, questions);
        for mask in 0_u32..64 {
            let answers: AnswerSheet = (0..6)
                .filter(|bit| mask & (1 << bit) != 0)
                .map(|i| (i, Answer::Choice("C".into())))
                .collect();
            let result = grade(&exam, &answers, &PlaceholderGrader);
            assert!(result.percent <= 100);
            assert_eq!(result.passed, result.percent >= 70);
            assert_eq!(grade(&exam, &answers, &PlaceholderGrader), result);
        }
    }
}
