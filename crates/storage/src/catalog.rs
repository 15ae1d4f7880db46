//! JSON exam catalogue: the stored-exam format used by the learner portal.
//!
//! ```json
//! { "exams": [ { "id": "exam_001", "title": "...", "duration": 60, "passScore": 70,
//!                "questions": [ { "id": 1, "type": "mcq", "text": "...", "marks": 5,
//!                                 "options": ["..."], "correctAnswer": "..." } ] } ] }
//! ```
//!
//! Unknown keys (status, prerequisite, other portal data) are ignored.

use std::path::Path;

use exam_core::model::{
    Exam, ExamError, ExamId, Question, QuestionError, QuestionId, QuestionKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("exam {exam}: {source}")]
    InvalidExam {
        exam: String,
        #[source]
        source: ExamError,
    },

    #[error("exam {exam}, question {position}: {source}")]
    InvalidQuestion {
        exam: String,
        position: usize,
        #[source]
        source: QuestionError,
    },

    #[error("exam {exam}, question {position}: unknown question type {kind:?}")]
    UnknownKind {
        exam: String,
        position: usize,
        kind: String,
    },
}

/// Pass threshold for exams stored without one. Only a perfect score passes.
pub const DEFAULT_PASS_SCORE: u32 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub exams: Vec<ExamRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRecord {
    pub id: String,
    pub title: String,
    /// Minutes; 0 or absent means untimed.
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub pass_score: Option<u32>,
    #[serde(default)]
    pub questions: Vec<QuestionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub marks: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

impl ExamRecord {
    #[must_use]
    pub fn from_exam(exam: &Exam) -> Self {
        Self {
            id: exam.id().to_string(),
            title: exam.title().to_owned(),
            duration: exam.duration_minutes(),
            pass_score: Some(u32::from(exam.pass_score_percent())),
            questions: exam.questions().iter().map(QuestionRecord::from_question).collect(),
        }
    }

    /// Converts the record into a validated domain `Exam`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the exam or any question fails validation.
    pub fn into_exam(self) -> Result<Exam, CatalogError> {
        let exam_label = self.id.clone();
        let questions = self
            .questions
            .into_iter()
            .enumerate()
            .map(|(position, q)| q.into_question(&exam_label, position))
            .collect::<Result<Vec<_>, _>>()?;

        Exam::new(
            ExamId::new(self.id),
            self.title,
            self.duration,
            self.pass_score.unwrap_or(DEFAULT_PASS_SCORE),
            questions,
        )
        .map_err(|source| CatalogError::InvalidExam {
            exam: exam_label,
            source,
        })
    }
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: question.id().value(),
            kind: question.kind().as_str().to_owned(),
            text: question.text().to_owned(),
            marks: question.marks(),
            options: question.options().to_vec(),
            correct_answer: question.correct_answer().map(ToOwned::to_owned),
        }
    }

    fn into_question(self, exam: &str, position: usize) -> Result<Question, CatalogError> {
        let kind = match self.kind.as_str() {
            "mcq" => QuestionKind::MultipleChoice {
                options: self.options,
                correct_answer: self.correct_answer.unwrap_or_default(),
            },
            "descriptive" => QuestionKind::Descriptive,
            _ => {
                return Err(CatalogError::UnknownKind {
                    exam: exam.to_owned(),
                    position,
                    kind: self.kind,
                });
            }
        };
        Question::new(QuestionId::new(self.id), self.text, self.marks, kind).map_err(|source| {
            CatalogError::InvalidQuestion {
                exam: exam.to_owned(),
                position,
                source,
            }
        })
    }
}

/// Parses a catalogue, skipping exams that fail validation.
///
/// # Errors
///
/// Returns `CatalogError::Json` if the document itself is malformed.
pub fn parse_catalog(raw: &str) -> Result<Vec<Exam>, CatalogError> {
    let file: CatalogFile = serde_json::from_str(raw)?;
    let mut exams = Vec::with_capacity(file.exams.len());
    for record in file.exams {
        match record.into_exam() {
            Ok(exam) => exams.push(exam),
            Err(e) => tracing::warn!("skipping catalogue entry: {e}"),
        }
    }
    Ok(exams)
}

/// Reads and parses a catalogue file.
///
/// # Errors
///
/// Returns `CatalogError::Io` if the file cannot be read, or `CatalogError::Json`
/// if it is not a catalogue.
pub fn load_catalog(path: &Path) -> Result<Vec<Exam>, CatalogError> {
    let raw = std::fs::read_to_string(path)?;
    parse_catalog(&raw)
}

/// Serialises exams in catalogue form.
///
/// # Errors
///
/// Returns `CatalogError::Json` if serialisation fails.
pub fn to_catalog_json(exams: &[Exam]) -> Result<String, CatalogError> {
    let file = CatalogFile {
        exams: exams.iter().map(ExamRecord::from_exam).collect(),
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

const DEMO_CATALOG: &str = r#"{
  "exams": [
    {
      "id": "exam_demo",
      "title": "React.js Certification Exam",
      "duration": 45,
      "passScore": 60,
      "questions": [
        { "id": 1, "type": "mcq", "text": "Which hook handles side effects?",
          "options": ["useState", "useEffect", "useReducer"], "correctAnswer": "useEffect", "marks": 10 },
        { "id": 2, "type": "mcq", "text": "What is the Virtual DOM?",
          "options": ["Real DOM copy", "Lightweight JS object", "Browser API"],
          "correctAnswer": "Lightweight JS object", "marks": 10 },
        { "id": 3, "type": "descriptive", "text": "Explain the concept of \"Lifting State Up\".", "marks": 20 }
      ]
    },
    {
      "id": "exam_001",
      "title": "React.js Professional Certification",
      "duration": 60,
      "passScore": 70,
      "questions": [
        { "id": 1, "type": "mcq", "text": "What is JSX?",
          "options": ["JavaScript XML", "Java Syntax", "JSON X"], "correctAnswer": "JavaScript XML", "marks": 5 }
      ]
    }
  ]
}"#;

/// Built-in exams used by `seed`.
///
/// # Errors
///
/// Returns `CatalogError` only if the embedded catalogue is malformed.
pub fn demo_exams() -> Result<Vec<Exam>, CatalogError> {
    parse_catalog(DEMO_CATALOG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_catalog_parses() {
        let exams = demo_exams().unwrap();
        assert_eq!(exams.len(), 2);
        let demo = &exams[0];
        assert_eq!(demo.id().as_str(), "exam_demo");
        assert_eq!(demo.duration_minutes(), 45);
        assert_eq!(demo.pass_score_percent(), 60);
        assert_eq!(demo.total_marks(), 40);
        assert_eq!(demo.questions()[1].correct_answer(), Some("Lightweight JS object"));
    }

    #[test]
    fn invalid_exams_are_skipped() {
        let raw = r#"{
          "exams": [
            { "id": "ok", "title": "Fine", "duration": 10, "passScore": 50, "questions": [] },
            { "id": "bad-pass", "title": "Bad", "passScore": 150 },
            { "id": "bad-marks", "title": "Bad", "questions": [
                { "id": 1, "type": "descriptive", "text": "Explain", "marks": 0 } ] },
            { "id": "bad-kind", "title": "Bad", "questions": [
                { "id": 1, "type": "essay", "text": "Explain", "marks": 5 } ] }
          ],
          "courses": [ { "ignored": true } ]
        }"#;
        let exams = parse_catalog(raw).unwrap();
        assert_eq!(exams.len(), 1);
        assert_eq!(exams[0].id().as_str(), "ok");
    }

    #[test]
    fn missing_pass_score_defaults_to_perfect() {
        let raw = r#"{ "exams": [ { "id": "x", "title": "Locked", "duration": 90,
                      "status": "locked", "questions": [] } ] }"#;
        let exams = parse_catalog(raw).unwrap();
        assert_eq!(exams[0].pass_score_percent(), 100);
    }

    #[test]
    fn exam_without_pass_score_passes_only_when_perfect() {
        use exam_core::model::{Answer, AnswerSheet};
        use exam_core::{PlaceholderGrader, grade};

        let raw = r#"{ "exams": [ { "id": "x", "title": "Quiz", "questions": [
            { "id": 1, "type": "mcq", "text": "Q1", "marks": 5,
              "options": ["a", "b"], "correctAnswer": "a" },
            { "id": 2, "type": "mcq", "text": "Q2", "marks": 5,
              "options": ["a", "b"], "correctAnswer": "b" } ] } ] }"#;
        let exam = parse_catalog(raw).unwrap().remove(0);
        let mut answers = AnswerSheet::new();
        answers.set(0, Answer::for_question(&exam.questions()[0], "a"));

        let half = grade(&exam, &answers, &PlaceholderGrader);
        assert_eq!(half.percent, 50);
        assert!(!half.passed);

        answers.set(1, Answer::for_question(&exam.questions()[1], "b"));
        let full = grade(&exam, &answers, &PlaceholderGrader);
        assert_eq!(full.percent, 100);
        assert!(full.passed);
    }

    #[test]
    fn unknown_kind_is_reported() {
        let record = ExamRecord {
            id: "x".into(),
            title: "X".into(),
            duration: 0,
            pass_score: Some(50),
            questions: vec![QuestionRecord {
                id: 1,
                kind: "code".into(),
                text: "Write it".into(),
                marks: 5,
                options: Vec::new(),
                correct_answer: None,
            }],
        };
        let err = record.into_exam().unwrap_err();
        assert!(matches!(err, CatalogError::UnknownKind { position: 0, .. }));
    }

    #[test]
    fn catalog_json_is_reloadable() {
        let exams = demo_exams().unwrap();
        let json = to_catalog_json(&exams).unwrap();
        assert_eq!(parse_catalog(&json).unwrap(), exams);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(matches!(parse_catalog("not json"), Err(CatalogError::Json(_))));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, DEMO_CATALOG).unwrap();
        assert_eq!(load_catalog(&path).unwrap().len(), 2);

        let missing = dir.path().join("missing.json");
        assert!(matches!(load_catalog(&missing), Err(CatalogError::Io(_))));
    }
}
