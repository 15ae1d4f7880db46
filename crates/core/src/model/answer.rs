use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::question::Question;

/// A learner's response to one question.
///
/// The variant records how the answer was entered. It is not checked
/// against the question kind: a `Text` stored under a multiple-choice
/// question is kept and graded by its text like any other answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    /// The chosen option of a multiple-choice question.
    Choice(String),
    /// Free text for a descriptive question.
    Text(String),
}

impl Answer {
    /// Tags `value` according to the kind of `question`.
    #[must_use]
    pub fn for_question(question: &Question, value: impl Into<String>) -> Self {
        if question.is_multiple_choice() {
            Self::Choice(value.into())
        } else {
            Self::Text(value.into())
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Answer::Choice(s) | Answer::Text(s) => s,
        }
    }

    /// Whether this answer counts as "answered" on the question map.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text().is_empty()
    }
}

/// Answers keyed by question position within the exam.
///
/// Unset positions read as unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    answers: BTreeMap<usize, Answer>,
}

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `answer` at `index`, replacing any earlier value.
    pub fn set(&mut self, index: usize, answer: Answer) -> Option<Answer> {
        self.answers.insert(index, answer)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Answer> {
        self.answers.get(&index)
    }

    /// An index is answered when it holds a non-empty value.
    #[must_use]
    pub fn is_answered(&self, index: usize) -> bool {
        self.get(index).is_some_and(|a| !a.is_blank())
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| !a.is_blank()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Answer)> {
        self.answers.iter().map(|(i, a)| (*i, a))
    }
}

impl FromIterator<(usize, Answer)> for AnswerSheet {
    fn from_iter<T: IntoIterator<Item = (usize, Answer)>>(iter: T) -> Self {
        Self {
            answers: iter.into_iter().collect(),
        }
    }
}
