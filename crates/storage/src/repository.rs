use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{AttemptSummary, Exam, ExamId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A persisted attempt together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRow {
    pub id: i64,
    pub attempt: AttemptSummary,
}

impl AttemptRow {
    #[must_use]
    pub fn new(id: i64, attempt: AttemptSummary) -> Self {
        Self { id, attempt }
    }
}

/// One XP grant in a learner's ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpAward {
    pub user_id: UserId,
    pub amount: u32,
    pub reason: String,
    pub awarded_at: DateTime<Utc>,
}

/// Source of exam definitions.
#[async_trait]
pub trait ExamRepository: Send + Sync {
    /// Persist or replace an exam and its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exam cannot be stored.
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError>;

    /// Fetch an exam by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_exam(&self, id: &ExamId) -> Result<Exam, StorageError>;

    /// All exams ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError>;
}

/// Durable record of submitted sessions.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Store a submitted attempt and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session was already recorded.
    async fn append_attempt(&self, attempt: &AttemptSummary) -> Result<i64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no attempt has this id.
    async fn get_attempt(&self, id: i64) -> Result<AttemptSummary, StorageError>;

    /// Attempts by `user_id` at `exam_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn list_attempts(
        &self,
        exam_id: &ExamId,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError>;
}

/// Per-learner experience point totals.
#[async_trait]
pub trait XpLedger: Send + Sync {
    /// Add `amount` XP to `user_id` and return the new total.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the award cannot be recorded.
    async fn award_xp(
        &self,
        user_id: &UserId,
        amount: u32,
        reason: &str,
        awarded_at: DateTime<Utc>,
    ) -> Result<u64, StorageError>;

    /// Current total, zero for unknown learners.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn xp_total(&self, user_id: &UserId) -> Result<u64, StorageError>;

    /// Most recent awards first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_awards(&self, user_id: &UserId, limit: u32) -> Result<Vec<XpAward>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct XpState {
    totals: HashMap<UserId, u64>,
    awards: Vec<XpAward>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    exams: Arc<Mutex<HashMap<ExamId, Exam>>>,
    attempts: Arc<Mutex<Vec<AttemptRow>>>,
    xp: Arc<Mutex<XpState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: ToString>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ExamRepository for InMemoryRepository {
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let mut guard = self.exams.lock().map_err(poisoned)?;
        guard.insert(exam.id().clone(), exam.clone());
        Ok(())
    }

    async fn get_exam(&self, id: &ExamId) -> Result<Exam, StorageError> {
        let guard = self.exams.lock().map_err(poisoned)?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, StorageError> {
        let guard = self.exams.lock().map_err(poisoned)?;
        let mut exams: Vec<Exam> = guard.values().cloned().collect();
        exams.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(exams)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &AttemptSummary) -> Result<i64, StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        if guard
            .iter()
            .any(|row| row.attempt.session_id() == attempt.session_id())
        {
            return Err(StorageError::Conflict);
        }
        let id = i64::try_from(guard.len())
            .map_err(|_| StorageError::Serialization("attempt id overflow".into()))?
            + 1;
        guard.push(AttemptRow::new(id, attempt.clone()));
        Ok(id)
    }

    async fn get_attempt(&self, id: i64) -> Result<AttemptSummary, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.attempt.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_attempts(
        &self,
        exam_id: &ExamId,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        let mut rows: Vec<AttemptRow> = guard
            .iter()
            .filter(|row| row.attempt.exam_id() == exam_id && row.attempt.user_id() == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.attempt
                .submitted_at()
                .cmp(&a.attempt.submitted_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

#[async_trait]
impl XpLedger for InMemoryRepository {
    async fn award_xp(
        &self,
        user_id: &UserId,
        amount: u32,
        reason: &str,
        awarded_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let mut guard = self.xp.lock().map_err(poisoned)?;
        let total = guard.totals.entry(user_id.clone()).or_insert(0);
        *total = total.saturating_add(u64::from(amount));
        let total = *total;
        guard.awards.push(XpAward {
            user_id: user_id.clone(),
            amount,
            reason: reason.to_owned(),
            awarded_at,
        });
        Ok(total)
    }

    async fn xp_total(&self, user_id: &UserId) -> Result<u64, StorageError> {
        let guard = self.xp.lock().map_err(poisoned)?;
        Ok(guard.totals.get(user_id).copied().unwrap_or(0))
    }

    async fn list_awards(&self, user_id: &UserId, limit: u32) -> Result<Vec<XpAward>, StorageError> {
        let guard = self.xp.lock().map_err(poisoned)?;
        Ok(guard
            .awards
            .iter()
            .rev()
            .filter(|a| &a.user_id == user_id)
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub exams: Arc<dyn ExamRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub xp: Arc<dyn XpLedger>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let exams: Arc<dyn ExamRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo.clone());
        let xp: Arc<dyn XpLedger> = Arc::new(repo);
        Self {
            exams,
            attempts,
            xp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use exam_core::model::{ExamResult, Question, QuestionId, SessionId, SubmitTrigger};
    use exam_core::time::fixed_now;

    fn build_exam(id: &str) -> Exam {
        let q = Question::descriptive(QuestionId::new(1), "Explain", 10).unwrap();
        Exam::new(ExamId::new(id), format!("Exam {id}"), 30, 50, vec![q]).unwrap()
    }

    fn build_attempt(exam: &str, user: &str, offset_secs: i64) -> AttemptSummary {
        let started = fixed_now();
        AttemptSummary::new(
            SessionId::generate(),
            ExamId::new(exam),
            UserId::new(user),
            started,
            started + Duration::seconds(offset_secs),
            SubmitTrigger::Manual,
            ExamResult {
                percent: 100,
                passed: true,
                gained_marks: 10,
                total_marks: 10,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn exams_round_trip_and_list_sorted() {
        let repo = InMemoryRepository::new();
        repo.upsert_exam(&build_exam("b")).await.unwrap();
        repo.upsert_exam(&build_exam("a")).await.unwrap();

        let fetched = repo.get_exam(&ExamId::new("a")).await.unwrap();
        assert_eq!(fetched, build_exam("a"));

        let ids: Vec<_> = repo
            .list_exams()
            .await
            .unwrap()
            .iter()
            .map(|e| e.id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn missing_exam_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.get_exam(&ExamId::new("nope")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_session_attempt_conflicts() {
        let repo = InMemoryRepository::new();
        let attempt = build_attempt("e1", "u1", 10);
        let id = repo.append_attempt(&attempt).await.unwrap();
        assert_eq!(repo.get_attempt(id).await.unwrap(), attempt);

        let err = repo.append_attempt(&attempt).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn attempts_listed_newest_first_per_user() {
        let repo = InMemoryRepository::new();
        repo.append_attempt(&build_attempt("e1", "u1", 10)).await.unwrap();
        let newest = repo.append_attempt(&build_attempt("e1", "u1", 99)).await.unwrap();
        repo.append_attempt(&build_attempt("e1", "u2", 50)).await.unwrap();
        repo.append_attempt(&build_attempt("e2", "u1", 50)).await.unwrap();

        let rows = repo
            .list_attempts(&ExamId::new("e1"), &UserId::new("u1"), 10)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, newest);

        let limited = repo
            .list_attempts(&ExamId::new("e1"), &UserId::new("u1"), 1)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn xp_accumulates_per_user() {
        let repo = InMemoryRepository::new();
        let user = UserId::new("u1");
        assert_eq!(repo.xp_total(&user).await.unwrap(), 0);

        assert_eq!(repo.award_xp(&user, 50, "Passed Exam", fixed_now()).await.unwrap(), 50);
        assert_eq!(repo.award_xp(&user, 25, "Bonus", fixed_now()).await.unwrap(), 75);
        assert_eq!(repo.xp_total(&UserId::new("u2")).await.unwrap(), 0);

        let awards = repo.list_awards(&user, 10).await.unwrap();
        assert_eq!(awards.len(), 2);
        assert_eq!(awards[0].reason, "Bonus");
    }
}
