use std::path::Path;
use std::sync::Arc;

use exam_core::model::{Exam, UserId};
use storage::catalog;
use storage::repository::{ExamRepository, Storage, XpLedger};

use crate::Clock;
use crate::config::SessionConfig;
use crate::error::AppServicesError;
use crate::sessions::ExamSessionService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    exams: Arc<dyn ExamRepository>,
    xp: Arc<dyn XpLedger>,
    sessions: Arc<ExamSessionService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: SessionConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url, clock).await?;
        Ok(Self::from_storage(&storage, clock, config))
    }

    #[must_use]
    pub fn in_memory(clock: Clock, config: SessionConfig) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, config)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, config: SessionConfig) -> Self {
        let sessions =
            Arc::new(ExamSessionService::from_storage(clock, storage).with_config(config));
        Self {
            exams: Arc::clone(&storage.exams),
            xp: Arc::clone(&storage.xp),
            sessions,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<ExamSessionService> {
        Arc::clone(&self.sessions)
    }

    /// Stores the built-in demo exams, replacing any with the same id.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the catalogue or storage fails.
    pub async fn seed_demo(&self) -> Result<usize, AppServicesError> {
        let exams = catalog::demo_exams()?;
        self.store_exams(&exams).await
    }

    /// Imports every valid exam from a JSON catalogue file.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Catalog` if the file cannot be read or
    /// parsed, or `AppServicesError::Storage` if storing fails.
    pub async fn import_catalog(&self, path: &Path) -> Result<usize, AppServicesError> {
        let exams = catalog::load_catalog(path)?;
        self.store_exams(&exams).await
    }

    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` on read failures.
    pub async fn xp_total(&self, user_id: &UserId) -> Result<u64, AppServicesError> {
        Ok(self.xp.xp_total(user_id).await?)
    }

    async fn store_exams(&self, exams: &[Exam]) -> Result<usize, AppServicesError> {
        for exam in exams {
            self.exams.upsert_exam(exam).await?;
        }
        tracing::info!(count = exams.len(), "exams stored");
        Ok(exams.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::ExamId;
    use exam_core::time::fixed_clock;

    #[tokio::test]
    async fn seed_makes_demo_exam_available() {
        let app = AppServices::in_memory(fixed_clock(), SessionConfig::default());
        assert_eq!(app.seed_demo().await.unwrap(), 2);

        let exam = app
            .sessions()
            .load_exam(&ExamId::new("exam_demo"))
            .await
            .unwrap();
        assert_eq!(exam.question_count(), 3);
        assert_eq!(app.sessions().list_exams().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn import_reports_missing_file() {
        let app = AppServices::in_memory(fixed_clock(), SessionConfig::default());
        let err = app
            .import_catalog(Path::new("/nonexistent/catalog.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppServicesError::Catalog(_)));
    }
}
