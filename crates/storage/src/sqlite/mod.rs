//! `SQLite` backend for exams, attempts and the XP ledger.
//!
//! One pool serves every repository trait. Writes are short: an exam upsert,
//! one attempt row per submitted session and one XP award per pass.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use exam_core::Clock;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use thiserror::Error;

use crate::repository::{AttemptRepository, ExamRepository, Storage, XpLedger};

mod attempt_repo;
mod exam_repo;
mod mapping;
mod migrate;
mod xp_repo;

/// A session's effects task and the CLI are the only concurrent writers.
const MAX_CONNECTIONS: u32 = 4;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
    clock: Clock,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Opens a pool on `database_url` with foreign keys enforced and the
    /// journal in WAL mode, so history reads never block an attempt insert.
    ///
    /// Exam timestamps come from the system clock; see
    /// [`SqliteRepository::with_clock`].
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is malformed or the database
    /// cannot be opened.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;
        tracing::debug!(url = database_url, "exam database opened");
        Ok(Self {
            pool,
            clock: Clock::default(),
        })
    }

    /// Stamps stored exams with `clock` instead of the system time.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to the latest version.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration step fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Opens and migrates the exam database at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or migrated.
    pub async fn sqlite(database_url: &str, clock: Clock) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url)
            .await?
            .with_clock(clock);
        repo.migrate().await?;
        Ok(Self {
            exams: Arc::new(repo.clone()) as Arc<dyn ExamRepository>,
            attempts: Arc::new(repo.clone()) as Arc<dyn AttemptRepository>,
            xp: Arc::new(repo) as Arc<dyn XpLedger>,
        })
    }
}
