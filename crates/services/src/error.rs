//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::ExamId;
use storage::catalog::CatalogError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ExamSessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionServiceError {
    #[error("exam not found: {0}")]
    ExamNotFound(ExamId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by reward sinks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RewardError {
    #[error("reward sink unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
