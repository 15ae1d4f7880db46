use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{ExamId, SessionId, UserId};
use storage::repository::XpLedger;

use crate::Clock;
use crate::error::RewardError;

/// Published once when a submitted session meets the pass threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamPassed {
    pub session_id: SessionId,
    pub exam_id: ExamId,
    pub user_id: UserId,
    pub percent: u8,
    pub passed_at: DateTime<Utc>,
}

/// Receives pass notifications. Failures are reported to the caller but
/// never change a stored result.
#[async_trait]
pub trait RewardSink: Send + Sync {
    /// Grant `points` to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RewardError` if the grant could not be recorded.
    async fn notify_passed(
        &self,
        user_id: &UserId,
        points: u32,
        reason: &str,
    ) -> Result<(), RewardError>;
}

/// Grants XP through the storage ledger.
#[derive(Clone)]
pub struct LedgerRewardSink {
    clock: Clock,
    ledger: Arc<dyn XpLedger>,
}

impl LedgerRewardSink {
    #[must_use]
    pub fn new(clock: Clock, ledger: Arc<dyn XpLedger>) -> Self {
        Self { clock, ledger }
    }
}

#[async_trait]
impl RewardSink for LedgerRewardSink {
    async fn notify_passed(
        &self,
        user_id: &UserId,
        points: u32,
        reason: &str,
    ) -> Result<(), RewardError> {
        let total = self
            .ledger
            .award_xp(user_id, points, reason, self.clock.now())
            .await?;
        tracing::info!(user = %user_id, points, total, reason, "xp awarded");
        Ok(())
    }
}
