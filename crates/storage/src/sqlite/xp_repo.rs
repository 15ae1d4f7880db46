use chrono::{DateTime, Utc};
use exam_core::model::UserId;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db, ser, u32_from_i64};
use crate::repository::{StorageError, XpAward, XpLedger};

fn total_from_i64(v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid xp total: {v}")))
}

#[async_trait::async_trait]
impl XpLedger for SqliteRepository {
    async fn award_xp(
        &self,
        user_id: &UserId,
        amount: u32,
        reason: &str,
        awarded_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        sqlx::query(
            r"
            INSERT INTO user_xp (user_id, xp, last_award_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                xp = xp + excluded.xp,
                last_award_at = excluded.last_award_at
            ",
        )
        .bind(user_id.as_str())
        .bind(i64::from(amount))
        .bind(awarded_at)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        sqlx::query(
            r"
            INSERT INTO xp_awards (user_id, amount, reason, awarded_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(user_id.as_str())
        .bind(i64::from(amount))
        .bind(reason)
        .bind(awarded_at)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        let total: i64 = sqlx::query_scalar("SELECT xp FROM user_xp WHERE user_id = ?1")
            .bind(user_id.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(db)?;

        tx.commit().await.map_err(db)?;
        total_from_i64(total)
    }

    async fn xp_total(&self, user_id: &UserId) -> Result<u64, StorageError> {
        let total: Option<i64> = sqlx::query_scalar("SELECT xp FROM user_xp WHERE user_id = ?1")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        total.map_or(Ok(0), total_from_i64)
    }

    async fn list_awards(&self, user_id: &UserId, limit: u32) -> Result<Vec<XpAward>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT user_id, amount, reason, awarded_at
                FROM xp_awards
                WHERE user_id = ?1
                ORDER BY awarded_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(user_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter()
            .map(|row| {
                Ok(XpAward {
                    user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
                    amount: u32_from_i64("amount", row.try_get::<i64, _>("amount").map_err(ser)?)?,
                    reason: row.try_get("reason").map_err(ser)?,
                    awarded_at: row.try_get("awarded_at").map_err(ser)?,
                })
            })
            .collect()
    }
}
