use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use crate::common::{AccountId, ItemId, Points, TransactionId};

/// ItemTransaction - one redemption attempt and its fulfillment state
///
/// `points` snapshots the item's price at redemption time; later price edits
/// never change what a pending transaction refunds.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ItemTransaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub item_id: ItemId,
    pub points: Points,
    pub status: String, // 'pending', 'fulfilled', 'rejected'
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Enums for type-safe edges
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Fulfilled,
    Rejected,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Fulfilled => "fulfilled",
            TransactionStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "fulfilled" => Ok(TransactionStatus::Fulfilled),
            "rejected" => Ok(TransactionStatus::Rejected),
            _ => Err(anyhow::anyhow!("Invalid transaction status: {}", s)),
        }
    }
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl ItemTransaction {
    /// Record a pending redemption in the same transaction as its debit
    pub(crate) async fn insert_pending(
        account_id: AccountId,
        item_id: ItemId,
        points: Points,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ItemTransaction>(
            "INSERT INTO transactions (id, account_id, item_id, points)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(TransactionId::new())
        .bind(account_id)
        .bind(item_id)
        .bind(points)
        .fetch_one(&mut **tx)
        .await
    }

    /// Find transaction by ID
    pub async fn find_by_id(
        id: TransactionId,
        pool: &PgPool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ItemTransaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lock the transaction row for resolution, so two moderators cannot
    /// fulfill and reject the same redemption
    pub(crate) async fn lock_for_resolve(
        id: TransactionId,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ItemTransaction>("SELECT * FROM transactions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Move a locked transaction to a terminal status
    pub(crate) async fn set_status(
        id: TransactionId,
        status: TransactionStatus,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ItemTransaction>(
            "UPDATE transactions SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_one(&mut **tx)
        .await
    }

    /// Redemptions counting against an item's stock (rejected ones hand
    /// their unit back)
    pub(crate) async fn count_consuming_stock(
        item_id: ItemId,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM transactions
             WHERE item_id = $1 AND status != 'rejected'",
        )
        .bind(item_id)
        .fetch_one(&mut **tx)
        .await
    }

    /// Whether the account redeemed this item within the last
    /// `cooldown_hours` hours (inclusive boundary)
    pub(crate) async fn in_cooldown_window(
        account_id: AccountId,
        item_id: ItemId,
        cooldown_hours: i32,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                 SELECT 1 FROM transactions
                 WHERE account_id = $1 AND item_id = $2
                   AND created_at >= NOW() - make_interval(hours => $3)
             )",
        )
        .bind(account_id)
        .bind(item_id)
        .bind(cooldown_hours)
        .fetch_one(&mut **tx)
        .await
    }

    /// All redemptions by an account, newest first
    pub async fn list_for_account(
        account_id: AccountId,
        pool: &PgPool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ItemTransaction>(
            "SELECT * FROM transactions
             WHERE account_id = $1
             ORDER BY created_at DESC",
        )
        .bind(account_id)
        .fetch_all(pool)
        .await
    }

    /// Redemptions awaiting moderator resolution, oldest first
    pub async fn list_pending(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ItemTransaction>(
            "SELECT * FROM transactions
             WHERE status = 'pending'
             ORDER BY created_at ASC",
        )
        .fetch_all(pool)
        .await
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending.as_str()
    }
}
