use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use crate::common::{AccountId, EntryId, Points};

/// LedgerEntry - one append-only audit record per balance mutation
///
/// `delta` is signed (negative for debits); `resulting_balance` is the
/// balance immediately after the mutation, captured in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub account_id: AccountId,
    pub delta: Points,
    pub resulting_balance: Points,
    pub reason: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Enums for type-safe edges
// =============================================================================

/// Machine-readable reason recorded on every entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EntryReason {
    ChatActivity,
    JoinBonus,
    PresenceTick,
    RafflePurchase,
    Redemption,
    Refund,
}

impl std::fmt::Display for EntryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryReason::ChatActivity => write!(f, "chat-activity"),
            EntryReason::JoinBonus => write!(f, "join-bonus"),
            EntryReason::PresenceTick => write!(f, "presence-tick"),
            EntryReason::RafflePurchase => write!(f, "raffle-purchase"),
            EntryReason::Redemption => write!(f, "redemption"),
            EntryReason::Refund => write!(f, "refund"),
        }
    }
}

impl std::str::FromStr for EntryReason {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "chat-activity" => Ok(EntryReason::ChatActivity),
            "join-bonus" => Ok(EntryReason::JoinBonus),
            "presence-tick" => Ok(EntryReason::PresenceTick),
            "raffle-purchase" => Ok(EntryReason::RafflePurchase),
            "redemption" => Ok(EntryReason::Redemption),
            "refund" => Ok(EntryReason::Refund),
            _ => Err(anyhow::anyhow!("Invalid entry reason: {}", s)),
        }
    }
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl LedgerEntry {
    /// Append an entry in the same transaction as its balance mutation
    pub(crate) async fn insert(
        account_id: AccountId,
        delta: Points,
        resulting_balance: Points,
        reason: EntryReason,
        title: &str,
        description: Option<&str>,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, LedgerEntry>(
            "INSERT INTO ledger_entries
                 (id, account_id, delta, resulting_balance, reason, title, description)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(EntryId::new())
        .bind(account_id)
        .bind(delta)
        .bind(resulting_balance)
        .bind(reason.to_string())
        .bind(title)
        .bind(description)
        .fetch_one(&mut **tx)
        .await
    }

    /// Most recent entries for an account, newest first
    pub async fn recent_for_account(
        account_id: AccountId,
        limit: i64,
        pool: &PgPool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, LedgerEntry>(
            "SELECT * FROM ledger_entries
             WHERE account_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2",
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Every entry for an account, oldest first (audit replay order)
    pub async fn all_for_account(
        account_id: AccountId,
        pool: &PgPool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, LedgerEntry>(
            "SELECT * FROM ledger_entries
             WHERE account_id = $1
             ORDER BY created_at ASC, id ASC",
        )
        .bind(account_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_entry_reason_round_trip() {
        for reason in [
            EntryReason::ChatActivity,
            EntryReason::JoinBonus,
            EntryReason::PresenceTick,
            EntryReason::RafflePurchase,
            EntryReason::Redemption,
            EntryReason::Refund,
        ] {
            let parsed = EntryReason::from_str(&reason.to_string()).unwrap();
            assert_eq!(parsed, reason);
        }
    }

    #[test]
    fn test_entry_reason_rejects_unknown() {
        assert!(EntryReason::from_str("bribe").is_err());
    }
}
