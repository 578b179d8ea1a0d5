use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::{AccountId, RaffleId, TicketId};

/// Ticket - one raffle entry
///
/// The hash is shown to viewers as proof of entry; it is minted from the
/// account, the raffle and a random nonce, so two tickets bought in the same
/// purchase still differ.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ticket {
    pub id: TicketId,
    pub hash: String,
    pub account_id: AccountId,
    pub raffle_id: RaffleId,
    pub created_at: DateTime<Utc>,
}

/// Per-account ticket counts for one raffle, used by the draw and the odds
/// display
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TicketTally {
    pub account_id: AccountId,
    pub display_name: String,
    pub ticket_count: i64,
}

/// Public listing row (no account IDs, just display names)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TicketRow {
    pub hash: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Ticket {
    /// Mint a ticket hash: SHA-256 over account, raffle and a fresh nonce
    pub fn mint_hash(account_id: AccountId, raffle_id: RaffleId) -> String {
        let nonce = Uuid::new_v4();
        let mut hasher = Sha256::new();
        hasher.update(format!("{account_id}-{raffle_id}-{nonce}"));
        hex::encode(hasher.finalize())
    }

    /// Insert a batch of tickets for one purchase, returning them in order
    pub(crate) async fn insert_batch(
        raffle_id: RaffleId,
        account_id: AccountId,
        hashes: &[String],
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let ids: Vec<TicketId> = hashes.iter().map(|_| TicketId::new()).collect();
        sqlx::query_as::<_, Ticket>(
            "INSERT INTO tickets (id, hash, account_id, raffle_id)
             SELECT batch.id, batch.hash, $3, $4
             FROM UNNEST($1::uuid[], $2::text[]) AS batch(id, hash)
             RETURNING *",
        )
        .bind(&ids)
        .bind(hashes)
        .bind(account_id)
        .bind(raffle_id)
        .fetch_all(&mut **tx)
        .await
    }

    /// Total tickets sold for a raffle
    pub async fn count_for_raffle(raffle_id: RaffleId, pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tickets WHERE raffle_id = $1")
            .bind(raffle_id)
            .fetch_one(pool)
            .await
    }

    /// Distinct accounts holding tickets for a raffle
    pub async fn participant_count(
        raffle_id: RaffleId,
        pool: &PgPool,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT account_id) FROM tickets WHERE raffle_id = $1",
        )
        .bind(raffle_id)
        .fetch_one(pool)
        .await
    }

    /// Tickets one account already holds for a raffle, read inside the
    /// purchase transaction (the account row lock makes this stable against
    /// concurrent purchases by the same account)
    pub(crate) async fn count_for_participant(
        raffle_id: RaffleId,
        account_id: AccountId,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tickets WHERE raffle_id = $1 AND account_id = $2",
        )
        .bind(raffle_id)
        .bind(account_id)
        .fetch_one(&mut **tx)
        .await
    }

    /// Ticket counts grouped by account, ordered by account ID so the draw
    /// transcript is stable
    pub async fn tally_by_account(
        raffle_id: RaffleId,
        pool: &PgPool,
    ) -> Result<Vec<TicketTally>, sqlx::Error> {
        sqlx::query_as::<_, TicketTally>(TALLY_SQL)
            .bind(raffle_id)
            .fetch_all(pool)
            .await
    }

    /// Same tally read inside the draw transaction
    pub(crate) async fn tally_by_account_in_tx(
        raffle_id: RaffleId,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<TicketTally>, sqlx::Error> {
        sqlx::query_as::<_, TicketTally>(TALLY_SQL)
            .bind(raffle_id)
            .fetch_all(&mut **tx)
            .await
    }

    /// All tickets held by an account across raffles, newest first
    pub async fn find_for_account(
        account_id: AccountId,
        pool: &PgPool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE account_id = $1 ORDER BY created_at DESC",
        )
        .bind(account_id)
        .fetch_all(pool)
        .await
    }

    /// One page of a raffle's tickets, newest first
    pub async fn page_for_raffle(
        raffle_id: RaffleId,
        limit: i64,
        offset: i64,
        pool: &PgPool,
    ) -> Result<Vec<TicketRow>, sqlx::Error> {
        sqlx::query_as::<_, TicketRow>(
            "SELECT t.hash, a.display_name, t.created_at
             FROM tickets t
             JOIN accounts a ON a.id = t.account_id
             WHERE t.raffle_id = $1
             ORDER BY t.created_at DESC, t.id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(raffle_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}

const TALLY_SQL: &str = "SELECT t.account_id, a.display_name, COUNT(*) AS ticket_count
     FROM tickets t
     JOIN accounts a ON a.id = t.account_id
     WHERE t.raffle_id = $1
     GROUP BY t.account_id, a.display_name
     ORDER BY t.account_id ASC";
