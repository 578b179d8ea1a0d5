use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use crate::common::{AccountId, Points, RaffleId};

/// Raffle - a timed drawing viewers enter by buying tickets
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Raffle {
    pub id: RaffleId,
    pub title: String,
    pub description: Option<String>,

    /// Cost of one ticket; zero makes the raffle free to enter.
    pub ticket_price: Points,

    /// Purchase window (inclusive on both ends).
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    /// Per-account ticket cap; NULL means unlimited.
    pub max_tickets_per_account: Option<i32>,

    pub winner_count: i32,
    pub status: String, // 'active', 'completed'

    /// Hex-encoded RNG seed recorded by the draw, for audit replay.
    pub draw_seed: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a raffle
#[derive(Debug, Clone, Deserialize)]
pub struct NewRaffle {
    pub title: String,
    pub description: Option<String>,
    pub ticket_price: Points,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_tickets_per_account: Option<i32>,
    pub winner_count: i32,
}

/// Raffle listing row with ticket counts folded in
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RaffleSummary {
    pub id: RaffleId,
    pub title: String,
    pub description: Option<String>,
    pub ticket_price: Points,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub winner_count: i32,
    pub status: String,
    pub total_tickets: i64,
    pub participants: i64,
}

/// A recorded winner with their draw position (1-based)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RaffleWinner {
    pub account_id: AccountId,
    pub display_name: String,
    pub position: i32,
}

// =============================================================================
// Enums for type-safe edges
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RaffleStatus {
    Active,
    Completed,
}

impl RaffleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RaffleStatus::Active => "active",
            RaffleStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for RaffleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RaffleStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "active" => Ok(RaffleStatus::Active),
            "completed" => Ok(RaffleStatus::Completed),
            _ => Err(anyhow::anyhow!("Invalid raffle status: {}", s)),
        }
    }
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Raffle {
    /// Create a raffle (status defaults to 'active')
    pub async fn create(input: &NewRaffle, pool: &PgPool) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Raffle>(
            "INSERT INTO raffles
                 (id, title, description, ticket_price, start_time, end_time,
                  max_tickets_per_account, winner_count)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(RaffleId::new())
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.ticket_price)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(input.max_tickets_per_account)
        .bind(input.winner_count)
        .fetch_one(pool)
        .await
    }

    /// Find raffle by ID
    pub async fn find_by_id(id: RaffleId, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Raffle>("SELECT * FROM raffles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Read the raffle under a shared lock.
    ///
    /// Purchases take this lock: it excludes the draw's exclusive lock but
    /// lets concurrent purchases proceed against each other.
    pub(crate) async fn lock_shared(
        id: RaffleId,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Raffle>("SELECT * FROM raffles WHERE id = $1 FOR SHARE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Read the raffle under an exclusive lock.
    ///
    /// The draw takes this lock, so it observes a frozen ticket set: no
    /// purchase transaction can be mid-flight while the winners are chosen.
    pub(crate) async fn lock_exclusive(
        id: RaffleId,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Raffle>("SELECT * FROM raffles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// All raffles with ticket totals, newest window first
    pub async fn list_summaries(pool: &PgPool) -> Result<Vec<RaffleSummary>, sqlx::Error> {
        sqlx::query_as::<_, RaffleSummary>(
            "SELECT r.id, r.title, r.description, r.ticket_price, r.start_time, r.end_time,
                    r.winner_count, r.status,
                    COUNT(t.id) AS total_tickets,
                    COUNT(DISTINCT t.account_id) AS participants
             FROM raffles r
             LEFT JOIN tickets t ON t.raffle_id = r.id
             GROUP BY r.id
             ORDER BY r.start_time DESC",
        )
        .fetch_all(pool)
        .await
    }

    /// Mark the raffle completed and record the winners and seed.
    ///
    /// Positions follow the order of `winners` (first drawn = position 1).
    pub(crate) async fn complete(
        id: RaffleId,
        winners: &[AccountId],
        seed_hex: &str,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE raffles SET status = $2, draw_seed = $3 WHERE id = $1")
            .bind(id)
            .bind(RaffleStatus::Completed.as_str())
            .bind(seed_hex)
            .execute(&mut **tx)
            .await?;

        for (index, account_id) in winners.iter().enumerate() {
            sqlx::query(
                "INSERT INTO raffle_winners (raffle_id, account_id, position)
                 VALUES ($1, $2, $3)",
            )
            .bind(id)
            .bind(account_id)
            .bind(index as i32 + 1)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Recorded winners in draw order
    pub async fn winners(id: RaffleId, pool: &PgPool) -> Result<Vec<RaffleWinner>, sqlx::Error> {
        sqlx::query_as::<_, RaffleWinner>(
            "SELECT w.account_id, a.display_name, w.position
             FROM raffle_winners w
             JOIN accounts a ON a.id = w.account_id
             WHERE w.raffle_id = $1
             ORDER BY w.position ASC",
        )
        .bind(id)
        .fetch_all(pool)
        .await
    }

    pub fn is_active(&self) -> bool {
        self.status == RaffleStatus::Active.as_str()
    }

    /// Whether `at` falls inside the purchase window (inclusive)
    pub fn window_contains(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && at <= self.end_time
    }
}
