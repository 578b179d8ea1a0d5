use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use crate::common::{AccountId, Points};

/// Account - a viewer identity with a points balance
///
/// The balance column carries a `CHECK (balance >= 0)` constraint; every
/// mutation below is written so the check can never fire (conditional
/// UPDATEs report "no row" instead of violating it).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: AccountId,
    pub login: String,
    pub display_name: String,
    pub balance: Points,

    // Chat metadata mirrored from the platform
    pub badges: Option<serde_json::Value>,
    pub vip: bool,
    pub turbo: bool,
    pub color: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Account {
    /// Create an account with a zero balance
    pub async fn create(
        login: &str,
        display_name: &str,
        pool: &PgPool,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (id, login, display_name)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(AccountId::new())
        .bind(login)
        .bind(display_name)
        .fetch_one(pool)
        .await
    }

    /// Find account by ID
    pub async fn find_by_id(id: AccountId, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find account by platform login
    pub async fn find_by_login(login: &str, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE login = $1")
            .bind(login)
            .fetch_optional(pool)
            .await
    }

    /// Current balance, if the account exists
    pub async fn balance(id: AccountId, pool: &PgPool) -> Result<Option<Points>, sqlx::Error> {
        sqlx::query_scalar::<_, Points>("SELECT balance FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Current balance read inside an open transaction
    pub(crate) async fn balance_in_tx(
        id: AccountId,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Points>, sqlx::Error> {
        sqlx::query_scalar::<_, Points>("SELECT balance FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Lock the account row for the rest of the transaction.
    ///
    /// Used to serialize multi-step checks (ticket caps) against the same
    /// account's balance mutations.
    pub(crate) async fn lock_for_update(
        id: AccountId,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Add to the balance, returning the new balance.
    ///
    /// Returns `None` when the account does not exist (or the amount is not
    /// positive; the `$2 > 0` guard keeps a bad caller from sneaking a debit
    /// through the credit path).
    pub(crate) async fn apply_credit(
        id: AccountId,
        amount: Points,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Points>, sqlx::Error> {
        sqlx::query_scalar::<_, Points>(
            "UPDATE accounts
             SET balance = balance + $2, updated_at = NOW()
             WHERE id = $1 AND $2 > 0
             RETURNING balance",
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Subtract from the balance, returning the new balance.
    ///
    /// The balance check and the subtraction are one statement, so two
    /// concurrent debits can never both pass the check: the row lock taken
    /// by the first UPDATE holds until its transaction ends, and the second
    /// re-evaluates `balance >= $2` against the committed value.
    ///
    /// Returns `None` when the account is missing OR the balance is short;
    /// callers disambiguate with [`Account::balance_in_tx`].
    pub(crate) async fn apply_debit(
        id: AccountId,
        amount: Points,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Points>, sqlx::Error> {
        sqlx::query_scalar::<_, Points>(
            "UPDATE accounts
             SET balance = balance - $2, updated_at = NOW()
             WHERE id = $1 AND $2 > 0 AND balance >= $2
             RETURNING balance",
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Overwrite the chat metadata for a login
    pub async fn update_badges(
        login: &str,
        badges: &serde_json::Value,
        vip: bool,
        turbo: bool,
        color: Option<&str>,
        pool: &PgPool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            "UPDATE accounts
             SET badges = $2, vip = $3, turbo = $4, color = $5, updated_at = NOW()
             WHERE login = $1
             RETURNING *",
        )
        .bind(login)
        .bind(badges)
        .bind(vip)
        .bind(turbo)
        .bind(color)
        .fetch_optional(pool)
        .await
    }
}
