//! Balance mutations with append-only audit entries.
//!
//! Every credit and debit runs inside a database transaction that updates
//! the balance and appends a ledger entry together; neither is ever visible
//! without the other. Notification fan-out happens strictly after commit,
//! so a bus push can never describe a balance that rolled back.

use std::sync::Arc;

use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::common::{AccountId, Points};
use crate::kernel::NotificationBus;

use super::error::LedgerError;
use super::events::PointsUpdate;
use super::models::{Account, EntryReason, LedgerEntry};

/// Entry point for all balance changes. Other domains either call the
/// self-contained [`credit`]/[`debit`] or compose [`credit_in_tx`]/
/// [`debit_in_tx`] into their own transactions.
///
/// [`credit`]: LedgerService::credit
/// [`debit`]: LedgerService::debit
/// [`credit_in_tx`]: LedgerService::credit_in_tx
/// [`debit_in_tx`]: LedgerService::debit_in_tx
pub struct LedgerService {
    pool: PgPool,
    bus: Arc<NotificationBus>,
}

impl LedgerService {
    pub fn new(pool: PgPool, bus: Arc<NotificationBus>) -> Self {
        Self { pool, bus }
    }

    /// Credit an account in its own transaction and push the new balance.
    ///
    /// `amount` must be positive; callers validate before reaching the
    /// ledger.
    pub async fn credit(
        &self,
        account_id: AccountId,
        amount: Points,
        reason: EntryReason,
        title: &str,
        description: Option<&str>,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let entry = self
            .credit_in_tx(&mut tx, account_id, amount, reason, title, description)
            .await?;
        tx.commit().await?;

        self.bus
            .notify(
                account_id,
                &PointsUpdate {
                    points: entry.resulting_balance,
                },
            )
            .await;
        Ok(entry)
    }

    /// Debit an account in its own transaction and push the new balance.
    pub async fn debit(
        &self,
        account_id: AccountId,
        amount: Points,
        reason: EntryReason,
        title: &str,
        description: Option<&str>,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let entry = self
            .debit_in_tx(&mut tx, account_id, amount, reason, title, description)
            .await?;
        tx.commit().await?;

        self.bus
            .notify(
                account_id,
                &PointsUpdate {
                    points: entry.resulting_balance,
                },
            )
            .await;
        Ok(entry)
    }

    /// Credit inside a caller-owned transaction. The caller commits and is
    /// responsible for any post-commit notification.
    pub async fn credit_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: AccountId,
        amount: Points,
        reason: EntryReason,
        title: &str,
        description: Option<&str>,
    ) -> Result<LedgerEntry, LedgerError> {
        debug_assert!(amount.is_positive(), "ledger credits must be positive");

        let balance = Account::apply_credit(account_id, amount, tx)
            .await?
            .ok_or(LedgerError::AccountNotFound)?;
        let entry =
            LedgerEntry::insert(account_id, amount, balance, reason, title, description, tx)
                .await?;

        debug!(
            account_id = %account_id,
            delta = %entry.delta,
            balance = %balance,
            reason = %reason,
            "credited account"
        );
        Ok(entry)
    }

    /// Debit inside a caller-owned transaction. Fails with
    /// [`LedgerError::InsufficientFunds`] without touching the row when the
    /// balance cannot cover the amount.
    pub async fn debit_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: AccountId,
        amount: Points,
        reason: EntryReason,
        title: &str,
        description: Option<&str>,
    ) -> Result<LedgerEntry, LedgerError> {
        debug_assert!(amount.is_positive(), "ledger debits must be positive");

        let Some(balance) = Account::apply_debit(account_id, amount, tx).await? else {
            // The conditional UPDATE matched no row: either the account is
            // missing or the balance is short. Disambiguate for the caller.
            return match Account::balance_in_tx(account_id, tx).await? {
                Some(available) => Err(LedgerError::InsufficientFunds {
                    required: amount,
                    available,
                }),
                None => Err(LedgerError::AccountNotFound),
            };
        };
        let entry =
            LedgerEntry::insert(account_id, -amount, balance, reason, title, description, tx)
                .await?;

        debug!(
            account_id = %account_id,
            delta = %entry.delta,
            balance = %balance,
            reason = %reason,
            "debited account"
        );
        Ok(entry)
    }

    /// Current balance for an account.
    pub async fn get_balance(&self, account_id: AccountId) -> Result<Points, LedgerError> {
        Account::balance(account_id, &self.pool)
            .await?
            .ok_or(LedgerError::AccountNotFound)
    }

    /// Most recent audit entries for an account, newest first.
    pub async fn recent_entries(
        &self,
        account_id: AccountId,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(LedgerEntry::recent_for_account(account_id, limit, &self.pool).await?)
    }
}
