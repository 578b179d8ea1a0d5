//! Catalog management and point redemptions.
//!
//! A redemption debits the price and records a pending transaction in one
//! database transaction, under the item's row lock so stock and cooldown
//! checks cannot interleave. Moderators later fulfill or reject; rejection
//! refunds the captured price and returns the stock unit.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::common::{AccountId, ItemId, TransactionId};
use crate::domains::ledger::models::Account;
use crate::domains::ledger::{EntryReason, LedgerService, PointsUpdate};
use crate::kernel::NotificationBus;

use super::error::RedemptionError;
use super::events::{CatalogUpdated, TransactionUpdated};
use super::models::{Item, ItemChanges, ItemTransaction, NewItem, TransactionStatus};

/// Moderator verdict on a pending redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Fulfill,
    Reject,
}

pub struct RedemptionService {
    pool: PgPool,
    ledger: Arc<LedgerService>,
    bus: Arc<NotificationBus>,
}

impl RedemptionService {
    pub fn new(pool: PgPool, ledger: Arc<LedgerService>, bus: Arc<NotificationBus>) -> Self {
        Self { pool, ledger, bus }
    }

    /// Redeem an item: debit its price and record a pending transaction.
    ///
    /// Checks run in a fixed order under the item lock: visibility, then
    /// cooldown, then stock, then funds. The first failure rolls the whole
    /// attempt back.
    pub async fn redeem(
        &self,
        account_id: AccountId,
        item_id: ItemId,
    ) -> Result<ItemTransaction, RedemptionError> {
        let mut tx = self.pool.begin().await?;

        let item = Item::lock_for_redeem(item_id, &mut tx)
            .await?
            .ok_or(RedemptionError::ItemNotFound)?;
        if item.is_hidden {
            return Err(RedemptionError::ItemUnavailable);
        }

        if let Some(hours) = item.cooldown_hours.filter(|hours| *hours > 0) {
            if ItemTransaction::in_cooldown_window(account_id, item_id, hours, &mut tx).await? {
                return Err(RedemptionError::CooldownActive { hours });
            }
        }

        if let Some(limit) = item.quantity_limit {
            let consumed = ItemTransaction::count_consuming_stock(item_id, &mut tx).await?;
            if consumed >= limit as i64 {
                return Err(RedemptionError::OutOfStock);
            }
        }

        // Free items skip the ledger but still require a real account.
        let balance = if item.price.is_positive() {
            let entry = self
                .ledger
                .debit_in_tx(
                    &mut tx,
                    account_id,
                    item.price,
                    EntryReason::Redemption,
                    "Shop redemption",
                    Some(&format!("Redeemed {}", item.name)),
                )
                .await?;
            Some(entry.resulting_balance)
        } else {
            Account::balance_in_tx(account_id, &mut tx)
                .await?
                .ok_or(RedemptionError::AccountNotFound)?;
            None
        };

        let transaction =
            ItemTransaction::insert_pending(account_id, item_id, item.price, &mut tx).await?;

        tx.commit().await?;

        info!(
            account_id = %account_id,
            item_id = %item_id,
            transaction_id = %transaction.id,
            price = %item.price,
            "item redeemed"
        );

        self.bus.broadcast(&TransactionUpdated {
            transaction: transaction.clone(),
        });
        if let Some(points) = balance {
            self.bus.notify(account_id, &PointsUpdate { points }).await;
        }

        Ok(transaction)
    }

    /// Resolve a pending redemption. Rejection refunds the captured price
    /// in the same transaction that flips the status.
    pub async fn resolve(
        &self,
        transaction_id: TransactionId,
        resolution: Resolution,
    ) -> Result<ItemTransaction, RedemptionError> {
        let mut tx = self.pool.begin().await?;

        let transaction = ItemTransaction::lock_for_resolve(transaction_id, &mut tx)
            .await?
            .ok_or(RedemptionError::TransactionNotFound)?;
        if !transaction.is_pending() {
            return Err(RedemptionError::NotPending);
        }

        let refund = match resolution {
            Resolution::Fulfill => None,
            Resolution::Reject => {
                if transaction.points.is_positive() {
                    let entry = self
                        .ledger
                        .credit_in_tx(
                            &mut tx,
                            transaction.account_id,
                            transaction.points,
                            EntryReason::Refund,
                            "Redemption refunded",
                            Some(&format!("Refund of {} points", transaction.points)),
                        )
                        .await?;
                    Some(entry.resulting_balance)
                } else {
                    None
                }
            }
        };

        let status = match resolution {
            Resolution::Fulfill => TransactionStatus::Fulfilled,
            Resolution::Reject => TransactionStatus::Rejected,
        };
        let updated = ItemTransaction::set_status(transaction_id, status, &mut tx).await?;

        tx.commit().await?;

        info!(
            transaction_id = %transaction_id,
            status = %status,
            "redemption resolved"
        );

        self.bus.broadcast(&TransactionUpdated {
            transaction: updated.clone(),
        });
        if let Some(points) = refund {
            self.bus
                .notify(updated.account_id, &PointsUpdate { points })
                .await;
        }

        Ok(updated)
    }

    /// Create a catalog item and push the refreshed catalog. Negative caps
    /// are treated as "no cap" and stored as NULL.
    pub async fn create_item(&self, mut input: NewItem) -> Result<Item, RedemptionError> {
        if input.name.trim().is_empty() {
            return Err(RedemptionError::InvalidInput(
                "Name must not be empty".to_string(),
            ));
        }
        if input.price.is_negative() {
            return Err(RedemptionError::InvalidInput(
                "Price must not be negative".to_string(),
            ));
        }
        if matches!(input.quantity_limit, Some(limit) if limit < 0) {
            input.quantity_limit = None;
        }
        if matches!(input.cooldown_hours, Some(hours) if hours < 0) {
            input.cooldown_hours = None;
        }

        let item = Item::create(&input, &self.pool).await?;
        info!(item_id = %item.id, name = %item.name, "created item");

        self.broadcast_catalog().await?;
        Ok(item)
    }

    /// Apply a partial update and push the refreshed catalog.
    pub async fn update_item(
        &self,
        item_id: ItemId,
        changes: ItemChanges,
    ) -> Result<Item, RedemptionError> {
        if matches!(&changes.name, Some(name) if name.trim().is_empty()) {
            return Err(RedemptionError::InvalidInput(
                "Name must not be empty".to_string(),
            ));
        }
        if matches!(changes.price, Some(price) if price.is_negative()) {
            return Err(RedemptionError::InvalidInput(
                "Price must not be negative".to_string(),
            ));
        }

        let item = Item::update(item_id, &changes, &self.pool)
            .await?
            .ok_or(RedemptionError::ItemNotFound)?;
        info!(item_id = %item.id, "updated item");

        self.broadcast_catalog().await?;
        Ok(item)
    }

    /// Soft-delete an item and push the refreshed catalog. Transaction
    /// history survives the delete.
    pub async fn delete_item(&self, item_id: ItemId) -> Result<(), RedemptionError> {
        if !Item::soft_delete(item_id, &self.pool).await? {
            return Err(RedemptionError::ItemNotFound);
        }
        info!(item_id = %item_id, "deleted item");

        self.broadcast_catalog().await?;
        Ok(())
    }

    /// The catalog as viewers see it.
    pub async fn list_visible(&self) -> Result<Vec<Item>, RedemptionError> {
        Ok(Item::list_visible(&self.pool).await?)
    }

    /// All redemptions by an account, newest first.
    pub async fn account_transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<ItemTransaction>, RedemptionError> {
        Ok(ItemTransaction::list_for_account(account_id, &self.pool).await?)
    }

    /// Redemptions awaiting a moderator, oldest first.
    pub async fn pending_transactions(&self) -> Result<Vec<ItemTransaction>, RedemptionError> {
        Ok(ItemTransaction::list_pending(&self.pool).await?)
    }

    async fn broadcast_catalog(&self) -> Result<(), RedemptionError> {
        let items = Item::list_visible(&self.pool).await?;
        self.bus.broadcast(&CatalogUpdated { items });
        Ok(())
    }
}
