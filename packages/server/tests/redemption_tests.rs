//! Integration tests for the redemption engine: catalog management,
//! redeeming under stock and cooldown caps, and moderator resolution with
//! refunds.

mod common;

use std::sync::Arc;
use std::time::Duration;

use crate::common::{create_hidden_item, create_test_account, create_test_item, TestHarness};
use futures::future::join_all;
use server_core::common::{ItemId, Points};
use server_core::domains::ledger::LedgerEntry;
use server_core::domains::redemption::models::{ItemTransaction, TransactionStatus};
use server_core::domains::redemption::{ItemChanges, RedemptionError, Resolution};
use test_context::test_context;

// =============================================================================
// Redeem Tests
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn redeem_creates_pending_transaction(ctx: &TestHarness) {
    let account = create_test_account(&ctx.db_pool, Points::from_whole(100))
        .await
        .expect("Failed to create account");
    let item = create_test_item(&ctx.db_pool, Points::from_whole(30), None, None)
        .await
        .expect("Failed to create item");
    let redemptions = ctx.redemptions();

    let mut firehose = ctx.bus.subscribe();
    let mut registration = ctx.bus.register(account.id).await;

    let transaction = redemptions
        .redeem(account.id, item.id)
        .await
        .expect("Redeem should succeed");
    assert_eq!(transaction.status, TransactionStatus::Pending.as_str());
    assert_eq!(transaction.points, Points::from_whole(30));
    assert_eq!(transaction.item_id, item.id);

    let balance = ctx
        .ledger()
        .get_balance(account.id)
        .await
        .expect("Failed to read balance");
    assert_eq!(balance, Points::from_whole(70));

    let entries = LedgerEntry::all_for_account(account.id, &ctx.db_pool)
        .await
        .expect("Failed to list entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reason, "redemption");

    // Moderator dashboards hear about the new pending transaction.
    let broadcast = tokio::time::timeout(Duration::from_secs(1), firehose.recv())
        .await
        .expect("Timed out waiting for transaction broadcast")
        .expect("Broadcast channel closed");
    assert_eq!(broadcast.channel, "transaction_update");
    assert_eq!(broadcast.payload["transaction"]["status"], "pending");

    // The buyer hears their new balance.
    let push = tokio::time::timeout(Duration::from_secs(1), registration.receiver.recv())
        .await
        .expect("Timed out waiting for points update")
        .expect("Bus channel closed");
    assert_eq!(push.channel, "points_update");
    assert_eq!(push.payload["points"].as_f64(), Some(70.0));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn redeem_insufficient_funds_rolls_back(ctx: &TestHarness) {
    let account = create_test_account(&ctx.db_pool, Points::from_whole(10))
        .await
        .expect("Failed to create account");
    let item = create_test_item(&ctx.db_pool, Points::from_whole(30), None, None)
        .await
        .expect("Failed to create item");
    let redemptions = ctx.redemptions();

    let err = redemptions
        .redeem(account.id, item.id)
        .await
        .expect_err("10 points cannot buy a 30-point item");
    assert!(matches!(err, RedemptionError::InsufficientFunds { .. }));

    let balance = ctx
        .ledger()
        .get_balance(account.id)
        .await
        .expect("Failed to read balance");
    assert_eq!(balance, Points::from_whole(10));

    let transactions = redemptions
        .account_transactions(account.id)
        .await
        .expect("Failed to list transactions");
    assert!(transactions.is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn redeem_rejects_hidden_item(ctx: &TestHarness) {
    let account = create_test_account(&ctx.db_pool, Points::from_whole(100))
        .await
        .expect("Failed to create account");
    let item = create_hidden_item(&ctx.db_pool, Points::from_whole(10))
        .await
        .expect("Failed to create item");

    let err = ctx
        .redemptions()
        .redeem(account.id, item.id)
        .await
        .expect_err("Hidden items cannot be redeemed");
    assert!(matches!(err, RedemptionError::ItemUnavailable));
    assert_eq!(err.code(), "invalid_state");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn redeem_missing_item_is_not_found(ctx: &TestHarness) {
    let account = create_test_account(&ctx.db_pool, Points::from_whole(100))
        .await
        .expect("Failed to create account");

    let err = ctx
        .redemptions()
        .redeem(account.id, ItemId::new())
        .await
        .expect_err("Unknown item id should fail");
    assert!(matches!(err, RedemptionError::ItemNotFound));
    assert_eq!(err.code(), "not_found");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn redeem_enforces_cooldown(ctx: &TestHarness) {
    let account = create_test_account(&ctx.db_pool, Points::from_whole(100))
        .await
        .expect("Failed to create account");
    let item = create_test_item(&ctx.db_pool, Points::from_whole(10), None, Some(24))
        .await
        .expect("Failed to create item");
    let redemptions = ctx.redemptions();

    redemptions
        .redeem(account.id, item.id)
        .await
        .expect("First redeem should succeed");

    let err = redemptions
        .redeem(account.id, item.id)
        .await
        .expect_err("Second redeem inside the cooldown should fail");
    assert_eq!(err.code(), "cooldown_active");
    match err {
        RedemptionError::CooldownActive { hours } => assert_eq!(hours, 24),
        other => panic!("Expected CooldownActive, got {other:?}"),
    }

    // The cooldown is per account; someone else can still redeem.
    let other = create_test_account(&ctx.db_pool, Points::from_whole(100))
        .await
        .expect("Failed to create account");
    redemptions
        .redeem(other.id, item.id)
        .await
        .expect("Cooldown must not block other accounts");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn redeem_enforces_stock(ctx: &TestHarness) {
    let first = create_test_account(&ctx.db_pool, Points::from_whole(100))
        .await
        .expect("Failed to create account");
    let second = create_test_account(&ctx.db_pool, Points::from_whole(100))
        .await
        .expect("Failed to create account");
    let item = create_test_item(&ctx.db_pool, Points::from_whole(10), Some(1), None)
        .await
        .expect("Failed to create item");
    let redemptions = ctx.redemptions();

    redemptions
        .redeem(first.id, item.id)
        .await
        .expect("First redeem takes the only unit");

    let err = redemptions
        .redeem(second.id, item.id)
        .await
        .expect_err("Stock of 1 is spent");
    assert!(matches!(err, RedemptionError::OutOfStock));
    assert_eq!(err.code(), "cap_exceeded");
}

/// Five accounts race for a single unit: the item row lock serializes the
/// stock check and exactly one redemption lands.
#[test_context(TestHarness)]
#[tokio::test]
async fn concurrent_redeems_respect_quantity_limit(ctx: &TestHarness) {
    let item = create_test_item(&ctx.db_pool, Points::from_whole(10), Some(1), None)
        .await
        .expect("Failed to create item");
    let redemptions = Arc::new(ctx.redemptions());

    let mut tasks = Vec::new();
    for _ in 0..5 {
        let account = create_test_account(&ctx.db_pool, Points::from_whole(100))
            .await
            .expect("Failed to create account");
        let redemptions = Arc::clone(&redemptions);
        let item_id = item.id;
        tasks.push(tokio::spawn(async move {
            redemptions.redeem(account.id, item_id).await
        }));
    }

    let results = join_all(tasks).await;
    let successes = results
        .iter()
        .filter(|result| matches!(result, Ok(Ok(_))))
        .count();
    assert_eq!(successes, 1);

    let pending = redemptions
        .pending_transactions()
        .await
        .expect("Failed to list pending transactions");
    let for_item = pending
        .iter()
        .filter(|transaction| transaction.item_id == item.id)
        .count();
    assert_eq!(for_item, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn free_item_redeems_without_debit(ctx: &TestHarness) {
    let account = create_test_account(&ctx.db_pool, Points::ZERO)
        .await
        .expect("Failed to create account");
    let item = create_test_item(&ctx.db_pool, Points::ZERO, None, None)
        .await
        .expect("Failed to create item");

    let transaction = ctx
        .redemptions()
        .redeem(account.id, item.id)
        .await
        .expect("Free redeem should succeed");
    assert_eq!(transaction.points, Points::ZERO);

    let entries = LedgerEntry::all_for_account(account.id, &ctx.db_pool)
        .await
        .expect("Failed to list entries");
    assert!(entries.is_empty());
}

// =============================================================================
// Resolution Tests
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn reject_refunds_points_and_frees_stock(ctx: &TestHarness) {
    let account = create_test_account(&ctx.db_pool, Points::from_whole(50))
        .await
        .expect("Failed to create account");
    let item = create_test_item(&ctx.db_pool, Points::from_whole(20), Some(1), None)
        .await
        .expect("Failed to create item");
    let redemptions = ctx.redemptions();

    let transaction = redemptions
        .redeem(account.id, item.id)
        .await
        .expect("Redeem should succeed");

    // Stock is spent while the transaction is pending.
    let other = create_test_account(&ctx.db_pool, Points::from_whole(50))
        .await
        .expect("Failed to create account");
    let err = redemptions
        .redeem(other.id, item.id)
        .await
        .expect_err("Pending redemption holds the unit");
    assert!(matches!(err, RedemptionError::OutOfStock));

    let rejected = redemptions
        .resolve(transaction.id, Resolution::Reject)
        .await
        .expect("Reject should succeed");
    assert_eq!(rejected.status, TransactionStatus::Rejected.as_str());

    // The captured price came back and left a refund entry.
    let balance = ctx
        .ledger()
        .get_balance(account.id)
        .await
        .expect("Failed to read balance");
    assert_eq!(balance, Points::from_whole(50));

    let entries = LedgerEntry::all_for_account(account.id, &ctx.db_pool)
        .await
        .expect("Failed to list entries");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].reason, "refund");
    assert_eq!(entries[1].delta, Points::from_whole(20));

    // Rejected transactions stop consuming stock.
    redemptions
        .redeem(other.id, item.id)
        .await
        .expect("Rejection must return the unit to stock");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn fulfill_marks_transaction_without_refund(ctx: &TestHarness) {
    let account = create_test_account(&ctx.db_pool, Points::from_whole(50))
        .await
        .expect("Failed to create account");
    let item = create_test_item(&ctx.db_pool, Points::from_whole(20), None, None)
        .await
        .expect("Failed to create item");
    let redemptions = ctx.redemptions();

    let transaction = redemptions
        .redeem(account.id, item.id)
        .await
        .expect("Redeem should succeed");

    let fulfilled = redemptions
        .resolve(transaction.id, Resolution::Fulfill)
        .await
        .expect("Fulfill should succeed");
    assert_eq!(fulfilled.status, TransactionStatus::Fulfilled.as_str());

    // No refund: the debit stands alone.
    let balance = ctx
        .ledger()
        .get_balance(account.id)
        .await
        .expect("Failed to read balance");
    assert_eq!(balance, Points::from_whole(30));
    let entries = LedgerEntry::all_for_account(account.id, &ctx.db_pool)
        .await
        .expect("Failed to list entries");
    assert_eq!(entries.len(), 1);

    // Resolution is final.
    let err = redemptions
        .resolve(transaction.id, Resolution::Reject)
        .await
        .expect_err("A resolved transaction cannot be resolved again");
    assert!(matches!(err, RedemptionError::NotPending));
}

// =============================================================================
// Catalog Tests
// =============================================================================

#[test_context(TestHarness)]
#[tokio::test]
async fn delete_item_hides_it_but_keeps_history(ctx: &TestHarness) {
    let account = create_test_account(&ctx.db_pool, Points::from_whole(100))
        .await
        .expect("Failed to create account");
    let item = create_test_item(&ctx.db_pool, Points::from_whole(10), None, None)
        .await
        .expect("Failed to create item");
    let redemptions = ctx.redemptions();

    let transaction = redemptions
        .redeem(account.id, item.id)
        .await
        .expect("Redeem should succeed");

    redemptions
        .delete_item(item.id)
        .await
        .expect("Delete should succeed");

    let catalog = redemptions
        .list_visible()
        .await
        .expect("Failed to list catalog");
    assert!(catalog.iter().all(|entry| entry.id != item.id));

    let err = redemptions
        .redeem(account.id, item.id)
        .await
        .expect_err("Deleted items cannot be redeemed");
    assert!(matches!(err, RedemptionError::ItemNotFound));

    // The transaction history survives the delete.
    let found = ItemTransaction::find_by_id(transaction.id, &ctx.db_pool)
        .await
        .expect("Failed to load transaction")
        .expect("Transaction vanished");
    assert_eq!(found.item_id, item.id);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn update_item_changes_price_and_clears_caps(ctx: &TestHarness) {
    let item = create_test_item(&ctx.db_pool, Points::from_whole(10), Some(5), Some(12))
        .await
        .expect("Failed to create item");
    let redemptions = ctx.redemptions();

    let updated = redemptions
        .update_item(
            item.id,
            ItemChanges {
                price: Some(Points::from_whole(15)),
                // Negative sentinel clears the cap.
                quantity_limit: Some(-1),
                ..Default::default()
            },
        )
        .await
        .expect("Update should succeed");
    assert_eq!(updated.price, Points::from_whole(15));
    assert_eq!(updated.quantity_limit, None);
    // Untouched fields keep their values.
    assert_eq!(updated.cooldown_hours, Some(12));
    assert_eq!(updated.name, item.name);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn catalog_changes_broadcast_full_catalog(ctx: &TestHarness) {
    let redemptions = ctx.redemptions();
    let mut firehose = ctx.bus.subscribe();

    let item = redemptions
        .create_item(server_core::domains::redemption::NewItem {
            name: format!("Broadcast {}", uuid::Uuid::new_v4().simple()),
            description: None,
            price: Points::from_whole(10),
            quantity_limit: None,
            cooldown_hours: None,
            is_hidden: false,
        })
        .await
        .expect("Create should succeed");

    let message = tokio::time::timeout(Duration::from_secs(1), firehose.recv())
        .await
        .expect("Timed out waiting for catalog broadcast")
        .expect("Broadcast channel closed");
    assert_eq!(message.channel, "item_update");
    assert_eq!(message.payload["type"], "item_update");
    let items = message.payload["items"]
        .as_array()
        .expect("Catalog payload must carry the item list");
    assert!(items
        .iter()
        .any(|entry| entry["name"] == item.name.as_str()));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn hidden_items_stay_out_of_the_catalog(ctx: &TestHarness) {
    let hidden = create_hidden_item(&ctx.db_pool, Points::from_whole(10))
        .await
        .expect("Failed to create item");

    let catalog = ctx
        .redemptions()
        .list_visible()
        .await
        .expect("Failed to list catalog");
    assert!(catalog.iter().all(|entry| entry.id != hidden.id));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn create_item_rejects_negative_price(ctx: &TestHarness) {
    let err = ctx
        .redemptions()
        .create_item(server_core::domains::redemption::NewItem {
            name: "Bad price".to_string(),
            description: None,
            price: Points::from_hundredths(-1),
            quantity_limit: None,
            cooldown_hours: None,
            is_hidden: false,
        })
        .await
        .expect_err("Negative prices are invalid");
    assert!(matches!(err, RedemptionError::InvalidInput(_)));
}
