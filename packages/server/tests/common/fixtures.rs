//! Test fixtures for integration tests.
//!
//! Every fixture mints unique logins and titles so tests sharing the
//! database container never collide.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use server_core::common::Points;
use server_core::domains::ledger::models::Account;
use server_core::domains::raffle::models::{NewRaffle, Raffle};
use server_core::domains::redemption::models::{Item, NewItem};

/// Create an account with the given starting balance.
pub async fn create_test_account(pool: &PgPool, balance: Points) -> Result<Account> {
    let login = format!("viewer-{}", Uuid::new_v4().simple());
    let account = Account::create(&login, "Test Viewer", pool).await?;
    if balance.is_positive() {
        let account = sqlx::query_as::<_, Account>(
            "UPDATE accounts SET balance = $2 WHERE id = $1 RETURNING *",
        )
        .bind(account.id)
        .bind(balance)
        .fetch_one(pool)
        .await?;
        return Ok(account);
    }
    Ok(account)
}

/// Create an active raffle whose window is open right now.
pub async fn create_open_raffle(
    pool: &PgPool,
    ticket_price: Points,
    max_tickets_per_account: Option<i32>,
    winner_count: i32,
) -> Result<Raffle> {
    let raffle = Raffle::create(
        &NewRaffle {
            title: format!("Raffle {}", Uuid::new_v4().simple()),
            description: None,
            ticket_price,
            start_time: Utc::now() - Duration::hours(1),
            end_time: Utc::now() + Duration::hours(1),
            max_tickets_per_account,
            winner_count,
        },
        pool,
    )
    .await?;
    Ok(raffle)
}

/// Create an active raffle with an explicit purchase window.
pub async fn create_raffle_with_window(
    pool: &PgPool,
    ticket_price: Points,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<Raffle> {
    let raffle = Raffle::create(
        &NewRaffle {
            title: format!("Raffle {}", Uuid::new_v4().simple()),
            description: None,
            ticket_price,
            start_time,
            end_time,
            max_tickets_per_account: None,
            winner_count: 1,
        },
        pool,
    )
    .await?;
    Ok(raffle)
}

/// Create a visible catalog item.
pub async fn create_test_item(
    pool: &PgPool,
    price: Points,
    quantity_limit: Option<i32>,
    cooldown_hours: Option<i32>,
) -> Result<Item> {
    let item = Item::create(
        &NewItem {
            name: format!("Item {}", Uuid::new_v4().simple()),
            description: None,
            price,
            quantity_limit,
            cooldown_hours,
            is_hidden: false,
        },
        pool,
    )
    .await?;
    Ok(item)
}

/// Create a hidden catalog item.
pub async fn create_hidden_item(pool: &PgPool, price: Points) -> Result<Item> {
    let item = Item::create(
        &NewItem {
            name: format!("Hidden {}", Uuid::new_v4().simple()),
            description: None,
            price,
            quantity_limit: None,
            cooldown_hours: None,
            is_hidden: true,
        },
        pool,
    )
    .await?;
    Ok(item)
}
