use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use crate::common::{ItemId, Points};

/// Item - a redeemable catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: Option<String>,
    pub price: Points,

    /// Total redemptions allowed across all accounts; NULL means unlimited.
    pub quantity_limit: Option<i32>,

    /// Hours an account must wait between redemptions of this item; NULL
    /// means no cooldown.
    pub cooldown_hours: Option<i32>,

    /// Hidden items stay out of the catalog and cannot be redeemed.
    pub is_hidden: bool,

    /// Soft delete (preserves transaction history)
    pub deleted_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an item
#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub description: Option<String>,
    pub price: Points,
    pub quantity_limit: Option<i32>,
    pub cooldown_hours: Option<i32>,
    pub is_hidden: bool,
}

/// Partial update for an item; `None` fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Points>,
    pub quantity_limit: Option<i32>,
    pub cooldown_hours: Option<i32>,
    pub is_hidden: Option<bool>,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Item {
    /// Create a catalog item
    pub async fn create(input: &NewItem, pool: &PgPool) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Item>(
            "INSERT INTO items
                 (id, name, description, price, quantity_limit, cooldown_hours, is_hidden)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(ItemId::new())
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.quantity_limit)
        .bind(input.cooldown_hours)
        .bind(input.is_hidden)
        .fetch_one(pool)
        .await
    }

    /// Find a live (not soft-deleted) item by ID
    pub async fn find_by_id(id: ItemId, pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lock the item row for a redemption.
    ///
    /// Serializes stock and cooldown checks: two redemptions of the same
    /// item cannot interleave between check and insert.
    pub(crate) async fn lock_for_redeem(
        id: ItemId,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Item>(
            "SELECT * FROM items WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Catalog listing: visible, live items
    pub async fn list_visible(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Item>(
            "SELECT * FROM items
             WHERE is_hidden = FALSE AND deleted_at IS NULL
             ORDER BY price ASC, name ASC",
        )
        .fetch_all(pool)
        .await
    }

    /// Partial update; absent fields keep their current value.
    ///
    /// For the two caps, a negative value clears the cap (stored NULL), so
    /// admin tooling can lift a limit without a dedicated endpoint.
    pub async fn update(
        id: ItemId,
        changes: &ItemChanges,
        pool: &PgPool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Item>(
            "UPDATE items
             SET name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 price = COALESCE($4, price),
                 quantity_limit = CASE
                     WHEN $5 IS NULL THEN quantity_limit
                     WHEN $5 < 0 THEN NULL
                     ELSE $5 END,
                 cooldown_hours = CASE
                     WHEN $6 IS NULL THEN cooldown_hours
                     WHEN $6 < 0 THEN NULL
                     ELSE $6 END,
                 is_hidden = COALESCE($7, is_hidden),
                 updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING *",
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.price)
        .bind(changes.quantity_limit)
        .bind(changes.cooldown_hours)
        .bind(changes.is_hidden)
        .fetch_optional(pool)
        .await
    }

    /// Soft-delete; returns false when the item was already gone
    pub async fn soft_delete(id: ItemId, pool: &PgPool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE items SET deleted_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
