//! Redemption events pushed over the notification bus.

use serde_json::json;

use crate::kernel::BusEvent;

use super::models::{Item, ItemTransaction};

/// Broadcast whenever a redemption is created or resolved, so moderator
/// dashboards update live.
#[derive(Debug, Clone)]
pub struct TransactionUpdated {
    pub transaction: ItemTransaction,
}

impl BusEvent for TransactionUpdated {
    fn channel(&self) -> String {
        "transaction_update".to_string()
    }

    fn payload(&self) -> serde_json::Value {
        json!({
            "type": "transaction_update",
            "transaction": self.transaction,
        })
    }
}

/// Broadcast after any catalog change, carrying the full visible catalog
/// rather than a diff.
#[derive(Debug, Clone)]
pub struct CatalogUpdated {
    pub items: Vec<Item>,
}

impl BusEvent for CatalogUpdated {
    fn channel(&self) -> String {
        "item_update".to_string()
    }

    fn payload(&self) -> serde_json::Value {
        json!({
            "type": "item_update",
            "items": self.items,
        })
    }
}
