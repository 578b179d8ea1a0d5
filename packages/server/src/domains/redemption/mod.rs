//! Redemption domain - the points shop and its fulfillment queue.

pub mod error;
pub mod events;
pub mod models;
pub mod service;

pub use error::RedemptionError;
pub use events::{CatalogUpdated, TransactionUpdated};
pub use models::{Item, ItemChanges, ItemTransaction, NewItem, TransactionStatus};
pub use service::{RedemptionService, Resolution};
