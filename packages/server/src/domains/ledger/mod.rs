//! Ledger domain - points balances and their append-only audit trail.

pub mod error;
pub mod events;
pub mod models;
pub mod service;

pub use error::LedgerError;
pub use events::PointsUpdate;
pub use models::{Account, EntryReason, LedgerEntry};
pub use service::LedgerService;
