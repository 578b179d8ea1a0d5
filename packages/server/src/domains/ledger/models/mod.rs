// Ledger domain models

pub mod account;
pub mod entry;

pub use account::Account;
pub use entry::{EntryReason, LedgerEntry};
