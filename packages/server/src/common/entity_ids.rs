//! Typed ID definitions for all domain entities.
//!
//! This module defines type aliases for each domain entity, providing
//! compile-time type safety for ID usage throughout the application.
//!
//! # Example
//!
//! ```rust
//! use server_core::common::{AccountId, RaffleId};
//!
//! // These are incompatible types - compiler prevents mixing them up
//! let account_id: AccountId = AccountId::new();
//! let raffle_id: RaffleId = RaffleId::new();
//!
//! // This would be a compile error:
//! // let wrong: RaffleId = account_id;
//! ```

// Re-export the core Id type and version markers
pub use super::id::{Id, V4, V7};

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Account entities (viewers).
pub struct Account;

/// Marker type for LedgerEntry entities (append-only audit records).
pub struct LedgerEntry;

/// Marker type for Raffle entities.
pub struct Raffle;

/// Marker type for Ticket entities (raffle entries).
pub struct Ticket;

/// Marker type for Item entities (redeemable catalog items).
pub struct Item;

/// Marker type for ItemTransaction entities (redemption attempts).
pub struct ItemTransaction;

/// Marker type for live-subscriber connections on the notification bus.
pub struct Connection;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for Account entities.
pub type AccountId = Id<Account>;

/// Typed ID for LedgerEntry entities.
pub type EntryId = Id<LedgerEntry>;

/// Typed ID for Raffle entities.
pub type RaffleId = Id<Raffle>;

/// Typed ID for Ticket entities.
pub type TicketId = Id<Ticket>;

/// Typed ID for Item entities.
pub type ItemId = Id<Item>;

/// Typed ID for ItemTransaction entities.
pub type TransactionId = Id<ItemTransaction>;

/// Typed ID for bus connections. V4 because connections have no meaningful
/// chronological ordering.
pub type ConnectionId = Id<Connection, V4>;
