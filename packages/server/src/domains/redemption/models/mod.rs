// Redemption domain models

pub mod item;
pub mod transaction;

pub use item::{Item, ItemChanges, NewItem};
pub use transaction::{ItemTransaction, TransactionStatus};
