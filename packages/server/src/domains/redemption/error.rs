use thiserror::Error;

use crate::common::Points;
use crate::domains::ledger::LedgerError;

/// Errors raised by catalog and redemption operations
#[derive(Error, Debug)]
pub enum RedemptionError {
    #[error("Item not found")]
    ItemNotFound,

    #[error("Item is not available for redemption")]
    ItemUnavailable,

    #[error("Item is out of stock")]
    OutOfStock,

    #[error("Item was redeemed recently; cooldown is {hours} hour(s)")]
    CooldownActive { hours: i32 },

    #[error("Transaction not found")]
    TransactionNotFound,

    #[error("Transaction is already resolved")]
    NotPending,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Account not found")]
    AccountNotFound,

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Points, available: Points },

    #[error("Redemption store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

impl RedemptionError {
    /// Stable machine-readable code for API and queue consumers
    pub fn code(&self) -> &'static str {
        match self {
            RedemptionError::ItemNotFound
            | RedemptionError::TransactionNotFound
            | RedemptionError::AccountNotFound => "not_found",
            RedemptionError::ItemUnavailable
            | RedemptionError::NotPending
            | RedemptionError::InvalidInput(_) => "invalid_state",
            RedemptionError::OutOfStock => "cap_exceeded",
            RedemptionError::CooldownActive { .. } => "cooldown_active",
            RedemptionError::InsufficientFunds { .. } => "insufficient_funds",
            RedemptionError::Unavailable(_) => "unavailable",
        }
    }
}

impl From<LedgerError> for RedemptionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                required,
                available,
            } => RedemptionError::InsufficientFunds {
                required,
                available,
            },
            LedgerError::AccountNotFound => RedemptionError::AccountNotFound,
            LedgerError::Unavailable(err) => RedemptionError::Unavailable(err),
        }
    }
}
