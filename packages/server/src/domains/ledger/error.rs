use thiserror::Error;

use crate::common::Points;

/// Errors raised by balance mutations
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Points, available: Points },

    #[error("Account not found")]
    AccountNotFound,

    #[error("Ledger unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

impl LedgerError {
    /// Stable machine-readable code for API and queue consumers
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::AccountNotFound => "not_found",
            LedgerError::Unavailable(_) => "unavailable",
        }
    }

    /// Whether retrying the same operation can succeed without any state
    /// change (transient storage failures only).
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_))
    }
}
