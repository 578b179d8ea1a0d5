use thiserror::Error;

use crate::common::Points;
use crate::domains::ledger::LedgerError;

/// Errors raised by raffle operations
#[derive(Error, Debug)]
pub enum RaffleError {
    #[error("Raffle not found")]
    NotFound,

    #[error("Raffle is not active")]
    NotActive,

    #[error("Raffle is not open for entries right now")]
    OutsideWindow,

    #[error("Ticket count must be at least 1")]
    InvalidTicketCount,

    #[error("Ticket cap is {cap}: holding {existing}, requested {requested} more")]
    TicketCapExceeded {
        cap: i32,
        existing: i64,
        requested: i64,
    },

    #[error("Cannot draw {winner_count} winners from {sold} tickets sold")]
    NotEnoughTickets { sold: i64, winner_count: i32 },

    #[error("{0}")]
    InvalidInput(String),

    #[error("Account not found")]
    AccountNotFound,

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Points, available: Points },

    #[error("Raffle store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

impl RaffleError {
    /// Stable machine-readable code for API and queue consumers
    pub fn code(&self) -> &'static str {
        match self {
            RaffleError::NotFound | RaffleError::AccountNotFound => "not_found",
            RaffleError::NotActive
            | RaffleError::OutsideWindow
            | RaffleError::InvalidTicketCount
            | RaffleError::NotEnoughTickets { .. }
            | RaffleError::InvalidInput(_) => "invalid_state",
            RaffleError::TicketCapExceeded { .. } => "cap_exceeded",
            RaffleError::InsufficientFunds { .. } => "insufficient_funds",
            RaffleError::Unavailable(_) => "unavailable",
        }
    }
}

impl From<LedgerError> for RaffleError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                required,
                available,
            } => RaffleError::InsufficientFunds {
                required,
                available,
            },
            LedgerError::AccountNotFound => RaffleError::AccountNotFound,
            LedgerError::Unavailable(err) => RaffleError::Unavailable(err),
        }
    }
}
