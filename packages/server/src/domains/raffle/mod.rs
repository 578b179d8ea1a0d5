//! Raffle domain - timed drawings entered with points.

pub mod draw;
pub mod error;
pub mod events;
pub mod models;
pub mod service;

pub use error::RaffleError;
pub use events::{RaffleCompleted, TicketBatchCreated};
pub use models::{NewRaffle, Raffle, RaffleStatus, RaffleSummary, RaffleWinner, Ticket};
pub use service::{ParticipantOdds, RaffleDetail, RaffleService, TicketPurchase};
