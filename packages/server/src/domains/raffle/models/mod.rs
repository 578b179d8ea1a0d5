// Raffle domain models

pub mod raffle;
pub mod ticket;

pub use raffle::{NewRaffle, Raffle, RaffleStatus, RaffleSummary, RaffleWinner};
pub use ticket::{Ticket, TicketRow, TicketTally};
