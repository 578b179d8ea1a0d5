// Points Ledger & Raffle Engine - Server Core
//
// This crate provides the backend core for a stream community platform:
// viewers earn points for chat activity and presence, spend them on raffle
// tickets and catalog items, and results fan out live over the bus.
//
// Architecture follows domain-driven design; all SQL lives in
// domains/*/models/ and services own the transaction boundaries.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
