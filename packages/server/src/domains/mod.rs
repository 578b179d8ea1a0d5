// Business domains

pub mod activity;
pub mod ledger;
pub mod raffle;
pub mod redemption;
