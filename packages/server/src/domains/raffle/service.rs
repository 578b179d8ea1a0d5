//! Raffle lifecycle: creation, ticket purchase, seeded draws, odds.
//!
//! Locking protocol: purchases take the raffle row FOR SHARE and then the
//! buyer's account row FOR UPDATE; the draw takes the raffle row FOR
//! UPDATE. Purchases therefore run concurrently with each other (different
//! accounts never contend) while the draw waits for in-flight purchases and
//! blocks new ones until it commits. Rows are always locked raffle first,
//! account second, matching the redemption engine's item-then-account
//! order, so the lock graph stays acyclic.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;

use crate::common::{AccountId, PageArgs, Paginated, Points, RaffleId};
use crate::domains::ledger::models::Account;
use crate::domains::ledger::{EntryReason, LedgerService, PointsUpdate};
use crate::kernel::NotificationBus;

use super::draw;
use super::error::RaffleError;
use super::events::{RaffleCompleted, TicketBatchCreated, TicketCreated};
use super::models::{NewRaffle, Raffle, RaffleSummary, RaffleWinner, Ticket, TicketRow};

/// A raffle with its aggregates, as returned by [`RaffleService::get`].
#[derive(Debug, Clone, Serialize)]
pub struct RaffleDetail {
    pub raffle: Raffle,
    pub total_tickets: i64,
    pub participants: i64,
    pub winners: Vec<RaffleWinner>,
}

/// Outcome of a ticket purchase.
#[derive(Debug, Clone, Serialize)]
pub struct TicketPurchase {
    pub tickets: Vec<Ticket>,
    /// Buyer's balance after the purchase.
    pub balance: Points,
}

/// One account's share of a raffle's tickets.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantOdds {
    pub account_id: AccountId,
    pub display_name: String,
    pub ticket_count: i64,
    /// Win probability for a single-winner draw, as a percentage.
    pub odds: f64,
}

pub struct RaffleService {
    pool: PgPool,
    ledger: Arc<LedgerService>,
    bus: Arc<NotificationBus>,
}

impl RaffleService {
    pub fn new(pool: PgPool, ledger: Arc<LedgerService>, bus: Arc<NotificationBus>) -> Self {
        Self { pool, ledger, bus }
    }

    /// Create a raffle. Negative per-account caps are treated as "no cap"
    /// and stored as NULL.
    pub async fn create(&self, mut input: NewRaffle) -> Result<Raffle, RaffleError> {
        if input.title.trim().is_empty() {
            return Err(RaffleError::InvalidInput(
                "Title must not be empty".to_string(),
            ));
        }
        if input.start_time >= input.end_time {
            return Err(RaffleError::InvalidInput(
                "Start time must be before end time".to_string(),
            ));
        }
        if input.ticket_price.is_negative() {
            return Err(RaffleError::InvalidInput(
                "Ticket price must not be negative".to_string(),
            ));
        }
        if input.winner_count < 1 {
            return Err(RaffleError::InvalidInput(
                "Winner count must be at least 1".to_string(),
            ));
        }
        if matches!(input.max_tickets_per_account, Some(cap) if cap < 0) {
            input.max_tickets_per_account = None;
        }

        let raffle = Raffle::create(&input, &self.pool).await?;
        info!(raffle_id = %raffle.id, title = %raffle.title, "created raffle");
        Ok(raffle)
    }

    /// All raffles with ticket totals, newest window first.
    pub async fn list(&self) -> Result<Vec<RaffleSummary>, RaffleError> {
        Ok(Raffle::list_summaries(&self.pool).await?)
    }

    /// One raffle with its aggregates and any recorded winners.
    pub async fn get(&self, raffle_id: RaffleId) -> Result<RaffleDetail, RaffleError> {
        let raffle = Raffle::find_by_id(raffle_id, &self.pool)
            .await?
            .ok_or(RaffleError::NotFound)?;
        let total_tickets = Ticket::count_for_raffle(raffle_id, &self.pool).await?;
        let participants = Ticket::participant_count(raffle_id, &self.pool).await?;
        let winners = Raffle::winners(raffle_id, &self.pool).await?;
        Ok(RaffleDetail {
            raffle,
            total_tickets,
            participants,
            winners,
        })
    }

    /// Buy tickets: debit the cost and mint the batch atomically.
    ///
    /// On any failure (inactive raffle, cap, insufficient funds) the
    /// transaction rolls back whole: no tickets without the debit, no debit
    /// without the tickets.
    pub async fn participate(
        &self,
        account_id: AccountId,
        raffle_id: RaffleId,
        ticket_count: i64,
    ) -> Result<TicketPurchase, RaffleError> {
        if ticket_count < 1 {
            return Err(RaffleError::InvalidTicketCount);
        }
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let raffle = Raffle::lock_shared(raffle_id, &mut tx)
            .await?
            .ok_or(RaffleError::NotFound)?;
        if !raffle.is_active() {
            return Err(RaffleError::NotActive);
        }
        if !raffle.window_contains(now) {
            return Err(RaffleError::OutsideWindow);
        }

        // The account lock serializes this account's purchases, making the
        // cap check below race-free.
        let account = Account::lock_for_update(account_id, &mut tx)
            .await?
            .ok_or(RaffleError::AccountNotFound)?;

        let existing = Ticket::count_for_participant(raffle_id, account_id, &mut tx).await?;
        if let Some(cap) = raffle.max_tickets_per_account {
            if existing + ticket_count > cap as i64 {
                return Err(RaffleError::TicketCapExceeded {
                    cap,
                    existing,
                    requested: ticket_count,
                });
            }
        }

        let cost = raffle
            .ticket_price
            .checked_mul(ticket_count)
            .ok_or_else(|| RaffleError::InvalidInput("Ticket cost overflows".to_string()))?;

        // Free raffles skip the ledger entirely.
        let balance = if cost.is_positive() {
            let entry = self
                .ledger
                .debit_in_tx(
                    &mut tx,
                    account_id,
                    cost,
                    EntryReason::RafflePurchase,
                    "Raffle entry",
                    Some(&format!(
                        "Bought {} ticket(s) for {}",
                        ticket_count, raffle.title
                    )),
                )
                .await?;
            entry.resulting_balance
        } else {
            account.balance
        };

        let hashes: Vec<String> = (0..ticket_count)
            .map(|_| Ticket::mint_hash(account_id, raffle_id))
            .collect();
        let tickets = Ticket::insert_batch(raffle_id, account_id, &hashes, &mut tx).await?;

        tx.commit().await?;

        info!(
            account_id = %account_id,
            raffle_id = %raffle_id,
            tickets = tickets.len(),
            cost = %cost,
            "tickets purchased"
        );

        self.bus.broadcast(&TicketBatchCreated {
            tickets: tickets
                .iter()
                .map(|ticket| TicketCreated {
                    id: ticket.id,
                    hash: ticket.hash.clone(),
                    account_id,
                    display_name: account.display_name.clone(),
                    created_at: ticket.created_at,
                })
                .collect(),
        });
        if cost.is_positive() {
            self.bus
                .notify(account_id, &PointsUpdate { points: balance })
                .await;
        }

        Ok(TicketPurchase { tickets, balance })
    }

    /// Draw the winners, complete the raffle and record the seed.
    ///
    /// Draws are weighted by ticket count without replacement; see
    /// [`draw::select_winners`]. A completed raffle cannot be drawn again.
    pub async fn draw_winners(
        &self,
        raffle_id: RaffleId,
    ) -> Result<Vec<RaffleWinner>, RaffleError> {
        let mut tx = self.pool.begin().await?;

        let raffle = Raffle::lock_exclusive(raffle_id, &mut tx)
            .await?
            .ok_or(RaffleError::NotFound)?;
        if !raffle.is_active() {
            return Err(RaffleError::NotActive);
        }

        let tallies = Ticket::tally_by_account_in_tx(raffle_id, &mut tx).await?;
        let sold: i64 = tallies.iter().map(|tally| tally.ticket_count).sum();
        if sold < raffle.winner_count as i64 {
            return Err(RaffleError::NotEnoughTickets {
                sold,
                winner_count: raffle.winner_count,
            });
        }

        let seed = draw::random_seed();
        let winner_ids = draw::select_winners(&tallies, raffle.winner_count as usize, seed);
        Raffle::complete(raffle_id, &winner_ids, &hex::encode(seed), &mut tx).await?;

        tx.commit().await?;

        let winners: Vec<RaffleWinner> = winner_ids
            .iter()
            .enumerate()
            .map(|(index, account_id)| RaffleWinner {
                account_id: *account_id,
                display_name: tallies
                    .iter()
                    .find(|tally| tally.account_id == *account_id)
                    .map(|tally| tally.display_name.clone())
                    .unwrap_or_default(),
                position: index as i32 + 1,
            })
            .collect();

        info!(
            raffle_id = %raffle_id,
            winners = winners.len(),
            tickets = sold,
            "raffle drawn"
        );

        self.bus.broadcast(&RaffleCompleted {
            raffle_id,
            winners: winners.clone(),
        });

        Ok(winners)
    }

    /// Per-account win odds for the live odds display. Empty when no
    /// tickets have been sold.
    pub async fn get_odds(&self, raffle_id: RaffleId) -> Result<Vec<ParticipantOdds>, RaffleError> {
        if Raffle::find_by_id(raffle_id, &self.pool).await?.is_none() {
            return Err(RaffleError::NotFound);
        }

        let tallies = Ticket::tally_by_account(raffle_id, &self.pool).await?;
        let total: i64 = tallies.iter().map(|tally| tally.ticket_count).sum();
        if total == 0 {
            return Ok(vec![]);
        }

        let mut odds: Vec<ParticipantOdds> = tallies
            .into_iter()
            .map(|tally| ParticipantOdds {
                account_id: tally.account_id,
                display_name: tally.display_name,
                odds: tally.ticket_count as f64 / total as f64 * 100.0,
                ticket_count: tally.ticket_count,
            })
            .collect();
        odds.sort_by(|a, b| b.ticket_count.cmp(&a.ticket_count));
        Ok(odds)
    }

    /// One page of a raffle's tickets for the public ticker.
    pub async fn tickets_page(
        &self,
        raffle_id: RaffleId,
        args: PageArgs,
    ) -> Result<Paginated<TicketRow>, RaffleError> {
        if Raffle::find_by_id(raffle_id, &self.pool).await?.is_none() {
            return Err(RaffleError::NotFound);
        }

        let args = args.clamped();
        let total = Ticket::count_for_raffle(raffle_id, &self.pool).await?;
        let items = Ticket::page_for_raffle(raffle_id, args.limit, args.offset(), &self.pool)
            .await?;
        Ok(Paginated::new(items, total, args))
    }

    /// Every ticket an account holds across raffles, newest first.
    pub async fn account_tickets(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Ticket>, RaffleError> {
        Ok(Ticket::find_for_account(account_id, &self.pool).await?)
    }
}
