//! Seeded winner selection.
//!
//! The draw is a pure function of the ticket tallies and a 32-byte seed:
//! a ChaCha8 stream cipher RNG seeded from the recorded bytes replays the
//! exact selection at any later time. The seed itself comes from the OS
//! entropy source at draw time and is stored hex-encoded on the raffle, so
//! a disputed draw can be re-run from the audit record.

use rand::rngs::OsRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::common::AccountId;

use super::models::TicketTally;

/// Seed length in bytes (hex-encodes to 64 characters).
pub const SEED_LEN: usize = 32;

/// Draw a fresh seed from OS entropy.
pub fn random_seed() -> [u8; SEED_LEN] {
    let mut seed = [0u8; SEED_LEN];
    OsRng.fill_bytes(&mut seed);
    seed
}

/// Decode a stored hex seed back into bytes for replay.
pub fn decode_seed(hex_seed: &str) -> anyhow::Result<[u8; SEED_LEN]> {
    let bytes = hex::decode(hex_seed)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("Draw seed must be {} bytes, got {}", SEED_LEN, len))
}

/// Select up to `winner_count` distinct accounts, weighted by ticket count,
/// sampling without replacement.
///
/// Each round picks one account with probability proportional to its
/// remaining tickets, then removes all of that account's tickets from the
/// pool, so no account wins twice. When fewer accounts hold tickets than
/// `winner_count`, every holder wins and the result is short.
///
/// Determinism contract: identical `tallies` (same order, which
/// [`Ticket::tally_by_account`] guarantees by sorting on account ID) and an
/// identical seed produce identical winners.
///
/// [`Ticket::tally_by_account`]: super::models::Ticket::tally_by_account
pub fn select_winners(
    tallies: &[TicketTally],
    winner_count: usize,
    seed: [u8; SEED_LEN],
) -> Vec<AccountId> {
    let mut rng = ChaCha8Rng::from_seed(seed);

    let mut remaining: Vec<(AccountId, i64)> = tallies
        .iter()
        .filter(|tally| tally.ticket_count > 0)
        .map(|tally| (tally.account_id, tally.ticket_count))
        .collect();
    let mut total: i64 = remaining.iter().map(|(_, weight)| weight).sum();

    let mut winners = Vec::with_capacity(winner_count.min(remaining.len()));
    while winners.len() < winner_count && total > 0 {
        let mut pick = rng.gen_range(0..total);

        // Walk the cumulative weights; the final bucket absorbs any residue.
        let mut index = 0;
        while index + 1 < remaining.len() && pick >= remaining[index].1 {
            pick -= remaining[index].1;
            index += 1;
        }

        let (account_id, weight) = remaining.remove(index);
        total -= weight;
        winners.push(account_id);
    }
    winners
}
