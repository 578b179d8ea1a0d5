//! Raffle events pushed over the notification bus.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::common::{AccountId, RaffleId, TicketId};
use crate::kernel::BusEvent;

use super::models::RaffleWinner;

/// One ticket as it appears in a `giveaway_update` batch.
#[derive(Debug, Clone, Serialize)]
pub struct TicketCreated {
    pub id: TicketId,
    pub hash: String,
    pub account_id: AccountId,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// Broadcast once per purchase carrying every ticket minted in the batch.
///
/// The payload field is `ticket` (singular) holding the array; live ticker
/// clients already parse that shape.
#[derive(Debug, Clone)]
pub struct TicketBatchCreated {
    pub tickets: Vec<TicketCreated>,
}

impl BusEvent for TicketBatchCreated {
    fn channel(&self) -> String {
        "giveaway_update".to_string()
    }

    fn payload(&self) -> serde_json::Value {
        json!({
            "type": "ticket_created",
            "ticket": self.tickets,
        })
    }
}

/// Broadcast on the raffle's own channel when the draw commits.
#[derive(Debug, Clone)]
pub struct RaffleCompleted {
    pub raffle_id: RaffleId,
    pub winners: Vec<RaffleWinner>,
}

impl BusEvent for RaffleCompleted {
    fn channel(&self) -> String {
        format!("giveaway:{}", self.raffle_id)
    }

    fn payload(&self) -> serde_json::Value {
        json!({
            "type": "giveaway_complete",
            "winners": self.winners,
        })
    }
}
