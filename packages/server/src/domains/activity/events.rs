//! Inbound wire payloads from the chat-side producer.
//!
//! Field names are camelCase to match the producer's JSON; the engine never
//! publishes `AwardPoints` for reasons other than `timer` (the presence
//! producer), but it must parse all three.

use serde::{Deserialize, Serialize};

use crate::common::Points;
use crate::domains::ledger::EntryReason;

/// Why an award was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityReason {
    /// Sent a chat message.
    Chat,
    /// Present at a presence tick.
    Timer,
    /// Joined the stream's chat.
    Join,
}

impl ActivityReason {
    /// The ledger reason recorded for this activity.
    pub fn entry_reason(self) -> EntryReason {
        match self {
            ActivityReason::Chat => EntryReason::ChatActivity,
            ActivityReason::Timer => EntryReason::PresenceTick,
            ActivityReason::Join => EntryReason::JoinBonus,
        }
    }

    /// Human-readable entry title.
    pub fn title(self) -> &'static str {
        match self {
            ActivityReason::Chat => "Chat activity",
            ActivityReason::Timer => "Watch time",
            ActivityReason::Join => "Join bonus",
        }
    }

    /// Verb phrase for entry descriptions ("Earned 0.10 points for ...").
    pub fn activity_label(self) -> &'static str {
        match self {
            ActivityReason::Chat => "chatting",
            ActivityReason::Timer => "watching the stream",
            ActivityReason::Join => "joining the stream",
        }
    }
}

/// A points award for one viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardPoints {
    pub username: String,
    pub display_name: String,
    pub points: Points,
    pub reason: ActivityReason,
}

/// Chat badge set as the platform reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Badges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcaster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber: Option<String>,
    #[serde(rename = "sub-gifter", skip_serializing_if = "Option::is_none")]
    pub sub_gifter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium: Option<String>,
}

/// Badge and cosmetics refresh for one viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeUpdate {
    pub username: String,
    #[serde(default)]
    pub badges: Badges,
    #[serde(default)]
    pub vip: bool,
    #[serde(default)]
    pub turbo: bool,
    #[serde(default)]
    pub color: Option<String>,
}
