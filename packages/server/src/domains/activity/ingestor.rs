//! Queue consumer that turns activity events into ledger credits.
//!
//! Delivery from the queue is at-least-once, and awards carry no
//! idempotency key: a redelivered chat award credits again. The amounts
//! involved are fractions of a point on a periodic schedule, so the
//! bounded over-credit is accepted rather than tracking seen-message state.
//! Join bonuses are the exception: the presence roster dedups them within
//! an interval.
//!
//! Failure handling is per-message. Malformed payloads and unknown logins
//! are dropped with a log line; only transient storage errors are retried,
//! a bounded number of times, before the message is dropped too.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};

use crate::domains::ledger::models::Account;
use crate::domains::ledger::{LedgerError, LedgerService};
use crate::kernel::{ActivityQueue, QueueMessage, AWARD_SUBJECT, BADGE_SUBJECT};

use super::events::{ActivityReason, AwardPoints, BadgeUpdate};
use super::presence::PresenceTracker;

const CREDIT_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

pub struct ActivityIngestor {
    queue: Arc<dyn ActivityQueue>,
    ledger: Arc<LedgerService>,
    pool: PgPool,
    presence: Arc<PresenceTracker>,
}

impl ActivityIngestor {
    pub fn new(
        queue: Arc<dyn ActivityQueue>,
        ledger: Arc<LedgerService>,
        pool: PgPool,
        presence: Arc<PresenceTracker>,
    ) -> Self {
        Self {
            queue,
            ledger,
            pool,
            presence,
        }
    }

    /// Consume the activity stream until it closes.
    pub async fn run(&self) -> Result<()> {
        let mut stream = self
            .queue
            .subscribe()
            .await
            .context("Failed to subscribe to the activity queue")?;
        info!("activity ingestor started");

        while let Some(message) = stream.next().await {
            self.dispatch(message).await;
        }

        info!("activity stream closed");
        Ok(())
    }

    async fn dispatch(&self, message: QueueMessage) {
        match message.subject.as_str() {
            AWARD_SUBJECT => match serde_json::from_slice::<AwardPoints>(&message.payload) {
                Ok(award) => self.handle_award(award).await,
                Err(err) => warn!(error = %err, "dropping malformed award payload"),
            },
            BADGE_SUBJECT => match serde_json::from_slice::<BadgeUpdate>(&message.payload) {
                Ok(update) => self.handle_badges(update).await,
                Err(err) => warn!(error = %err, "dropping malformed badge payload"),
            },
            other => debug!(subject = other, "ignoring message on unexpected subject"),
        }
    }

    /// Apply one award. Public for tests and for direct (non-queue) use.
    pub async fn handle_award(&self, award: AwardPoints) {
        if !award.points.is_positive() {
            warn!(
                username = %award.username,
                points = %award.points,
                "dropping non-positive award"
            );
            return;
        }

        // Joins feed the presence roster and are deduped against it: the
        // bonus only lands for the first join since the last presence tick.
        if award.reason == ActivityReason::Join && !self.presence.mark_join(&award.username) {
            debug!(username = %award.username, "join bonus already granted this interval");
            return;
        }

        for attempt in 1..=CREDIT_ATTEMPTS {
            match self.apply_award(&award).await {
                Ok(()) => return,
                Err(LedgerError::Unavailable(err)) if attempt < CREDIT_ATTEMPTS => {
                    warn!(
                        attempt,
                        error = %err,
                        username = %award.username,
                        "ledger unavailable, retrying award"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(LedgerError::Unavailable(err)) => {
                    error!(
                        error = %err,
                        username = %award.username,
                        "dropping award after {CREDIT_ATTEMPTS} attempts"
                    );
                    return;
                }
                Err(err) => {
                    // Business rejections are final; retrying cannot help.
                    warn!(error = %err, username = %award.username, "award rejected");
                    return;
                }
            }
        }
    }

    async fn apply_award(&self, award: &AwardPoints) -> Result<(), LedgerError> {
        let Some(account) = Account::find_by_login(&award.username, &self.pool).await? else {
            // Accounts are only created through the web login flow; chat
            // activity from viewers without one is expected noise.
            debug!(username = %award.username, "no account for login, dropping award");
            return Ok(());
        };

        let description = format!(
            "Earned {} points for {}",
            award.points,
            award.reason.activity_label()
        );
        self.ledger
            .credit(
                account.id,
                award.points,
                award.reason.entry_reason(),
                award.reason.title(),
                Some(&description),
            )
            .await?;
        Ok(())
    }

    /// Persist a badge refresh. Unknown logins are dropped.
    pub async fn handle_badges(&self, update: BadgeUpdate) {
        let badges = match serde_json::to_value(&update.badges) {
            Ok(badges) => badges,
            Err(err) => {
                warn!(error = %err, "failed to encode badge set");
                return;
            }
        };

        match Account::update_badges(
            &update.username,
            &badges,
            update.vip,
            update.turbo,
            update.color.as_deref(),
            &self.pool,
        )
        .await
        {
            Ok(Some(_)) => debug!(username = %update.username, "badge metadata updated"),
            Ok(None) => debug!(username = %update.username, "no account for badge update"),
            Err(err) => warn!(error = %err, username = %update.username, "badge update failed"),
        }
    }
}
