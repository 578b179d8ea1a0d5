//! Presence roster and the periodic award producer.
//!
//! Viewers enter the roster when their join event arrives; every presence
//! interval the loop drains the roster and publishes one timer award per
//! viewer back onto the queue, where the ingestor credits it like any other
//! award. Draining doubles as join-bonus dedup: an account only earns a
//! join bonus once per interval because re-joins find the login already in
//! the set.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::common::Points;
use crate::kernel::{ActivityPublisher, AWARD_SUBJECT};

use super::events::{ActivityReason, AwardPoints};
use super::stream_status::StreamStatusProbe;

/// Logins seen since the last presence tick.
#[derive(Default)]
pub struct PresenceTracker {
    active: Mutex<HashSet<String>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a join. Returns true when this login is new since the last
    /// tick, i.e. the join bonus should be credited.
    pub fn mark_join(&self, login: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(login.to_string())
    }

    /// Take the roster and reset it for the next interval. Sorted so the
    /// publish order is stable.
    pub fn drain(&self) -> Vec<String> {
        let drained = std::mem::take(&mut *self.active.lock().unwrap_or_else(|e| e.into_inner()));
        let mut roster: Vec<String> = drained.into_iter().collect();
        roster.sort();
        roster
    }

    pub fn active_count(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

/// Periodic producer of `timer` awards for everyone on the roster.
pub struct PresenceLoop {
    tracker: Arc<PresenceTracker>,
    publisher: Arc<dyn ActivityPublisher>,
    probe: Arc<dyn StreamStatusProbe>,
    interval: Duration,
    online_award: Points,
    offline_award: Points,
}

impl PresenceLoop {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(600);

    /// Points per tick while the stream is live.
    pub const ONLINE_AWARD: Points = Points::from_whole(10);

    /// Points per tick while offline (lurkers in an offline chat).
    pub const OFFLINE_AWARD: Points = Points::from_whole(3);

    pub fn new(
        tracker: Arc<PresenceTracker>,
        publisher: Arc<dyn ActivityPublisher>,
        probe: Arc<dyn StreamStatusProbe>,
        interval: Duration,
    ) -> Self {
        Self {
            tracker,
            publisher,
            probe,
            interval,
            online_award: Self::ONLINE_AWARD,
            offline_award: Self::OFFLINE_AWARD,
        }
    }

    /// Run ticks forever. The first award round happens one full interval
    /// after startup, so nobody is credited for presence not yet observed.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately; swallow that first tick.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One award round: probe the stream, drain the roster, publish one
    /// timer award per login.
    pub async fn tick(&self) {
        let roster = self.tracker.drain();
        if roster.is_empty() {
            return;
        }

        let live = self.probe.is_live().await;
        let points = if live {
            self.online_award
        } else {
            self.offline_award
        };
        debug!(viewers = roster.len(), live, %points, "publishing presence awards");

        for login in roster {
            let award = AwardPoints {
                username: login.clone(),
                display_name: login,
                points,
                reason: ActivityReason::Timer,
            };
            let payload = match serde_json::to_vec(&award) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(error = %err, "failed to encode presence award");
                    continue;
                }
            };
            if let Err(err) = self
                .publisher
                .publish(AWARD_SUBJECT.to_string(), Bytes::from(payload))
                .await
            {
                warn!(error = %err, username = %award.username, "failed to publish presence award");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::activity::stream_status::FixedStatus;
    use crate::kernel::TestQueue;

    fn presence_loop(queue: Arc<TestQueue>, live: bool) -> (Arc<PresenceTracker>, PresenceLoop) {
        let tracker = Arc::new(PresenceTracker::new());
        let looper = PresenceLoop::new(
            tracker.clone(),
            queue,
            Arc::new(FixedStatus(live)),
            Duration::from_secs(600),
        );
        (tracker, looper)
    }

    #[test]
    fn test_mark_join_dedups_within_interval() {
        let tracker = PresenceTracker::new();
        assert!(tracker.mark_join("viewer"));
        assert!(!tracker.mark_join("viewer"));
        assert_eq!(tracker.active_count(), 1);
    }

    #[test]
    fn test_drain_resets_the_roster() {
        let tracker = PresenceTracker::new();
        tracker.mark_join("b");
        tracker.mark_join("a");

        assert_eq!(tracker.drain(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(tracker.active_count(), 0);

        // After a drain the same login earns a join bonus again.
        assert!(tracker.mark_join("a"));
    }

    #[tokio::test]
    async fn test_tick_publishes_online_rate_per_viewer() {
        let queue = Arc::new(TestQueue::new());
        let (tracker, looper) = presence_loop(queue.clone(), true);
        tracker.mark_join("viewer1");
        tracker.mark_join("viewer2");

        looper.tick().await;

        let published = queue.messages_for_subject(AWARD_SUBJECT);
        assert_eq!(published.len(), 2);
        let award: AwardPoints = queue.deserialize_message(&published[0]).unwrap();
        assert_eq!(award.points, PresenceLoop::ONLINE_AWARD);
        assert_eq!(award.reason, ActivityReason::Timer);
    }

    #[tokio::test]
    async fn test_tick_uses_offline_rate_when_not_live() {
        let queue = Arc::new(TestQueue::new());
        let (tracker, looper) = presence_loop(queue.clone(), false);
        tracker.mark_join("viewer");

        looper.tick().await;

        let published = queue.messages_for_subject(AWARD_SUBJECT);
        let award: AwardPoints = queue.deserialize_message(&published[0]).unwrap();
        assert_eq!(award.points, PresenceLoop::OFFLINE_AWARD);
    }

    #[tokio::test]
    async fn test_tick_with_empty_roster_publishes_nothing() {
        let queue = Arc::new(TestQueue::new());
        let (_tracker, looper) = presence_loop(queue.clone(), true);

        looper.tick().await;

        assert!(queue.published_messages().is_empty());
    }

    #[tokio::test]
    async fn test_roster_clears_after_tick() {
        let queue = Arc::new(TestQueue::new());
        let (tracker, looper) = presence_loop(queue.clone(), true);
        tracker.mark_join("viewer");

        looper.tick().await;
        looper.tick().await;

        // Only the first tick saw the viewer.
        assert_eq!(queue.publish_count_for(AWARD_SUBJECT), 1);
    }
}
