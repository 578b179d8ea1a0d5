//! In-process notification bus for real-time fan-out.
//!
//! Domain services push events here after their transactions commit; the
//! WebSocket edge drains them to clients. Delivery is best-effort: a closed
//! or missing connection never fails the operation that emitted the event.
//!
//! # Usage
//!
//! Producers (domain services, post-commit):
//!   bus.notify(account_id, &PointsUpdate { points }).await;
//!   bus.broadcast(&CatalogUpdated { items });
//!
//! Consumers (socket handlers):
//!   let registration = bus.register(account_id).await;
//!   let global = bus.subscribe();

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, RwLock};

use crate::common::{AccountId, ConnectionId};

/// An event that can be pushed over the bus.
///
/// `channel` names the logical stream (e.g. `points_update`,
/// `giveaway:<raffle-id>`); `payload` is the JSON the client receives.
pub trait BusEvent: Sync {
    fn channel(&self) -> String;
    fn payload(&self) -> serde_json::Value;
}

/// A materialized event as it travels through channels.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    pub channel: String,
    pub payload: serde_json::Value,
}

impl BusMessage {
    fn from_event(event: &dyn BusEvent) -> Self {
        BusMessage {
            channel: event.channel(),
            payload: event.payload(),
        }
    }
}

/// Handed back from [`NotificationBus::register`]. Holds the receiving end
/// of the account's private message stream plus the token needed to
/// unregister it later.
pub struct Registration {
    pub connection_id: ConnectionId,
    pub receiver: mpsc::UnboundedReceiver<BusMessage>,
}

/// Thread-safe fan-out hub with one slot per account plus a global firehose.
///
/// Each account holds at most one live connection; registering again
/// replaces the previous connection (the old receiver closes). Broadcast
/// events go to every subscriber of the global channel regardless of
/// account registrations.
pub struct NotificationBus {
    connections: RwLock<HashMap<AccountId, (ConnectionId, mpsc::UnboundedSender<BusMessage>)>>,
    broadcast: broadcast::Sender<BusMessage>,
}

impl NotificationBus {
    /// Create a bus with default broadcast capacity (256 buffered messages).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            broadcast: broadcast::channel(capacity).0,
        }
    }

    /// Attach a connection for an account. Latest wins: any previous
    /// connection for the same account is dropped and its receiver closes.
    pub async fn register(&self, account_id: AccountId) -> Registration {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = ConnectionId::new();
        self.connections
            .write()
            .await
            .insert(account_id, (connection_id, tx));
        Registration {
            connection_id,
            receiver: rx,
        }
    }

    /// Detach a connection. Guarded by connection ID so that a stale
    /// disconnect arriving after a reconnect cannot evict the newer
    /// connection.
    pub async fn unregister(&self, account_id: AccountId, connection_id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if let Some((current, _)) = connections.get(&account_id) {
            if *current == connection_id {
                connections.remove(&account_id);
            }
        }
    }

    /// Push an event to one account's connection. No-op if the account has
    /// no live connection or its receiver is gone.
    pub async fn notify(&self, account_id: AccountId, event: &dyn BusEvent) {
        let connections = self.connections.read().await;
        if let Some((_, tx)) = connections.get(&account_id) {
            // Ignore send errors (receiver dropped mid-flight)
            let _ = tx.send(BusMessage::from_event(event));
        }
    }

    /// Push an event to every global subscriber. No-op with no subscribers.
    pub fn broadcast(&self, event: &dyn BusEvent) {
        let _ = self.broadcast.send(BusMessage::from_event(event));
    }

    /// Subscribe to the global firehose (catalog, ticket and raffle events).
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.broadcast.subscribe()
    }

    /// Whether an account currently holds a live connection.
    pub async fn is_connected(&self, account_id: AccountId) -> bool {
        self.connections.read().await.contains_key(&account_id)
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestEvent {
        channel: &'static str,
        body: serde_json::Value,
    }

    impl BusEvent for TestEvent {
        fn channel(&self) -> String {
            self.channel.to_string()
        }

        fn payload(&self) -> serde_json::Value {
            self.body.clone()
        }
    }

    fn ping() -> TestEvent {
        TestEvent {
            channel: "ping",
            body: serde_json::json!({"type": "ping"}),
        }
    }

    #[tokio::test]
    async fn test_notify_reaches_registered_connection() {
        let bus = NotificationBus::new();
        let account_id = AccountId::new();
        let mut registration = bus.register(account_id).await;

        bus.notify(account_id, &ping()).await;

        let message = registration.receiver.recv().await.unwrap();
        assert_eq!(message.channel, "ping");
        assert_eq!(message.payload, serde_json::json!({"type": "ping"}));
    }

    #[tokio::test]
    async fn test_notify_without_connection_is_noop() {
        let bus = NotificationBus::new();
        // Should not panic or block
        bus.notify(AccountId::new(), &ping()).await;
    }

    #[tokio::test]
    async fn test_register_replaces_previous_connection() {
        let bus = NotificationBus::new();
        let account_id = AccountId::new();

        let mut first = bus.register(account_id).await;
        let mut second = bus.register(account_id).await;

        bus.notify(account_id, &ping()).await;

        // Only the latest connection receives; the replaced one is closed.
        assert_eq!(second.receiver.recv().await.unwrap().channel, "ping");
        assert!(first.receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stale_unregister_keeps_newer_connection() {
        let bus = NotificationBus::new();
        let account_id = AccountId::new();

        let first = bus.register(account_id).await;
        let mut second = bus.register(account_id).await;

        // Disconnect for the replaced connection arrives late.
        bus.unregister(account_id, first.connection_id).await;
        assert!(bus.is_connected(account_id).await);

        bus.notify(account_id, &ping()).await;
        assert_eq!(second.receiver.recv().await.unwrap().channel, "ping");

        bus.unregister(account_id, second.connection_id).await;
        assert!(!bus.is_connected(account_id).await);
    }

    #[tokio::test]
    async fn test_notify_after_unregister_is_dropped() {
        let bus = NotificationBus::new();
        let account_id = AccountId::new();

        let mut registration = bus.register(account_id).await;
        bus.unregister(account_id, registration.connection_id).await;

        bus.notify(account_id, &ping()).await;
        assert!(registration.receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let bus = NotificationBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.broadcast(&ping());

        assert_eq!(rx1.recv().await.unwrap().channel, "ping");
        assert_eq!(rx2.recv().await.unwrap().channel, "ping");
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers_is_noop() {
        let bus = NotificationBus::new();
        bus.broadcast(&ping());
    }
}
