//! Kernel module - server infrastructure and dependencies.

pub mod bus;
pub mod queue;

pub use bus::{BusEvent, BusMessage, NotificationBus, Registration};
pub use queue::{
    ActivityPublisher, ActivityQueue, MessageStream, NatsActivityQueue, PublishedMessage,
    QueueMessage, TestQueue, AWARD_SUBJECT, BADGE_SUBJECT, QUEUE_GROUP,
};
