//! Activity domain - queue ingestion and the presence award producer.

pub mod events;
pub mod ingestor;
pub mod presence;
pub mod stream_status;

pub use events::{ActivityReason, AwardPoints, BadgeUpdate, Badges};
pub use ingestor::ActivityIngestor;
pub use presence::{PresenceLoop, PresenceTracker};
pub use stream_status::{FixedStatus, HelixStatusProbe, StreamStatusProbe};
