//! Ledger events pushed over the notification bus.

use serde_json::json;

use crate::common::Points;
use crate::kernel::BusEvent;

/// Balance push delivered to one account's connection after every committed
/// mutation. Carries the full new balance rather than the delta so a client
/// that missed a message still converges.
#[derive(Debug, Clone)]
pub struct PointsUpdate {
    pub points: Points,
}

impl BusEvent for PointsUpdate {
    fn channel(&self) -> String {
        "points_update".to_string()
    }

    fn payload(&self) -> serde_json::Value {
        json!({
            "type": "points_update",
            "points": self.points,
        })
    }
}
