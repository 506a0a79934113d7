//! # Messages
//!
//! All messages are serialised as JSON before being sent over the network. Inbound data (pose,
//! global path, traffic waypoint) is wrapped in an [`InputMsg`], outbound data is a [`TrajWindow`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod lane;
mod pose;
mod window;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use lane::*;
pub use pose::*;
pub use window::*;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Value of the traffic waypoint signal meaning "no stop line ahead".
pub const NO_STOP_WP: i64 = -1;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Common message header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Sequence number assigned by the publisher
    pub seq: u64,

    /// UTC time at which the data was produced
    #[serde(with = "ts_milliseconds")]
    pub stamp: DateTime<Utc>,

    /// Name of the coordinate frame the data is expressed in
    pub frame_id: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Messages that can be received by the trajectory generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputMsg {
    /// Latest pose of the vehicle
    Pose(Pose),

    /// The global path to follow
    Lane(Lane),

    /// Index of the waypoint at which the vehicle must stop, or [`NO_STOP_WP`]
    TrafficWaypoint(i64),

    /// Request that the generator shuts down
    Shutdown,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Header {
    /// Create a new header stamped with the current time.
    pub fn now(seq: u64, frame_id: &str) -> Self {
        Self {
            seq,
            stamp: Utc::now(),
            frame_id: frame_id.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_input_msg_json() {
        let msg: InputMsg = serde_json::from_str(r#"{"TrafficWaypoint": 42}"#).unwrap();
        assert_eq!(msg, InputMsg::TrafficWaypoint(42));

        let msg: InputMsg = serde_json::from_str(r#""Shutdown""#).unwrap();
        assert_eq!(msg, InputMsg::Shutdown);
    }
}
