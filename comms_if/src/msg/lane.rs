//! # Lane messages
//!
//! A [`Lane`] is the global path the vehicle follows, made of [`Waypoint`]s that each carry a
//! nominal target speed.

use serde::{Deserialize, Serialize};

use super::{Header, Pose};

/// A single point on the global path.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Pose of the waypoint in the map frame
    pub pose: Pose,

    /// Nominal target speed at this waypoint
    ///
    /// Units: meters/second
    pub speed_ms: f64,
}

/// An ordered sequence of waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub header: Header,
    pub waypoints: Vec<Waypoint>,
}

impl Waypoint {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64, speed_ms: f64) -> Self {
        Self {
            pose: Pose::from_xy_heading(x_m, y_m, heading_rad),
            speed_ms,
        }
    }
}

impl Lane {
    /// Number of waypoints in the lane
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}
