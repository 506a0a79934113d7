//! # Pose message

use nalgebra::{UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// A position and attitude in the map frame.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// The position in the map frame
    pub position_m: Vector3<f64>,

    /// The attitude in the map frame. This is a quaternion that will rotate an object from the
    /// map frame into the body frame.
    pub attitude_q: UnitQuaternion<f64>,
}

impl Pose {
    /// Create a pose on the ground plane at the given position and heading.
    pub fn from_xy_heading(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector3::new(x_m, y_m, 0.0),
            attitude_q: UnitQuaternion::from_euler_angles(0.0, 0.0, heading_rad),
        }
    }

    /// Return the position projected onto the XY plane.
    pub fn position2(&self) -> Vector2<f64> {
        self.position_m.xy()
    }

    /// Return the heading (angle to the positive X axis) in radians, in the range [-pi, pi].
    pub fn get_heading(&self) -> f64 {
        self.attitude_q.euler_angles().2
    }
}
