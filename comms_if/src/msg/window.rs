//! # Trajectory window message

use serde::{Deserialize, Serialize};

use super::{Header, Waypoint};

/// The forward looking section of the global path published each cycle, with the speeds the
/// vehicle should actually target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajWindow {
    /// Header of the global path this window was cut from
    pub header: Header,

    /// Index in the global path of the first point in the window, i.e. the closest waypoint
    /// ahead of the vehicle.
    pub closest_idx: usize,

    /// Whether the speeds in the window come from the path or from a braking profile
    pub profile: ProfileState,

    /// Points in the window, in path order
    pub points: Vec<WindowPoint>,
}

/// A waypoint in the window along with its effective target speed.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowPoint {
    pub waypoint: Waypoint,

    /// Speed the vehicle should target at this point. Never greater than the waypoint's nominal
    /// speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,
}

/// Speed profile states.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileState {
    /// No stop in view, nominal speeds are used
    Cruise,

    /// Decelerating towards a stop inside the window
    Braking,
}

impl Default for ProfileState {
    fn default() -> Self {
        ProfileState::Cruise
    }
}

impl TrajWindow {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterator over the effective speeds in the window
    pub fn speeds(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.speed_ms)
    }
}
