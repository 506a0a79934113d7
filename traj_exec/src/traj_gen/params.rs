//! Parameters structure for TrajGen

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the trajectory generator.
///
/// Any field missing from the parameter file takes its default value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- WINDOW ----
    /// Maximum number of waypoints in the published window.
    pub lookahead_wps: usize,

    /// Rate at which the window is regenerated and published.
    ///
    /// Units: hertz
    pub cycle_frequency_hz: f64,

    // ---- BRAKING ----
    /// Deceleration used to build the braking profile.
    ///
    /// Units: meters/second^2
    pub max_decel_ms2: f64,

    /// Number of waypoints before the stop line at which the vehicle should be stationary, keeps
    /// the front of the vehicle behind the line.
    pub stop_margin_wps: usize,

    /// Braking speeds below this value are set to zero.
    ///
    /// Units: meters/second
    pub min_speed_snap_ms: f64,

    // ---- PATH SOURCE ----
    /// Where the global path comes from.
    pub path_source: PathSource,

    /// Nominal speed given to every waypoint loaded from a file.
    ///
    /// Units: meters/second
    pub file_path_speed_ms: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Sources of the global path.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum PathSource {
    /// The path arrives as an input message
    Network,

    /// The path is loaded from a CSV file, relative to the software root, at startup
    File(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("lookahead_wps must be at least 1")]
    ZeroLookahead,

    #[error("cycle_frequency_hz must be positive and finite, found {0}")]
    InvalidFrequency(f64),

    #[error("max_decel_ms2 must be positive and finite, found {0}")]
    InvalidDecel(f64),

    #[error("min_speed_snap_ms must be non-negative and finite, found {0}")]
    InvalidSnapSpeed(f64),

    #[error("file_path_speed_ms must be non-negative and finite, found {0}")]
    InvalidFileSpeed(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.lookahead_wps == 0 {
            return Err(ParamsError::ZeroLookahead);
        }
        if !(self.cycle_frequency_hz.is_finite() && self.cycle_frequency_hz > 0.0) {
            return Err(ParamsError::InvalidFrequency(self.cycle_frequency_hz));
        }
        if !(self.max_decel_ms2.is_finite() && self.max_decel_ms2 > 0.0) {
            return Err(ParamsError::InvalidDecel(self.max_decel_ms2));
        }
        if !(self.min_speed_snap_ms.is_finite() && self.min_speed_snap_ms >= 0.0) {
            return Err(ParamsError::InvalidSnapSpeed(self.min_speed_snap_ms));
        }
        if !(self.file_path_speed_ms.is_finite() && self.file_path_speed_ms >= 0.0) {
            return Err(ParamsError::InvalidFileSpeed(self.file_path_speed_ms));
        }

        Ok(())
    }

    /// Target period of one cycle in seconds.
    pub fn cycle_period_s(&self) -> f64 {
        1.0 / self.cycle_frequency_hz
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            lookahead_wps: 200,
            cycle_frequency_hz: 50.0,
            max_decel_ms2: 0.5,
            stop_margin_wps: 2,
            min_speed_snap_ms: 1.0,
            path_source: PathSource::Network,
            file_path_speed_ms: 10.0,
        }
    }
}
