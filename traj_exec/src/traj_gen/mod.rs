//! # Trajectory generator module
//!
//! Each cycle the generator localises the vehicle on the global path, cuts a forward looking
//! window out of the path and, if a stop line lies inside that window, replaces the nominal
//! speeds with a braking profile that reaches zero before the stop line.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod decel;
pub mod loc;
mod params;
pub mod path_store;
mod state;
pub mod window;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use path_store::{PathStore, PathStoreError};
pub use state::*;

use util::kdtree::KdTreeError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors that can occur during trajectory generation.
#[derive(Debug, thiserror::Error)]
pub enum TrajGenError {
    #[error("No global path has been loaded yet")]
    NotReady,

    #[error("Received a global path with no waypoints")]
    EmptyPath,

    #[error("A global path is already loaded, the new one is ignored")]
    PathAlreadyLoaded,

    #[error("The global path contains an invalid waypoint: {0}")]
    InvalidPath(KdTreeError),

    #[error("Cannot localise from a pose with a non-finite position")]
    InvalidPose,

    #[error("Stop waypoint {0} is outside of the global path (length {1})")]
    StaleStop(i64, usize),
}
