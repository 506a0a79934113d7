//! # Path store
//!
//! Holds the global path once it has been received, along with the spatial index built over its
//! waypoints. The path is frozen after the first load.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{UnitQuaternion, Vector2, Vector3};
use serde::Deserialize;
use std::path::Path;

use comms_if::msg::{Header, Lane, Pose, Waypoint};
use util::{host, kdtree::KdTree};

use super::TrajGenError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The global path, either not yet received or loaded and indexed.
#[derive(Debug, Clone)]
pub enum PathStore {
    Empty,
    Loaded(LoadedPath),
}

/// A global path with its spatial index.
#[derive(Debug, Clone)]
pub struct LoadedPath {
    lane: Lane,

    /// Index over the XY coordinates of the lane's waypoints
    index: KdTree,
}

/// One row of a path file: `x,y,z,yaw`.
#[derive(Debug, Deserialize)]
struct PathFileRow {
    x_m: f64,
    y_m: f64,
    z_m: f64,
    yaw_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors loading a path file.
#[derive(Debug, thiserror::Error)]
pub enum PathStoreError {
    #[error("The software root environment variable ({}) is not set", host::SW_ROOT_ENV_VAR)]
    SwRootNotSet,

    #[error("Could not read the path file: {0}")]
    ReadError(csv::Error),

    #[error("The path file contains no waypoints")]
    EmptyFile,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for PathStore {
    fn default() -> Self {
        PathStore::Empty
    }
}

impl PathStore {
    /// Load the global path and build its spatial index.
    ///
    /// Empty lanes are always rejected. Once a path is loaded any further lane is rejected with
    /// `PathAlreadyLoaded` and the store is left unchanged.
    pub fn load(&mut self, lane: Lane) -> Result<(), TrajGenError> {
        if lane.is_empty() {
            return Err(TrajGenError::EmptyPath);
        }

        if self.is_loaded() {
            return Err(TrajGenError::PathAlreadyLoaded);
        }

        let points: Vec<Vector2<f64>> = lane
            .waypoints
            .iter()
            .map(|wp| wp.pose.position2())
            .collect();

        let index = KdTree::build(&points).map_err(TrajGenError::InvalidPath)?;

        *self = PathStore::Loaded(LoadedPath { lane, index });

        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, PathStore::Loaded(_))
    }

    /// Get the loaded path, or `NotReady` if there isn't one yet.
    pub fn loaded(&self) -> Result<&LoadedPath, TrajGenError> {
        match self {
            PathStore::Loaded(p) => Ok(p),
            PathStore::Empty => Err(TrajGenError::NotReady),
        }
    }
}

impl LoadedPath {
    pub fn lane(&self) -> &Lane {
        &self.lane
    }

    pub fn header(&self) -> &Header {
        &self.lane.header
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.lane.waypoints
    }

    /// Number of waypoints in the path, never zero.
    pub fn len(&self) -> usize {
        self.lane.len()
    }

    /// XY position of the waypoint at `index`.
    pub fn point(&self, index: usize) -> Option<Vector2<f64>> {
        self.lane.waypoints.get(index).map(|wp| wp.pose.position2())
    }

    /// Index of the waypoint closest to `position`.
    pub fn nearest(&self, position: &Vector2<f64>) -> Result<usize, TrajGenError> {
        self.index.nearest(position).ok_or(TrajGenError::InvalidPose)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a lane from a path file relative to the software root.
///
/// Path files are headerless CSVs with one `x,y,z,yaw` row per waypoint. Every waypoint is given
/// the nominal speed `speed_ms`.
pub fn load_lane_csv<P: AsRef<Path>>(rel_path: P, speed_ms: f64) -> Result<Lane, PathStoreError> {
    let mut path = host::get_sw_root().map_err(|_| PathStoreError::SwRootNotSet)?;
    path.push(rel_path);

    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(&path)
        .map_err(PathStoreError::ReadError)?;

    lane_from_reader(reader, speed_ms)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn lane_from_reader<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    speed_ms: f64,
) -> Result<Lane, PathStoreError> {
    let mut waypoints = Vec::new();

    for row in reader.deserialize() {
        let row: PathFileRow = row.map_err(PathStoreError::ReadError)?;

        waypoints.push(Waypoint {
            pose: Pose {
                position_m: Vector3::new(row.x_m, row.y_m, row.z_m),
                attitude_q: UnitQuaternion::from_euler_angles(0.0, 0.0, row.yaw_rad),
            },
            speed_ms,
        });
    }

    if waypoints.is_empty() {
        return Err(PathStoreError::EmptyFile);
    }

    Ok(Lane {
        header: Header::now(0, "world"),
        waypoints,
    })
}
