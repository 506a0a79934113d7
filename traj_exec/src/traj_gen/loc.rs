//! Localisation of the vehicle on the global path

use nalgebra::Vector2;

use util::maths::{next_index, prev_index};

use super::{PathStore, TrajGenError};

/// Return the index of the closest waypoint that is ahead of `position`.
///
/// The nearest waypoint is found first. If the vehicle has already passed it, i.e. the vehicle
/// is on the far side of the plane through the waypoint normal to the segment arriving at it,
/// the following waypoint is used instead. The path is treated as a loop here, so the waypoint
/// before the first is the last one, and the one after the last is the first.
pub fn localise(store: &PathStore, position: &Vector2<f64>) -> Result<usize, TrajGenError> {
    let path = store.loaded()?;
    let len = path.len();

    let closest = path.nearest(position)?;

    let (c, p) = match (path.point(closest), path.point(prev_index(closest, len))) {
        (Some(c), Some(p)) => (c, p),
        _ => return Err(TrajGenError::NotReady),
    };

    if (c - p).dot(&(position - c)) > 0.0 {
        Ok(next_index(closest, len))
    } else {
        Ok(closest)
    }
}
