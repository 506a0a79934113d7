//! # Deceleration profiler
//!
//! When a stop line falls inside the window the nominal speeds are capped by the speed from which
//! the vehicle can still stop, at the configured deceleration, before reaching the stop line.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::{ProfileState, Waypoint, WindowPoint, NO_STOP_WP};
use util::maths::stopping_speed;

use super::{Params, TrajGenError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A request to stop at a waypoint of the global path.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StopRequest {
    None,
    At(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for StopRequest {
    fn default() -> Self {
        StopRequest::None
    }
}

impl StopRequest {
    /// Interpret a raw traffic waypoint value for a path of `path_len` waypoints.
    ///
    /// [`NO_STOP_WP`] means no stop. Any other value outside of the path is a `StaleStop`.
    pub fn from_raw(raw: i64, path_len: usize) -> Result<Self, TrajGenError> {
        if raw == NO_STOP_WP {
            return Ok(StopRequest::None);
        }

        if raw < 0 || raw as u64 >= path_len as u64 {
            return Err(TrajGenError::StaleStop(raw, path_len));
        }

        Ok(StopRequest::At(raw as usize))
    }

    /// Index of the stop waypoint, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            StopRequest::None => None,
            StopRequest::At(i) => Some(*i),
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Assign the effective speed of each waypoint in `window`, whose first waypoint is at `start`
/// in the global path.
///
/// Without a stop inside the window the nominal speeds are used unchanged (`Cruise`). Otherwise
/// (`Braking`) the speeds are non-increasing from the first waypoint the braking cap applies to,
/// and are zero from `stop - stop_margin_wps` onwards.
pub fn profile(
    window: &[Waypoint],
    start: usize,
    stop: StopRequest,
    params: &Params,
) -> (ProfileState, Vec<WindowPoint>) {
    let stop_idx = match stop {
        StopRequest::At(i) if i < start.saturating_add(window.len()) => i,
        _ => return (ProfileState::Cruise, cruise(window)),
    };

    // A stop already behind the vehicle holds it stationary
    let local_stop = stop_idx
        .saturating_sub(start)
        .saturating_sub(params.stop_margin_wps);

    let dists = dists_to_stop(window, local_stop);

    let mut points = Vec::with_capacity(window.len());
    let mut capped = false;
    let mut prev_speed_ms = std::f64::INFINITY;

    for (wp, dist_m) in window.iter().zip(dists) {
        let mut braking_ms = stopping_speed(params.max_decel_ms2, dist_m);
        if braking_ms < params.min_speed_snap_ms {
            braking_ms = 0.0;
        }

        let mut speed_ms = braking_ms.min(wp.speed_ms);

        // Once braking has begun a higher nominal speed further on can't raise the target again
        if braking_ms < wp.speed_ms {
            capped = true;
        }
        if capped {
            speed_ms = speed_ms.min(prev_speed_ms);
        }

        prev_speed_ms = speed_ms;
        points.push(WindowPoint {
            waypoint: *wp,
            speed_ms,
        });
    }

    (ProfileState::Braking, points)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn cruise(window: &[Waypoint]) -> Vec<WindowPoint> {
    window
        .iter()
        .map(|wp| WindowPoint {
            waypoint: *wp,
            speed_ms: wp.speed_ms,
        })
        .collect()
}

/// Distance along the window from each waypoint to the waypoint at `local_stop`, zero for
/// waypoints at or past it.
fn dists_to_stop(window: &[Waypoint], local_stop: usize) -> Vec<f64> {
    let mut dists = vec![0.0; window.len()];
    let end = local_stop.min(window.len().saturating_sub(1));

    for i in (0..end).rev() {
        let seg_m = (window[i + 1].pose.position_m - window[i].pose.position_m).norm();
        dists[i] = dists[i + 1] + seg_m;
    }

    dists
}

#[cfg(test)]
mod test {
    use super::*;

    fn straight(n: usize, spacing_m: f64, speed_ms: f64) -> Vec<Waypoint> {
        (0..n)
            .map(|i| Waypoint::new(i as f64 * spacing_m, 0.0, 0.0, speed_ms))
            .collect()
    }

    fn speeds(points: &[WindowPoint]) -> Vec<f64> {
        points.iter().map(|p| p.speed_ms).collect()
    }

    #[test]
    fn test_stop_request_from_raw() {
        assert_eq!(StopRequest::from_raw(-1, 10).unwrap(), StopRequest::None);
        assert_eq!(StopRequest::from_raw(0, 10).unwrap(), StopRequest::At(0));
        assert_eq!(StopRequest::from_raw(9, 10).unwrap(), StopRequest::At(9));
        assert!(matches!(
            StopRequest::from_raw(10, 10),
            Err(TrajGenError::StaleStop(10, 10))
        ));
        assert!(matches!(
            StopRequest::from_raw(-5, 10),
            Err(TrajGenError::StaleStop(-5, 10))
        ));
    }

    #[test]
    fn test_no_stop_is_cruise() {
        let wps = straight(20, 1.0, 7.5);
        let (state, points) = profile(&wps, 0, StopRequest::None, &Params::default());

        assert_eq!(state, ProfileState::Cruise);
        assert_eq!(points.len(), wps.len());
        for (p, wp) in points.iter().zip(wps.iter()) {
            assert_eq!(p.speed_ms, wp.speed_ms);
            assert_eq!(p.waypoint, *wp);
        }
    }

    #[test]
    fn test_stop_beyond_window_is_cruise() {
        let wps = straight(20, 1.0, 7.5);

        // Window starts at 100 and covers 100..120
        let (state, points) = profile(&wps, 100, StopRequest::At(120), &Params::default());
        assert_eq!(state, ProfileState::Cruise);
        assert!(speeds(&points).iter().all(|&s| s == 7.5));

        let (state, _) = profile(&wps, 100, StopRequest::At(119), &Params::default());
        assert_eq!(state, ProfileState::Braking);
    }

    #[test]
    fn test_braking_profile() {
        let params = Params::default();
        let wps = straight(60, 1.0, 10.0);
        let start = 100;
        let stop = 140;

        let (state, points) = profile(&wps, start, StopRequest::At(stop), &params);
        let speeds = speeds(&points);

        assert_eq!(state, ProfileState::Braking);
        assert_eq!(speeds.len(), 60);

        // Non-increasing throughout
        for pair in speeds.windows(2) {
            assert!(pair[1] <= pair[0], "Speeds increase: {:?}", pair);
        }

        // Zero from the stop margin onwards
        let zero_from = stop - start - params.stop_margin_wps;
        assert!(speeds[zero_from..].iter().all(|&s| s == 0.0));

        // Never above nominal
        assert!(speeds.iter().zip(wps.iter()).all(|(s, wp)| *s <= wp.speed_ms));

        // 38 m from the stop at 0.5 m/s^2 is slower than the nominal speed
        assert!((speeds[0] - (2.0f64 * 0.5 * 38.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_snap_to_zero() {
        let params = Params::default();
        let wps = straight(10, 0.5, 10.0);

        // local stop at 6, the point 0.5 m before it would get sqrt(0.5) < 1 m/s
        let (_, points) = profile(&wps, 0, StopRequest::At(8), &params);
        let speeds = speeds(&points);

        assert_eq!(speeds[5], 0.0);
        assert!((speeds[4] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_braking_speed_limited_by_nominal() {
        let params = Params::default();

        // 8 m between the first point and the local stop
        let mut wps = vec![
            Waypoint::new(0.0, 0.0, 0.0, 5.0),
            Waypoint::new(8.0, 0.0, 0.0, 5.0),
            Waypoint::new(9.0, 0.0, 0.0, 5.0),
            Waypoint::new(10.0, 0.0, 0.0, 5.0),
        ];

        let (_, points) = profile(&wps, 0, StopRequest::At(3), &params);
        assert!((points[0].speed_ms - 2.8284271247).abs() < 1e-9);

        wps[0].speed_ms = 2.0;
        let (_, points) = profile(&wps, 0, StopRequest::At(3), &params);
        assert_eq!(points[0].speed_ms, 2.0);
    }

    #[test]
    fn test_stop_behind_vehicle() {
        let wps = straight(10, 1.0, 5.0);
        let (state, points) = profile(&wps, 50, StopRequest::At(45), &Params::default());

        assert_eq!(state, ProfileState::Braking);
        assert!(speeds(&points).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_varying_nominal_speed() {
        let params = Params::default();
        let mut wps = straight(40, 1.0, 10.0);

        // A slow section partway along, then fast again
        for wp in wps.iter_mut().skip(5).take(3) {
            wp.speed_ms = 1.5;
        }

        let (_, points) = profile(&wps, 0, StopRequest::At(30), &params);
        let speeds = speeds(&points);

        let first_capped = speeds
            .iter()
            .zip(wps.iter())
            .position(|(s, wp)| *s < wp.speed_ms)
            .unwrap();

        for pair in speeds[first_capped..].windows(2) {
            assert!(pair[1] <= pair[0]);
        }
        assert!(speeds.iter().zip(wps.iter()).all(|(s, wp)| *s <= wp.speed_ms));
    }

    #[test]
    fn test_empty_window() {
        // Braking needs the stop before start + len, and stop 5 is not before 5 + 0
        let (state, points) = profile(&[], 5, StopRequest::At(5), &Params::default());
        assert_eq!(state, ProfileState::Cruise);
        assert!(points.is_empty());
    }
}
