//! # Data Store

use log::{debug, info, warn};

use comms_if::msg::{InputMsg, TrajWindow};

use crate::traj_gen::{self, TrajGenError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of consecutive TrajGen errors after which each further error is only logged at debug
/// level, to avoid flooding the log while the inputs are bad.
const MAX_LOGGED_TRAJ_GEN_ERRORS: u64 = 10;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Session elapsed time
    pub sim_time_s: f64,

    /// Set when the executable should stop at the end of this cycle's input acquisition
    pub shutdown: bool,

    // TrajGen
    pub traj_gen_input: traj_gen::InputData,
    pub traj_gen_status_rpt: traj_gen::StatusReport,

    /// Last window generated without error, republished when a cycle fails
    pub traj_window: Option<TrajWindow>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of consecutive TrajGen processing errors
    pub num_consec_traj_gen_errors: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        let cycles_per_s = (cycle_frequency_hz.round() as u128).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_s == 0;

        self.traj_gen_input = traj_gen::InputData::default();
        self.traj_gen_status_rpt = traj_gen::StatusReport::default();

        self.sim_time_s = util::session::get_elapsed_seconds();
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        self.num_cycles += 1;
    }

    /// Store the result of this cycle's TrajGen processing.
    ///
    /// A new window replaces the published one. On error the error is logged and the last good
    /// window is kept, so it is published again this cycle.
    pub fn apply_traj_gen_result(
        &mut self,
        result: Result<(traj_gen::OutputData, traj_gen::StatusReport), TrajGenError>,
    ) {
        match result {
            Ok((o, r)) => {
                if let Some(w) = o.window {
                    self.traj_window = Some(w);
                }
                self.traj_gen_status_rpt = r;
                self.num_consec_traj_gen_errors = 0;
            }
            Err(e) => {
                self.num_consec_traj_gen_errors += 1;

                if self.num_consec_traj_gen_errors <= MAX_LOGGED_TRAJ_GEN_ERRORS {
                    warn!("Error during TrajGen processing: {}", e);
                } else {
                    debug!("Error during TrajGen processing: {}", e);
                }
            }
        }
    }

    /// Apply a message read from an input script to this cycle's inputs.
    pub fn apply_input_msg(&mut self, msg: InputMsg) {
        match msg {
            InputMsg::Pose(p) => self.traj_gen_input.pose = Some(p),
            InputMsg::Lane(l) => self.traj_gen_input.lane = Some(l),
            InputMsg::TrafficWaypoint(wp) => self.traj_gen_input.traffic_wp = Some(wp),
            InputMsg::Shutdown => {
                info!("Shutdown requested by script");
                self.shutdown = true
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};
    use comms_if::msg::{Header, Pose, ProfileState, Waypoint, WindowPoint};

    fn window(closest_idx: usize) -> TrajWindow {
        let waypoint = Waypoint::new(closest_idx as f64, 0.0, 0.0, 3.0);
        TrajWindow {
            header: Header {
                seq: 1,
                stamp: Utc.timestamp_millis(0),
                frame_id: "world".into(),
            },
            closest_idx,
            profile: ProfileState::Cruise,
            points: vec![WindowPoint {
                waypoint,
                speed_ms: 3.0,
            }],
        }
    }

    fn good_tick(
        closest_idx: usize,
    ) -> Result<(traj_gen::OutputData, traj_gen::StatusReport), TrajGenError> {
        Ok((
            traj_gen::OutputData {
                window: Some(window(closest_idx)),
            },
            traj_gen::StatusReport {
                closest_idx: Some(closest_idx),
                window_len: 1,
                ..Default::default()
            },
        ))
    }

    #[test]
    fn test_failed_tick_keeps_last_window() {
        let mut ds = DataStore::default();

        ds.apply_traj_gen_result(good_tick(4));
        assert_eq!(ds.traj_window, Some(window(4)));
        assert_eq!(ds.num_consec_traj_gen_errors, 0);

        ds.apply_traj_gen_result(Err(TrajGenError::InvalidPose));
        assert_eq!(ds.traj_window, Some(window(4)));
        assert_eq!(ds.num_consec_traj_gen_errors, 1);

        ds.apply_traj_gen_result(Err(TrajGenError::NotReady));
        assert_eq!(ds.traj_window, Some(window(4)));
        assert_eq!(ds.num_consec_traj_gen_errors, 2);

        // A good tick replaces the window and resets the count
        ds.apply_traj_gen_result(good_tick(5));
        assert_eq!(ds.traj_window, Some(window(5)));
        assert_eq!(ds.num_consec_traj_gen_errors, 0);
    }

    #[test]
    fn test_waiting_tick_keeps_last_window() {
        let mut ds = DataStore::default();
        ds.apply_traj_gen_result(good_tick(2));

        ds.apply_traj_gen_result(Ok((
            traj_gen::OutputData::default(),
            traj_gen::StatusReport::default(),
        )));
        assert_eq!(ds.traj_window, Some(window(2)));
    }

    #[test]
    fn test_cycle_flags() {
        let mut ds = DataStore::default();

        let mut one_hz = vec![];
        for _ in 0..120 {
            ds.cycle_start(50.0);
            one_hz.push(ds.is_1_hz_cycle);
            ds.cycle_end();
        }

        assert_eq!(one_hz.iter().filter(|&&b| b).count(), 3);
        assert!(one_hz[0] && one_hz[50] && one_hz[100]);

        // Slower than 1Hz, every cycle is a 1Hz cycle
        ds.cycle_start(0.5);
        assert!(ds.is_1_hz_cycle);
    }

    #[test]
    fn test_apply_input_msg() {
        let mut ds = DataStore::default();
        ds.cycle_start(50.0);

        ds.apply_input_msg(InputMsg::Pose(Pose::from_xy_heading(1.0, 0.0, 0.0)));
        ds.apply_input_msg(InputMsg::TrafficWaypoint(4));
        assert!(ds.traj_gen_input.pose.is_some());
        assert_eq!(ds.traj_gen_input.traffic_wp, Some(4));
        assert!(!ds.shutdown);

        ds.apply_input_msg(InputMsg::Shutdown);
        assert!(ds.shutdown);

        // Inputs are cleared each cycle
        ds.cycle_start(50.0);
        assert!(ds.traj_gen_input.pose.is_none());
    }
}
