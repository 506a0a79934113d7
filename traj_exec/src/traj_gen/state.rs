//! Trajectory generator module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use serde::Serialize;

// Internal
use super::{decel, decel::StopRequest, loc, window, Params, ParamsError, PathStore, TrajGenError};
use comms_if::msg::{Lane, Pose, ProfileState, TrajWindow, NO_STOP_WP};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    module::State,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct TrajGen {
    params: Params,

    mode: GenMode,

    path: PathStore,

    /// Last pose received
    pose: Option<Pose>,

    /// Last traffic waypoint received
    traffic_wp: i64,

    report: StatusReport,

    arch_report: Archiver,
}

/// Input data to the module.
///
/// Each field holds the value received since the previous cycle, or `None` if nothing new
/// arrived. The module keeps the last pose and traffic waypoint it was given.
#[derive(Debug, Default, Clone)]
pub struct InputData {
    pub pose: Option<Pose>,

    pub lane: Option<Lane>,

    pub traffic_wp: Option<i64>,
}

#[derive(Debug, Default, Clone)]
pub struct OutputData {
    /// The window generated this cycle, `None` while waiting for a pose and path.
    pub window: Option<TrajWindow>,
}

/// The status report containing monitoring quantities for the cycle.
#[derive(Debug, Default, Clone, Serialize)]
pub struct StatusReport {
    /// Session time the report was made at
    pub time_s: f64,

    pub mode: GenMode,

    /// Index of the first waypoint of the window
    pub closest_idx: Option<usize>,

    pub window_len: usize,

    pub profile: ProfileState,

    /// Stop waypoint in use this cycle
    pub stop_idx: Option<usize>,

    /// Lowest effective speed in the window
    pub min_speed_ms: Option<f64>,

    /// Effective speed at the first waypoint of the window
    pub first_speed_ms: Option<f64>,

    /// True if the traffic waypoint was outside of the path and was ignored
    pub stale_stop: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Generator modes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum GenMode {
    /// Either the pose or the global path has not been received yet
    Waiting,

    /// Generating a window every cycle
    Running,
}

/// Potential errors that could occur during initialisation of the module.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(ParamsError),

    #[error("Could not create the status report archive: {0}")]
    ArchiveError(ArchiveError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for GenMode {
    fn default() -> Self {
        GenMode::Waiting
    }
}

impl State for TrajGen {
    type InitData = Params;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = TrajGenError;

    /// Initialise the TrajGen module.
    ///
    /// Expected init data is the generator parameters. With a session the status reports are
    /// archived to `traj_gen/status_report.csv`.
    fn init(init_data: Self::InitData, session: Option<&Session>) -> Result<Self, Self::InitError> {
        init_data.validate().map_err(InitError::InvalidParams)?;

        let arch_report = match session {
            Some(s) => Archiver::from_path(s, "traj_gen/status_report.csv")
                .map_err(InitError::ArchiveError)?,
            None => Archiver::default(),
        };

        Ok(Self {
            params: init_data,
            mode: GenMode::Waiting,
            path: PathStore::Empty,
            pose: None,
            traffic_wp: NO_STOP_WP,
            report: StatusReport::default(),
            arch_report,
        })
    }

    /// Process trajectory generation.
    ///
    /// Processing involves:
    ///  1. Storing new inputs, loading the global path if this is the first one
    ///  1. Moving to `Running` once both a pose and path have been seen
    ///  1. Localising the vehicle on the path
    ///  1. Extracting the window ahead of the vehicle
    ///  1. Applying the braking profile if a stop is requested inside the window
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        self.report = StatusReport {
            time_s: session::get_elapsed_seconds(),
            mode: self.mode,
            ..Default::default()
        };

        if let Some(pose) = input_data.pose {
            self.pose = Some(pose);
        }
        if let Some(wp) = input_data.traffic_wp {
            self.traffic_wp = wp;
        }

        if let Some(ref lane) = input_data.lane {
            match self.path.load(lane.clone()) {
                Ok(()) => info!("Global path loaded with {} waypoints", lane.len()),
                Err(TrajGenError::PathAlreadyLoaded) => {
                    warn!("Received another global path, it has been ignored")
                }
                Err(e) => return Err(e),
            }
        }

        if self.mode == GenMode::Waiting {
            if self.pose.is_some() && self.path.is_loaded() {
                info!("Pose and global path available, TrajGen running");
                self.mode = GenMode::Running;
                self.report.mode = self.mode;
            } else {
                return Ok((OutputData::default(), self.report.clone()));
            }
        }

        let window = self.generate()?;

        Ok((
            OutputData {
                window: Some(window),
            },
            self.report.clone(),
        ))
    }
}

impl Archived for TrajGen {
    fn write(&mut self) -> Result<(), ArchiveError> {
        self.arch_report.serialise(&self.report)
    }
}

impl TrajGen {
    pub fn mode(&self) -> GenMode {
        self.mode
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Build the window for the current pose and stop request.
    fn generate(&mut self) -> Result<TrajWindow, TrajGenError> {
        let pose = self.pose.ok_or(TrajGenError::NotReady)?;
        let path = self.path.loaded()?;

        let stop = match StopRequest::from_raw(self.traffic_wp, path.len()) {
            Ok(s) => s,
            Err(e) => {
                warn!("{}, treating as no stop", e);
                self.report.stale_stop = true;
                StopRequest::None
            }
        };

        let closest_idx = loc::localise(&self.path, &pose.position2())?;

        let waypoints = window::extract(path.waypoints(), closest_idx, self.params.lookahead_wps);

        let (profile, points) = decel::profile(waypoints, closest_idx, stop, &self.params);

        let window = TrajWindow {
            header: path.header().clone(),
            closest_idx,
            profile,
            points,
        };

        self.report.closest_idx = Some(closest_idx);
        self.report.window_len = window.len();
        self.report.profile = profile;
        self.report.stop_idx = stop.index();
        self.report.first_speed_ms = window.points.first().map(|p| p.speed_ms);
        self.report.min_speed_ms = window.speeds().fold(None, |min, s| match min {
            Some(m) if m <= s => Some(m),
            _ => Some(s),
        });

        Ok(window)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};
    use comms_if::msg::{Header, Waypoint};

    fn lane(n: usize, speed_ms: f64) -> Lane {
        Lane {
            header: Header {
                seq: 7,
                stamp: Utc.timestamp_millis(1_600_000_000_000),
                frame_id: "world".into(),
            },
            waypoints: (0..n)
                .map(|i| Waypoint::new(i as f64, 0.0, 0.0, speed_ms))
                .collect(),
        }
    }

    fn running_gen(n: usize, speed_ms: f64) -> TrajGen {
        let mut tg = TrajGen::init(Params::default(), None).unwrap();
        tg.proc(&InputData {
            pose: Some(Pose::from_xy_heading(0.0, 0.0, 0.0)),
            lane: Some(lane(n, speed_ms)),
            traffic_wp: None,
        })
        .unwrap();
        assert_eq!(tg.mode(), GenMode::Running);
        tg
    }

    #[test]
    fn test_waiting() {
        let mut tg = TrajGen::init(Params::default(), None).unwrap();

        // Nothing
        let (out, rpt) = tg.proc(&InputData::default()).unwrap();
        assert!(out.window.is_none());
        assert_eq!(rpt.mode, GenMode::Waiting);

        // Pose only
        let (out, _) = tg
            .proc(&InputData {
                pose: Some(Pose::from_xy_heading(0.0, 0.0, 0.0)),
                ..Default::default()
            })
            .unwrap();
        assert!(out.window.is_none());
        assert_eq!(tg.mode(), GenMode::Waiting);

        // Path arrives later, the stored pose is used
        let (out, rpt) = tg
            .proc(&InputData {
                lane: Some(lane(10, 5.0)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rpt.mode, GenMode::Running);
        assert_eq!(out.window.unwrap().len(), 10);
    }

    #[test]
    fn test_empty_path_keeps_waiting() {
        let mut tg = TrajGen::init(Params::default(), None).unwrap();

        let res = tg.proc(&InputData {
            pose: Some(Pose::from_xy_heading(0.0, 0.0, 0.0)),
            lane: Some(lane(0, 5.0)),
            traffic_wp: None,
        });

        assert!(matches!(res, Err(TrajGenError::EmptyPath)));
        assert_eq!(tg.mode(), GenMode::Waiting);
    }

    #[test]
    fn test_invalid_params() {
        let mut params = Params::default();
        params.max_decel_ms2 = -1.0;
        assert!(matches!(
            TrajGen::init(params, None),
            Err(InitError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_window_at_end_of_path() {
        let mut tg = running_gen(10, 5.0);

        let (out, rpt) = tg
            .proc(&InputData {
                pose: Some(Pose::from_xy_heading(4.8, 0.1, 0.0)),
                ..Default::default()
            })
            .unwrap();
        let win = out.window.unwrap();

        assert_eq!(win.closest_idx, 5);
        assert_eq!(win.len(), 5);
        assert_eq!(win.profile, ProfileState::Cruise);
        assert_eq!(win.header, lane(10, 5.0).header);
        assert_eq!(rpt.closest_idx, Some(5));
        assert_eq!(rpt.window_len, 5);
    }

    #[test]
    fn test_traffic_waypoint() {
        let mut tg = running_gen(300, 10.0);

        let (out, rpt) = tg
            .proc(&InputData {
                traffic_wp: Some(60),
                ..Default::default()
            })
            .unwrap();
        let win = out.window.unwrap();

        assert_eq!(win.profile, ProfileState::Braking);
        assert_eq!(rpt.stop_idx, Some(60));
        assert_eq!(rpt.min_speed_ms, Some(0.0));
        assert!(win.points[58..].iter().all(|p| p.speed_ms == 0.0));

        // The stop stays active until cleared
        let (out, _) = tg.proc(&InputData::default()).unwrap();
        assert_eq!(out.window.unwrap().profile, ProfileState::Braking);

        let (out, rpt) = tg
            .proc(&InputData {
                traffic_wp: Some(NO_STOP_WP),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(out.window.unwrap().profile, ProfileState::Cruise);
        assert_eq!(rpt.stop_idx, None);
        assert_eq!(rpt.first_speed_ms, Some(10.0));
    }

    #[test]
    fn test_stale_stop_ignored() {
        let mut tg = running_gen(50, 10.0);

        let (out, rpt) = tg
            .proc(&InputData {
                traffic_wp: Some(500),
                ..Default::default()
            })
            .unwrap();

        assert!(rpt.stale_stop);
        assert_eq!(rpt.stop_idx, None);
        assert_eq!(out.window.unwrap().profile, ProfileState::Cruise);
    }

    #[test]
    fn test_second_path_ignored() {
        let mut tg = running_gen(50, 10.0);

        let (out, _) = tg
            .proc(&InputData {
                lane: Some(lane(500, 1.0)),
                ..Default::default()
            })
            .unwrap();
        let win = out.window.unwrap();

        assert_eq!(win.len(), 50);
        assert!(win.speeds().all(|s| s == 10.0));
    }

    #[test]
    fn test_infinite_pose_fails_tick() {
        let mut tg = running_gen(10, 5.0);

        let res = tg.proc(&InputData {
            pose: Some(Pose::from_xy_heading(std::f64::INFINITY, 0.0, 0.0)),
            ..Default::default()
        });

        assert!(matches!(res, Err(TrajGenError::InvalidPose)));
    }

    #[test]
    fn test_identical_inputs_identical_output() {
        let inputs = vec![
            InputData {
                pose: Some(Pose::from_xy_heading(0.0, 0.0, 0.0)),
                lane: Some(lane(300, 8.0)),
                traffic_wp: None,
            },
            InputData {
                pose: Some(Pose::from_xy_heading(12.3, -0.4, 0.1)),
                lane: None,
                traffic_wp: Some(90),
            },
        ];

        let run = || -> Vec<String> {
            let mut tg = TrajGen::init(Params::default(), None).unwrap();
            inputs
                .iter()
                .map(|i| {
                    let (out, _) = tg.proc(i).unwrap();
                    serde_json::to_string(&out.window.unwrap()).unwrap()
                })
                .collect()
        };

        assert_eq!(run(), run());
    }
}
