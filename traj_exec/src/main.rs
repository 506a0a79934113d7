//! Main trajectory generator executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Initialise the input source (network or script) and the window server
//!     - Main loop:
//!         - Input acquisition: pose, global path, traffic waypoint
//!         - Trajectory generation
//!         - Window publication
//!         - Archiving
//!         - Cycle management
//!
//! # Modules
//!
//! All modules (e.g. `traj_gen`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, trace, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use comms_if::net::NetParams;
use traj_lib::{
    data_store::DataStore,
    input_client::InputClient,
    traj_gen::{self, path_store::load_lane_csv, PathSource, TrajGen},
    window_server::WindowServer,
};
use util::{
    archive::Archived,
    logger::{logger_init, LevelFilter},
    module::State,
    script_interpreter::{PendingMsgs, ScriptInterpreter},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trajectory window generator
#[derive(Debug, StructOpt)]
#[structopt(name = "traj_exec")]
struct Opts {
    /// Replay inputs from this script instead of receiving them over the network
    #[structopt(short, long, parse(from_os_str))]
    script: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Sources of the generator's inputs.
enum InputSource {
    Remote(InputClient),
    Script {
        si: ScriptInterpreter,
        start: Instant,
    },
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    color_eyre::install()?;

    let opts = Opts::from_args();

    let session = Session::new("traj_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Trace, &session).wrap_err("Failed to initialise logging")?;

    info!("Trajectory Window Generator\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    let traj_gen_params: traj_gen::Params =
        util::params::load("traj_gen.toml").wrap_err("Could not load TrajGen params")?;

    info!("Exec parameters loaded");

    let cycle_period_s = traj_gen_params.cycle_period_s();
    let cycle_frequency_hz = traj_gen_params.cycle_frequency_hz;

    // Path loaded from file is given to TrajGen on the first cycle
    let mut file_lane = match traj_gen_params.path_source {
        PathSource::Network => {
            info!("Global path will be received over the network");
            None
        }
        PathSource::File(ref path) => {
            let lane = load_lane_csv(path, traj_gen_params.file_path_speed_ms)
                .wrap_err_with(|| format!("Failed to load the global path from {:?}", path))?;
            info!("Loaded global path of {} waypoints from {:?}", lane.len(), path);
            Some(lane)
        }
    };

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    let mut traj_gen =
        TrajGen::init(traj_gen_params, Some(&session)).wrap_err("Failed to initialise TrajGen")?;
    info!("TrajGen init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let mut input_source = match opts.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} messages\n",
                si.get_duration(),
                si.get_num_msgs()
            );

            InputSource::Script {
                si,
                start: Instant::now(),
            }
        }
        None => {
            let c = InputClient::new(&zmq_ctx, &net_params)
                .wrap_err("Failed to initialise the InputClient")?;
            info!("InputClient initialised");
            InputSource::Remote(c)
        }
    };

    let mut window_server = {
        let s = WindowServer::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise WindowServer")?;
        info!("WindowServer initialised");
        s
    };

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(cycle_frequency_hz);

        // ---- DATA INPUT ----

        match input_source {
            InputSource::Remote(ref client) => {
                ds.traj_gen_input = client.take_inputs();
                if client.shutdown_requested() {
                    ds.shutdown = true;
                }
            }
            InputSource::Script {
                ref mut si,
                ref start,
            } => match si.get_pending(start.elapsed().as_secs_f64()) {
                PendingMsgs::None => (),
                PendingMsgs::Some(msgs) => {
                    for msg in msgs {
                        ds.apply_input_msg(msg);
                    }
                }
                PendingMsgs::EndOfScript => {
                    info!("End of input script reached, stopping");
                    ds.shutdown = true;
                }
            },
        }

        if let Some(lane) = file_lane.take() {
            ds.traj_gen_input.lane = Some(lane);
        }

        // Stop between cycles so a partial window is never published
        if ds.shutdown {
            break;
        }

        // ---- TRAJECTORY GENERATION ----

        // On error the last good window is kept and republished below
        ds.apply_traj_gen_result(traj_gen.proc(&ds.traj_gen_input));

        trace!("TrajGen status: {:?}", ds.traj_gen_status_rpt);

        if ds.is_1_hz_cycle {
            debug!(
                "TrajGen {:?}: closest waypoint {:?}, {} waypoints, {:?}",
                ds.traj_gen_status_rpt.mode,
                ds.traj_gen_status_rpt.closest_idx,
                ds.traj_gen_status_rpt.window_len,
                ds.traj_gen_status_rpt.profile
            );
        }

        // ---- WINDOW PUBLICATION ----

        if let Some(ref w) = ds.traj_window {
            if let Err(e) = window_server.send(w) {
                warn!("WindowServer error: {}", e);
            }
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = traj_gen.write() {
            warn!("Could not write TrajGen archive: {}", e);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(cycle_period_s).checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period_s
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        ds.cycle_end();
    }

    // ---- SHUTDOWN ----

    info!("End of execution after {} cycles", ds.num_cycles);

    Ok(())
}
