//! # Input Client
//!
//! The InputClient receives the data the trajectory generator works from:
//!
//! - The vehicle pose, sent as often as the localisation source produces it.
//! - The global path, normally sent once.
//! - The traffic waypoint, the index of the waypoint to stop at or `-1`.
//!
//! Data arrives in a publisher-subscriber model as JSON [`InputMsg`]s. A background thread
//! receives the messages and stores the latest value of each in a [`SlotCell`], which the main
//! loop reads at the start of each cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{error, info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crate::{slot::SlotCell, traj_gen::InputData};
use comms_if::{
    msg::{InputMsg, Lane, Pose},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct InputClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    inputs: SharedInputs,
}

/// Latest inputs, shared between the background thread and the client.
#[derive(Clone, Default)]
struct SharedInputs {
    pose: SlotCell<Pose>,
    lane: SlotCell<Lane>,
    traffic_wp: SlotCell<i64>,
    shutdown: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum InputClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl InputClient {
    /// Create a new instance of the InputClient.
    ///
    /// This function will not block until the publisher is available.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, InputClientError> {
        // Conflation must stay off, a pose could otherwise replace the global path in the queue
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, &params.input_endpoint)
            .map_err(InputClientError::SocketError)?;

        let bg_run = Arc::new(AtomicBool::new(true));
        let inputs = SharedInputs::default();

        let bg_run_clone = bg_run.clone();
        let inputs_clone = inputs.clone();

        let bg_jh = Some(thread::spawn(move || {
            bg_thread(socket, bg_run_clone, inputs_clone)
        }));

        Ok(Self {
            bg_jh,
            bg_run,
            inputs,
        })
    }

    /// Get the inputs for this cycle.
    ///
    /// The pose and traffic waypoint are the latest received values, the global path is only
    /// returned once.
    pub fn take_inputs(&self) -> InputData {
        self.inputs.take_inputs()
    }

    /// True once a `Shutdown` message has been received, or once the background thread has
    /// stopped receiving because of a socket error.
    pub fn shutdown_requested(&self) -> bool {
        self.inputs.shutdown.load(Ordering::Relaxed)
    }
}

impl Drop for InputClient {
    fn drop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                warn!("InputClient background thread panicked");
            }
        }
    }
}

impl SharedInputs {
    fn take_inputs(&self) -> InputData {
        InputData {
            pose: self.pose.get(),
            lane: self.lane.take(),
            traffic_wp: self.traffic_wp.get(),
        }
    }

    /// Store a received message.
    fn handle(&self, msg: InputMsg) {
        match msg {
            InputMsg::Pose(p) => self.pose.set(p),
            InputMsg::Lane(l) => {
                info!("Received a global path with {} waypoints", l.len());
                self.lane.set(l)
            }
            InputMsg::TrafficWaypoint(wp) => self.traffic_wp.set(wp),
            InputMsg::Shutdown => {
                info!("Shutdown requested");
                self.shutdown.store(true, Ordering::Relaxed)
            }
        }
    }

    /// Record that no further messages can be received.
    ///
    /// The stored inputs would never be updated again, so shutdown is requested rather than
    /// letting the generator run on a frozen pose.
    fn receive_failed(&self, err: zmq::Error) {
        error!("Error receiving input message, requesting shutdown: {:?}", err);
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Background thread, updates the inputs when the publisher sends something new.
fn bg_thread(socket: MonitoredSocket, run: Arc<AtomicBool>, inputs: SharedInputs) {
    while run.load(Ordering::Relaxed) {
        let msg = match socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Non UTF-8 message received by the InputClient");
                continue;
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                inputs.receive_failed(e);
                break;
            }
        };

        match serde_json::from_str::<InputMsg>(&msg) {
            Ok(m) => inputs.handle(m),
            Err(e) => warn!("Error deserialising input message: {}", e),
        }
    }
}
