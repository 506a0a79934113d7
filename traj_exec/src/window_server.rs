//! # Window Server
//!
//! Publishes the trajectory window generated each cycle as JSON.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    msg::TrajWindow,
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Trajectory window server
pub struct WindowServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WindowServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the window: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the window: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WindowServer {
    /// Create a new instance of the window server.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, WindowServerError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, &params.window_endpoint)
            .map_err(WindowServerError::SocketError)?;

        Ok(Self { socket })
    }

    /// Publish a window.
    pub fn send(&mut self, window: &TrajWindow) -> Result<(), WindowServerError> {
        let window_string =
            serde_json::to_string(window).map_err(WindowServerError::SerializationError)?;

        self.socket
            .send(window_string.as_str(), 0)
            .map_err(WindowServerError::SendError)
    }
}
