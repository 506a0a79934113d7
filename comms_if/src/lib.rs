//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software: the messages exchanged with the
//! pose source, path source, traffic light detector and the downstream controller, and the network
//! abstractions used to move them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Message definitions for data flowing into and out of the trajectory generator
pub mod msg;

/// Network module
pub mod net;
