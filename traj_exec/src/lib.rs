//! # Trajectory generator library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the trajectory generator crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data store - per-cycle state of the executable
pub mod data_store;

/// Input client - receives poses, the global path and traffic waypoints from the network
pub mod input_client;

/// Single value cells shared between threads
pub mod slot;

/// Trajectory generator module - builds the window ahead of the vehicle
pub mod traj_gen;

/// Window server - publishes the generated windows
pub mod window_server;
