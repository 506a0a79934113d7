//! Host platform utility functions

use std::{env, path::PathBuf};

/// Environment variable pointing at the root of the software tree, which contains the `params`
/// and `sessions` directories.
pub const SW_ROOT_ENV_VAR: &str = "TRAJ_SW_ROOT";

/// Get the root directory of the software from the environment.
pub fn get_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
