//! Host environment utility functions

use std::path::PathBuf;

/// Name of the environment variable pointing at the software root.
pub const SW_ROOT_ENV_VAR: &str = "DART_SW_ROOT";

/// Get the root directory of the software installation.
///
/// The root is taken from the `DART_SW_ROOT` environment variable, and is
/// used to resolve parameter files and session directories.
pub fn get_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
