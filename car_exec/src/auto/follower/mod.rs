//! # Path follower module
//!
//! The follower keeps the car on a waypoint path. Each tick it feeds the
//! signed cross-track error from the path into a PID control law to produce
//! a steering correction, holding a constant cruise throttle while on the
//! path and commanding a stop once the path is exhausted.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controllers;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::PidController;
pub use params::Params;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during follower operation.
#[derive(Debug, thiserror::Error)]
pub enum FollowerError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("The configured route is not a valid path: {0}")]
    InvalidRoute(super::path::PathError),
}
