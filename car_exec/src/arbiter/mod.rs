//! # Control arbitration module
//!
//! Every drive tick the arbiter decides whether the human joystick stream or
//! the autonomy stream owns steering and throttle, and emits exactly one
//! normalised demand pair.
//!
//! The hand-off protocol is time-windowed: a fresh autonomy sample seizes an
//! axis for a bounded number of ticks, after which control reverts to the
//! human. An autonomy sample that commands zero throttle does not claim the
//! throttle axis at all, so the human can always stop or drive the car the
//! instant the autonomy stops commanding it.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::Params;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during arbiter operation.
#[derive(Debug, thiserror::Error)]
pub enum ArbiterError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("The axis scale parameter must be positive, got {0}")]
    InvalidAxisScale(f64),
}
