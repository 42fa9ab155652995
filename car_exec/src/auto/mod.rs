//! # Autonomy module
//!
//! Path following for the car: the 2D segment geometry, the waypoint path
//! with its sliding active-segment cursor, and the PID follower which turns
//! a pose into a steering correction.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod follower;
pub mod path;
pub mod seg;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use follower::Follower;
pub use path::{Path, PathError, Waypoint};
pub use seg::{Seg2, SegProjection};
