//! # Dart car executable library
//!
//! This library holds the vehicle-side control software: the latest-value
//! sample channels which carry sensor and prediction data between threads,
//! the producer loops which publish into them, the control arbitration which
//! merges the human and autonomy command streams, and the path follower which
//! turns a 2D pose into a steering correction.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod arbiter;
pub mod auto;
pub mod camera;
pub mod channel;
pub mod drive;
pub mod eqpt;
pub mod frame_log;
pub mod joystick;
pub mod lidar;
pub mod lifecycle;
pub mod pred_client;
pub mod records;
pub mod telem_server;
