//! # Communications interface crate.
//!
//! Provides the common communications interfaces for the software: the
//! monitored ZMQ socket wrapper, the prediction service protocol and the
//! telemetry protocol.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Network module
pub mod net;

/// Prediction service request/response definitions
pub mod pred;

/// Telemetry request/reply definitions
pub mod telem;
