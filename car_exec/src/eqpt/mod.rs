//! # Equipment interfaces
//!
//! The hardware the exec talks to (joystick, camera, lidar, localisation,
//! drive actuators) lives behind the capability traits in this module. The
//! traits are the boundary of the control core: device drivers implement
//! them out-of-tree, and the producer loops in this crate consume them by
//! explicit pull rather than by registering callbacks.
//!
//! Simulated implementations used for bench testing live in [`sim`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod sim;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::records::{LidarReturn, Pose};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// One event from a human input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// An axis moved to a new deflection
    Axis {
        /// Axis identifier on the device
        id: u8,
        /// Raw signed deflection
        value: i16,
    },

    /// A button changed state
    Button {
        /// Button identifier on the device
        id: u8,
        /// True when the button went down
        pressed: bool,
    },
}

/// Errors produced by equipment sources.
#[derive(Debug, thiserror::Error)]
pub enum EqptError {
    #[error("The device \"{0}\" is not available")]
    DeviceUnavailable(String),

    #[error("Device IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A human input device producing axis and button events.
pub trait InputSource {
    /// Attempt to open the device, returning true once it is available.
    ///
    /// Input devices may arrive late (for instance a controller connecting
    /// over Bluetooth), so producers poll this until it succeeds.
    fn try_open(&mut self) -> bool;

    /// Sample the next pending event, or `None` if no event is waiting.
    fn sample(&mut self) -> Option<InputEvent>;
}

/// A camera producing a lazy, infinite, non-restartable sequence of frames.
pub trait FrameSource {
    /// Initialise the device. Called once before the first grab.
    fn init(&mut self) -> Result<(), EqptError>;

    /// Pull the next frame, or `None` if no new frame is ready yet.
    ///
    /// The returned slice is valid until the next call to `grab`. The
    /// consumer is responsible for validating the frame length against its
    /// configured dimensions.
    fn grab(&mut self) -> Result<Option<&[u8]>, EqptError>;
}

/// A scanner producing one set of returns per sweep.
pub trait SweepSource {
    /// Initialise the device. Called once before the first sweep.
    fn init(&mut self) -> Result<(), EqptError>;

    /// Pull the next sweep into `dest`, returning the number of returns
    /// written, or `None` if no complete sweep is ready yet.
    fn grab_sweep(&mut self, dest: &mut [LidarReturn]) -> Result<Option<usize>, EqptError>;
}

/// A localisation source producing 2D vehicle poses.
pub trait PoseSource {
    /// Sample the current pose, or `None` if localisation has no fix.
    fn sample_pose(&mut self) -> Option<Pose>;
}

/// The drive actuator capability consumed by the drive loop.
///
/// Implementations own all hardware scaling (servo pulse widths, ESC ranges)
/// and clamp the demand onto the physical range; the exec only ever speaks
/// in the normalised range [-1, 1].
pub trait DriveActuator {
    /// Command the steering to the given fraction of full deflection.
    fn set_steering(&mut self, percent: f64);

    /// Command the throttle to the given fraction of full power, positive
    /// forward.
    fn set_throttle(&mut self, percent: f64);

    /// True once the actuator hardware is ready to accept demands.
    fn is_ready(&self) -> bool;
}
