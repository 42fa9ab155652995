//! # Sample records
//!
//! The record types carried by the exec's sample channels. Each record is
//! stamped with a tick: a monotonically non-decreasing logical counter owned
//! by the producing thread. Consumers compare ticks to tell "new" data from
//! data they have already seen; ticks are not a wall-clock guarantee.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Maximum number of returns in a single lidar sweep (two returns per degree).
pub const MAX_LIDAR_RETURNS: usize = 360 * 2;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One steering/throttle sample, in raw axis units.
///
/// Both the joystick producer and the prediction client publish these; the
/// arbiter normalises them onto [-1, 1] using the configured axis scale.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AxisRecord {
    /// Steering deflection in raw axis units
    pub steer: f64,

    /// Throttle deflection in raw axis units, positive forward
    pub throttle: f64,

    /// Logical timestamp of the sample
    pub tick: u64,
}

/// One discrete button transition. A button id of -1 means no button has
/// been observed yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonRecord {
    /// Identifier of the button that changed
    pub button: i16,

    /// New state of the button, 1 for pressed, 0 for released
    pub state: i16,

    /// Logical timestamp of the transition
    pub tick: u64,
}

/// One camera frame.
///
/// The pixel buffer is allocated once, at the configured
/// `rows * cols * channels` size, for the lifetime of the channel slot that
/// owns the record. Producers overwrite the contents in place per frame.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    /// Row-major RGB pixel data
    pub data: Box<[u8]>,

    /// Logical timestamp of the frame
    pub tick: u64,
}

/// One decoded lidar return.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct LidarReturn {
    /// Distance to the return in millimetres
    pub distance: f32,

    /// Angle of the return in degrees
    pub angle: f32,

    /// Quality of the return as reported by the scanner
    pub quality: u8,
}

/// One full lidar sweep.
///
/// Like [`ImageRecord`] the return buffer is allocated once and overwritten
/// per sweep; `count` gives the number of valid returns in this sweep.
#[derive(Debug, Clone)]
pub struct LidarRecord {
    /// The returns of this sweep, valid up to `count`
    pub returns: Box<[LidarReturn]>,

    /// Number of valid returns in this sweep
    pub count: usize,

    /// Logical timestamp of the sweep
    pub tick: u64,
}

/// A 2D vehicle pose as supplied by the localisation source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Position of the vehicle in the route frame
    pub position_m: Vector2<f64>,
}

/// The final actuation demand pair emitted by the drive loop, normalised to
/// the actuator range [-1, 1].
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct DriveDemands {
    /// Steering demand, positive to the configured steering sense
    pub steering: f64,

    /// Throttle demand, positive forward
    pub throttle: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ButtonRecord {
    fn default() -> Self {
        Self {
            button: -1,
            state: -1,
            tick: 0,
        }
    }
}

impl ImageRecord {
    /// Create a record with a zeroed pixel buffer of the given frame size.
    pub fn with_frame_len(len: usize) -> Self {
        Self {
            data: vec![0u8; len].into_boxed_slice(),
            tick: 0,
        }
    }

    /// Length of the pixel buffer in bytes.
    pub fn frame_len(&self) -> usize {
        self.data.len()
    }
}

impl LidarReturn {
    /// Decode a return from the scanner's raw measurement encoding.
    ///
    /// Raw distances are in quarter-millimetre units. Raw angles carry a
    /// check bit in the LSB and are in 1/64th degree units above it. Raw
    /// quality carries two sync bits in the low positions.
    pub fn from_raw(raw_quality: u8, raw_angle: u16, raw_distance: u16) -> Self {
        Self {
            distance: raw_distance as f32 / 4.0,
            angle: (raw_angle >> 1) as f32 / 64.0,
            quality: raw_quality >> 2,
        }
    }
}

impl LidarRecord {
    /// Create a record with an empty full-size sweep buffer.
    pub fn with_max_returns() -> Self {
        Self {
            returns: vec![LidarReturn::default(); MAX_LIDAR_RETURNS].into_boxed_slice(),
            count: 0,
            tick: 0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lidar_raw_decode() {
        // 4000 quarter-millimetres is one metre
        let ret = LidarReturn::from_raw(0b0100_0000, 90 * 64 * 2, 4000);

        assert_eq!(ret.distance, 1000.0);
        assert_eq!(ret.angle, 90.0);
        assert_eq!(ret.quality, 16);
    }

    #[test]
    fn test_image_record_alloc() {
        let img = ImageRecord::with_frame_len(160 * 120 * 3);
        assert_eq!(img.frame_len(), 160 * 120 * 3);
        assert_eq!(img.tick, 0);
    }

    #[test]
    fn test_button_record_unset() {
        let b = ButtonRecord::default();
        assert_eq!(b.button, -1);
    }
}
