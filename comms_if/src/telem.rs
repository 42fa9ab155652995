//! # Telemetry Protocol
//!
//! The telemetry responder serves the most recently published camera frame or
//! lidar sweep to a remote viewer. The protocol is stateless request/reply:
//! the viewer sends a one-word request naming the product it wants, the
//! responder replies with the raw frame bytes (for `frame`) or a JSON sweep
//! document (for `scan`).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A telemetry product request from a remote viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemRequest {
    /// The latest raw camera frame
    Frame,

    /// The latest lidar sweep as JSON
    Scan,
}

#[derive(Debug, thiserror::Error)]
pub enum TelemParseError {
    #[error("Unrecognised telemetry request {0:?}")]
    UnknownRequest(String),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One decoded lidar return in a telemetry sweep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScanPointTm {
    /// Distance to the return in millimetres
    pub distance: f32,

    /// Angle of the return in degrees
    pub angle: f32,

    /// Return quality reported by the scanner
    pub quality: u8,
}

/// A full lidar sweep as served to the telemetry viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanTm {
    /// Logical timestamp of the sweep
    pub tick: u64,

    /// The returns in the sweep
    pub points: Vec<ScanPointTm>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TelemRequest {
    /// Parse a request out of a raw message buffer.
    ///
    /// The viewer sends plain text, so any trailing whitespace is ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TelemParseError> {
        let text = String::from_utf8_lossy(bytes);

        match text.trim() {
            "frame" => Ok(TelemRequest::Frame),
            "scan" => Ok(TelemRequest::Scan),
            other => Err(TelemParseError::UnknownRequest(other.into())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_request() {
        assert_eq!(
            TelemRequest::from_bytes(b"frame").unwrap(),
            TelemRequest::Frame
        );
        assert_eq!(
            TelemRequest::from_bytes(b"scan\n").unwrap(),
            TelemRequest::Scan
        );
        assert!(TelemRequest::from_bytes(b"gimme").is_err());
    }

    #[test]
    fn test_scan_tm_roundtrip() {
        let tm = ScanTm {
            tick: 42,
            points: vec![ScanPointTm {
                distance: 1200.5,
                angle: 90.25,
                quality: 15,
            }],
        };

        let json = serde_json::to_string(&tm).unwrap();
        let back: ScanTm = serde_json::from_str(&json).unwrap();

        assert_eq!(back.tick, 42);
        assert_eq!(back.points.len(), 1);
        assert_eq!(back.points[0].quality, 15);
    }
}
