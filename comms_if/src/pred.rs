//! # Prediction Service Protocol
//!
//! The prediction service is a remote process hosting the steering/throttle
//! neural network. The protocol is a strict request/response pair over a ZMQ
//! REQ/REP link:
//!
//! - request: the raw bytes of one camera frame (`rows * cols * channels`
//!   bytes, row-major RGB, no header),
//! - response: a small JSON document with numeric `steering` and `throttle`
//!   fields, both in the normalised range [-1, 1].
//!
//! Exactly one request may be in flight at a time, which the REQ socket
//! enforces for us.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Response sent by the prediction service for a single frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PredResponse {
    /// Predicted steering in the normalised range [-1, 1]
    pub steering: f64,

    /// Predicted throttle in the normalised range [-1, 1]
    pub throttle: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PredParseError {
    #[error("The response was not valid UTF-8")]
    NonUtf8Response,

    #[error("Could not deserialize the response: {0}")]
    DeserializeError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PredResponse {
    /// Parse a raw response buffer from the prediction service.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PredParseError> {
        let text =
            std::str::from_utf8(bytes).map_err(|_| PredParseError::NonUtf8Response)?;

        serde_json::from_str(text).map_err(PredParseError::DeserializeError)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_response() {
        let resp =
            PredResponse::from_bytes(br#"{"steering": -0.25, "throttle": 0.4}"#).unwrap();

        assert_eq!(resp.steering, -0.25);
        assert_eq!(resp.throttle, 0.4);
    }

    #[test]
    fn test_parse_bad_response() {
        assert!(PredResponse::from_bytes(b"not json").is_err());
        assert!(PredResponse::from_bytes(&[0xff, 0xfe]).is_err());
    }
}
