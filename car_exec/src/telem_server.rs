//! # Telemetry server
//!
//! Serves the most recently published camera frame or lidar sweep to a
//! remote viewer over a stateless request/reply socket. The server blocks
//! (bounded) on an inbound request, then polls the relevant channel until a
//! sample is available, then replies.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use std::time::Duration;

// Internal
use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    telem::{ScanPointTm, ScanTm, TelemRequest},
};

use crate::channel::SampleReader;
use crate::lifecycle::Lifecycle;
use crate::records::{ImageRecord, LidarRecord};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Receive timeout on the request socket. Bounds how long the server can go
/// without observing the shutdown flag.
const REQUEST_RECV_TIMEOUT_MS: i32 = 500;

/// Sleep while waiting for a sample to serve.
const SAMPLE_POLL_INTERVAL_MS: u64 = 10;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Telemetry server
pub struct TelemServer {
    socket: MonitoredSocket,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TelemServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl TelemServer {
    /// Create a new instance of the telemetry server.
    ///
    /// This function will not block until a viewer connects.
    pub fn new(ctx: &zmq::Context, net_params: &NetParams) -> Result<Self, TelemServerError> {
        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            linger: 1,
            recv_timeout: REQUEST_RECV_TIMEOUT_MS,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::REP,
            socket_options,
            &net_params.telem_endpoint,
        )
        .map_err(TelemServerError::SocketError)?;

        info!(
            "Listening for telemetry requests on {}",
            net_params.telem_endpoint
        );

        Ok(Self { socket })
    }

    /// Telemetry server loop.
    ///
    /// Runs until the lifecycle is shut down.
    pub fn run(
        &mut self,
        lc: Lifecycle,
        img_rx: SampleReader<ImageRecord>,
        lidar_rx: SampleReader<LidarRecord>,
    ) {
        while lc.running() {
            // Wait (bounded) for a request
            let raw = match self.socket.recv_bytes(0) {
                Ok(b) => b,
                Err(zmq::Error::EAGAIN) => continue,
                Err(e) => {
                    warn!("Telemetry receive failed: {}", e);
                    continue;
                }
            };

            let reply = match TelemRequest::from_bytes(&raw) {
                Ok(TelemRequest::Frame) => self.frame_reply(&lc, &img_rx),
                Ok(TelemRequest::Scan) => self.scan_reply(&lc, &lidar_rx),
                Err(e) => {
                    warn!("{}", e);
                    Vec::new()
                }
            };

            // A REP socket owes exactly one reply per request, even an empty
            // one on shutdown or bad requests
            if let Err(e) = self.socket.send(&reply, 0) {
                warn!("Telemetry reply failed: {}", e);
            }
        }
    }

    /// Wait for a camera frame and return its raw bytes.
    ///
    /// Returns an empty reply if shutdown happens before a frame arrives,
    /// which is unlikely to take long unless the camera is down.
    fn frame_reply(&self, lc: &Lifecycle, img_rx: &SampleReader<ImageRecord>) -> Vec<u8> {
        loop {
            if let Some(img) = img_rx.read_ref() {
                return img.data.to_vec();
            }

            if !lc.running() {
                return Vec::new();
            }

            std::thread::sleep(Duration::from_millis(SAMPLE_POLL_INTERVAL_MS));
        }
    }

    /// Wait for a lidar sweep and return it serialised as JSON.
    fn scan_reply(&self, lc: &Lifecycle, lidar_rx: &SampleReader<LidarRecord>) -> Vec<u8> {
        loop {
            if let Some(sweep) = lidar_rx.read_ref() {
                let tm = ScanTm {
                    tick: sweep.tick,
                    points: sweep.returns[..sweep.count]
                        .iter()
                        .map(|r| ScanPointTm {
                            distance: r.distance,
                            angle: r.angle,
                            quality: r.quality,
                        })
                        .collect(),
                };

                return match serde_json::to_vec(&tm) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Could not serialise sweep telemetry: {}", e);
                        Vec::new()
                    }
                };
            }

            if !lc.running() {
                return Vec::new();
            }

            std::thread::sleep(Duration::from_millis(SAMPLE_POLL_INTERVAL_MS));
        }
    }
}
