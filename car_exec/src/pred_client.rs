//! # Prediction client
//!
//! Pushes camera frames to the remote steering/throttle predictor and
//! publishes its answers into the autonomy axis channel. Prediction is
//! toggled from the joystick; two further buttons trim a speed scalar
//! applied to the predicted throttle.
//!
//! The request/response call is bounded by an explicit receive timeout: if
//! the predictor stalls, the sample is dropped with a warning and the human
//! keeps control through the arbitration hand-off.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use serde::Deserialize;
use std::time::Duration;

// Internal
use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    pred::PredResponse,
};

use crate::channel::{SampleReader, SampleWriter};
use crate::lifecycle::Lifecycle;
use crate::records::{AxisRecord, ButtonRecord, ImageRecord};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the prediction client.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Button toggling prediction on and off
    pub toggle_button: i16,

    /// Button nudging the speed scalar up
    pub speed_up_button: i16,

    /// Button nudging the speed scalar down
    pub speed_down_button: i16,

    /// Increment applied by the speed-up button
    pub speed_scalar_step_up: f64,

    /// Decrement applied by the speed-down button
    pub speed_scalar_step_down: f64,

    /// Full-scale deflection of the raw axis range; predictions arrive
    /// normalised and are scaled back to raw units for the channel
    pub axis_scale: f64,

    /// Maximum time to wait for the predictor's response
    pub recv_timeout_ms: i32,

    /// Sleep between polls, bounding the polling rate
    pub poll_interval_us: u64,

    /// If true prediction starts enabled without a button press
    pub debug_always_predict: bool,
}

/// The prediction client.
pub struct PredClient {
    socket: MonitoredSocket,
    params: Params,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PredClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl PredClient {
    /// Create a new instance of the prediction client.
    ///
    /// This function will not block waiting for the predictor to appear.
    pub fn new(
        ctx: &zmq::Context,
        net_params: &NetParams,
        params: Params,
    ) -> Result<Self, PredClientError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: params.recv_timeout_ms,
            send_timeout: 10,
            // The relaxed request pattern lets us issue a fresh request
            // after a timed-out response instead of wedging the socket
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::REQ,
            socket_options,
            &net_params.pred_endpoint,
        )
        .map_err(PredClientError::SocketError)?;

        info!("Looking for prediction service at {}", net_params.pred_endpoint);

        Ok(Self { socket, params })
    }

    /// Prediction client loop.
    ///
    /// Runs until the lifecycle is shut down.
    pub fn run(
        &mut self,
        lc: Lifecycle,
        img_rx: SampleReader<ImageRecord>,
        button_rx: SampleReader<ButtonRecord>,
        mut pred_tx: SampleWriter<AxisRecord>,
    ) {
        let mut do_predict = self.params.debug_always_predict;
        let mut speed_scalar = 1.0f64;
        let mut last_button = 0u64;
        let mut last_image = 0u64;
        let mut tick = 0u64;
        let mut button = ButtonRecord::default();

        while lc.running() {
            // Restrict rate
            std::thread::sleep(Duration::from_micros(self.params.poll_interval_us));

            // Handle button transitions
            if button_rx.read(&mut button) && button.tick != last_button {
                last_button = button.tick;

                if button.button == self.params.toggle_button && button.state == 1 {
                    do_predict = !do_predict;
                    info!("Prediction: {}", if do_predict { "on" } else { "off" });
                }

                if button.button == self.params.speed_up_button && button.state == 1 {
                    speed_scalar += self.params.speed_scalar_step_up;
                    info!("Prediction speed scalar: {:.2}", speed_scalar);
                }

                if button.button == self.params.speed_down_button && button.state == 1 {
                    speed_scalar -= self.params.speed_scalar_step_down;
                    info!("Prediction speed scalar: {:.2}", speed_scalar);
                }
            }

            if !do_predict {
                continue;
            }

            // Only a frame we haven't predicted on yet is worth sending
            let frame_tick = match img_rx.read_ref() {
                Some(img) if img.tick != last_image => img.tick,
                _ => continue,
            };

            match self.request(&img_rx) {
                Ok(Some(resp)) => {
                    last_image = frame_tick;
                    tick += 1;

                    pred_tx.write(AxisRecord {
                        steer: resp.steering * self.params.axis_scale,
                        throttle: resp.throttle * speed_scalar * self.params.axis_scale,
                        tick,
                    });
                }
                Ok(None) => {
                    // Drop the sample; human control persists through the
                    // arbitration window
                    last_image = frame_tick;
                    warn!("Prediction service did not answer in time");
                }
                Err(e) => {
                    last_image = frame_tick;
                    warn!("Prediction request failed: {}", e);
                }
            }
        }
    }

    /// Send the latest frame and wait (bounded) for the predictor's answer.
    ///
    /// Returns `Ok(None)` if the predictor did not answer within the receive
    /// timeout.
    fn request(
        &mut self,
        img_rx: &SampleReader<ImageRecord>,
    ) -> Result<Option<PredResponse>, zmq::Error> {
        // Borrow the frame only for the duration of the send; the capacity-3
        // image channel gives slack against the producer overwriting it
        match img_rx.read_ref() {
            Some(img) => self.socket.send(&*img.data, 0)?,
            None => return Ok(None),
        }

        let reply = match self.socket.recv_bytes(0) {
            Ok(b) => b,
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(e) => return Err(e),
        };

        match PredResponse::from_bytes(&reply) {
            Ok(resp) => Ok(Some(resp)),
            Err(e) => {
                warn!("Could not parse prediction response: {}", e);
                Ok(None)
            }
        }
    }
}
