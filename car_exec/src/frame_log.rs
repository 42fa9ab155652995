//! # Frame logger
//!
//! Records (image, steering, throttle) training tuples to disk while
//! recording is toggled on from the joystick. Each tuple is one JPEG in the
//! session's frame directory, with the axis values embedded in the filename
//! so the training pipeline needs no side table.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};
use serde::Deserialize;
use std::time::{Duration, Instant};

// Internal
use crate::channel::SampleReader;
use crate::lifecycle::Lifecycle;
use crate::records::{AxisRecord, ButtonRecord, ImageRecord};
use util::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the frame logger.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Button toggling recording on and off
    pub toggle_button: i16,

    /// Number of pixel rows in a frame
    pub rows: u32,

    /// Number of pixel columns in a frame
    pub cols: u32,

    /// Maximum number of tuples logged per second
    pub fps_limit: u32,

    /// Throttle magnitude (raw axis units) below which the car is considered
    /// idle and nothing is logged
    pub idle_throttle_threshold: f64,

    /// Sleep between polls, bounding the polling rate
    pub poll_interval_us: u64,

    /// If true recording starts enabled without a button press
    pub debug_always_record: bool,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Frame logger loop.
///
/// Runs until the lifecycle is shut down.
pub fn run(
    lc: Lifecycle,
    params: Params,
    session: Session,
    img_rx: SampleReader<ImageRecord>,
    axis_rx: SampleReader<AxisRecord>,
    button_rx: SampleReader<ButtonRecord>,
) {
    let mut do_record = params.debug_always_record;
    let mut serial = 0u32;
    let mut last_button = 0u64;
    let mut last_image = 0u64;
    let mut last_log: Option<Instant> = None;

    let min_log_interval = Duration::from_secs_f64(1.0 / params.fps_limit as f64);

    let mut button = ButtonRecord::default();
    let mut axis = AxisRecord::default();

    while lc.running() {
        // Restrict rate
        std::thread::sleep(Duration::from_micros(params.poll_interval_us));

        // Handle the record toggle
        if button_rx.read(&mut button) && button.button != -1 && button.tick != last_button {
            if button.button == params.toggle_button && button.state == 1 {
                do_record = !do_record;
                info!("Record state: {}", do_record);
            }

            last_button = button.tick;
        }

        if !do_record {
            continue;
        }

        // A tuple needs a fresh image and an axis sample
        let img = match img_rx.read_ref() {
            Some(i) if i.tick != last_image => i,
            _ => continue,
        };

        if !axis_rx.read(&mut axis) {
            continue;
        }

        last_image = img.tick;

        // Only record when the car is actually being driven
        if axis.throttle.abs() <= params.idle_throttle_threshold {
            continue;
        }

        // Respect the configured log rate
        if let Some(t) = last_log {
            if t.elapsed() < min_log_interval {
                continue;
            }
        }
        last_log = Some(Instant::now());

        let mut path = session.frame_root.clone();
        path.push(format!(
            "img_{:08}_st_{}_th_{}.jpg",
            serial, axis.steer as i64, axis.throttle as i64
        ));

        match image::save_buffer(
            &path,
            &img.data,
            params.cols,
            params.rows,
            image::ColorType::Rgb8,
        ) {
            Ok(_) => serial += 1,
            Err(e) => warn!("Could not write frame log {:?}: {}", path, e),
        }
    }

    info!("Frame logger stopped after {} tuples", serial);
}
