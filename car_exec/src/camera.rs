//! # Camera producer
//!
//! Publishes frames from the camera into the image channel. Frames whose
//! size does not match the configured dimensions are discarded; good frames
//! are written in place with the channel's two-phase write so the pixel data
//! is only copied once.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info};
use serde::Deserialize;
use std::time::Duration;

// Internal
use crate::channel::SampleWriter;
use crate::eqpt::FrameSource;
use crate::lifecycle::Lifecycle;
use crate::records::ImageRecord;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the camera producer.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Name of the camera device, or `"sim"` for the synthetic source
    pub device: String,

    /// Number of pixel rows in a frame
    pub rows: usize,

    /// Number of pixel columns in a frame
    pub cols: usize,

    /// Number of colour channels per pixel
    pub channels: usize,

    /// Sleep between grabs, bounding the polling rate
    pub poll_interval_us: u64,
}

impl Params {
    /// Expected byte length of one frame.
    pub fn frame_len(&self) -> usize {
        self.rows * self.cols * self.channels
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Camera producer loop.
///
/// Initialises the source and publishes every valid frame until the
/// lifecycle is shut down. An initialisation failure ends this thread only;
/// the rest of the exec keeps running on its last-known data.
pub fn run<F: FrameSource>(
    lc: Lifecycle,
    params: Params,
    mut source: F,
    mut img_tx: SampleWriter<ImageRecord>,
) {
    if let Err(e) = source.init() {
        error!("Camera init failed: {}", e);
        return;
    }

    info!(
        "Camera open: {}x{}x{} on \"{}\"",
        params.cols, params.rows, params.channels, params.device
    );

    let expected_len = params.frame_len();
    let mut tick = 0u64;

    while lc.running() {
        // Restrict rate
        std::thread::sleep(Duration::from_micros(params.poll_interval_us));

        match source.grab() {
            Ok(Some(frame)) => {
                if frame.len() != expected_len {
                    debug!(
                        "Wrong frame size, expected {} got {}",
                        expected_len,
                        frame.len()
                    );
                    continue;
                }

                // Copy straight into the channel slot; the slot buffer was
                // allocated once at channel construction
                let record = img_tx.begin_write();
                record.data.copy_from_slice(frame);
                tick += 1;
                record.tick = tick;
                img_tx.finish_write();
            }
            Ok(None) => (),
            Err(e) => debug!("Frame grab failed: {}", e),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel::channel_with;
    use crate::eqpt::sim::SimFrameSource;

    fn params(rows: usize, cols: usize) -> Params {
        Params {
            device: "sim".into(),
            rows,
            cols,
            channels: 3,
            poll_interval_us: 10,
        }
    }

    #[test]
    fn test_frames_published_with_rising_ticks() {
        let p = params(4, 4);
        let frame_len = p.frame_len();

        let (img_tx, img_rx) =
            channel_with(3, || ImageRecord::with_frame_len(frame_len)).unwrap();

        let lc = Lifecycle::new();
        let stopper = lc.clone();

        let handle = std::thread::spawn(move || {
            run(lc, p, SimFrameSource::new(frame_len), img_tx);
        });

        // Wait until a couple of frames have landed
        loop {
            if let Some(img) = img_rx.read_ref() {
                if img.tick >= 2 {
                    break;
                }
            }
            std::thread::yield_now();
        }

        stopper.shutdown();
        handle.join().unwrap();

        let img = img_rx.read_ref().unwrap();
        assert_eq!(img.frame_len(), frame_len);
        assert!(img.tick >= 2);
    }

    #[test]
    fn test_wrong_size_frames_rejected() {
        // The source produces 48-byte frames but the consumer expects 8x8x3
        let p = params(8, 8);

        let (img_tx, img_rx) =
            channel_with(3, || ImageRecord::with_frame_len(p.frame_len())).unwrap();

        let lc = Lifecycle::new();
        let stopper = lc.clone();

        let source = SimFrameSource::new(48);
        let handle = std::thread::spawn(move || {
            run(lc, p, source, img_tx);
        });

        // Give the producer time to (not) publish
        std::thread::sleep(Duration::from_millis(20));

        stopper.shutdown();
        handle.join().unwrap();

        assert!(img_rx.read_ref().is_none());
    }
}
