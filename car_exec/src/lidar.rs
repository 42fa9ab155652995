//! # Lidar producer
//!
//! Publishes decoded scanner sweeps into the lidar channel. The sweep buffer
//! in each channel slot is allocated once; the source fills it in place via
//! the two-phase write.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info};
use serde::Deserialize;
use std::time::Duration;

// Internal
use crate::channel::SampleWriter;
use crate::eqpt::SweepSource;
use crate::lifecycle::Lifecycle;
use crate::records::LidarRecord;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the lidar producer.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Serial device of the scanner, or `"sim"` for the synthetic source
    pub device: String,

    /// Sleep between sweep polls, bounding the polling rate
    pub poll_interval_us: u64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Lidar producer loop.
///
/// Initialises the scanner and publishes every complete sweep until the
/// lifecycle is shut down. An initialisation failure ends this thread only.
pub fn run<S: SweepSource>(
    lc: Lifecycle,
    params: Params,
    mut source: S,
    mut lidar_tx: SampleWriter<LidarRecord>,
) {
    if let Err(e) = source.init() {
        error!("Lidar init failed: {}", e);
        return;
    }

    info!("Lidar open on \"{}\"", params.device);

    let mut tick = 0u64;

    while lc.running() {
        // Restrict rate
        std::thread::sleep(Duration::from_micros(params.poll_interval_us));

        // Fill the slot's return buffer in place; an incomplete sweep
        // abandons the write without publishing
        let record = lidar_tx.begin_write();

        match source.grab_sweep(&mut record.returns) {
            Ok(Some(count)) => {
                record.count = count;
                tick += 1;
                record.tick = tick;
                lidar_tx.finish_write();
            }
            Ok(None) => (),
            Err(e) => debug!("Sweep grab failed: {}", e),
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
    use crate::eqpt::sim::SimSweepSource;

    #[test]
    fn test_sweeps_published() {
        let (lidar_tx, lidar_rx) =
            channel_with(3, LidarRecord::with_max_returns).unwrap();

        let lc = Lifecycle::new();
        let stopper = lc.clone();

        let params = Params {
            device: "sim".into(),
            poll_interval_us: 10,
        };

        let handle = std::thread::spawn(move || {
            run(lc, params, SimSweepSource::new(1500.0), lidar_tx);
        });

        loop {
            if let Some(sweep) = lidar_rx.read_ref() {
                if sweep.tick >= 1 {
                    break;
                }
            }
            std::thread::yield_now();
        }

        stopper.shutdown();
        handle.join().unwrap();

        let sweep = lidar_rx.read_ref().unwrap();
        assert_eq!(sweep.count, 360);
        assert_eq!(sweep.returns[0].distance, 1500.0);
        assert_eq!(sweep.returns[90].angle, 90.0);
    }
}
