//! # Joystick producer
//!
//! Publishes axis and button samples from a human input device. The device
//! may appear late (for instance a controller pairing over Bluetooth), so
//! the loop waits for it to open before sampling. Once open, disconnects are
//! not yet handled.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use serde::Deserialize;
use std::time::Duration;

// Internal
use crate::channel::SampleWriter;
use crate::eqpt::{InputEvent, InputSource};
use crate::lifecycle::Lifecycle;
use crate::records::{AxisRecord, ButtonRecord};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the joystick producer.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Path of the input device, or `"sim"` for the scripted source
    pub device: String,

    /// Axis id carrying steering
    pub axis_steer: u8,

    /// Axis id carrying throttle
    pub axis_throttle: u8,

    /// Axis ids to discard entirely. Some controllers spew orientation data
    /// on extra axes; suppressing it here saves time downstream.
    pub ignore_axes: Vec<u8>,

    /// Sleep between samples, bounding the polling rate
    pub poll_interval_us: u64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Joystick producer loop.
///
/// Runs until the lifecycle is shut down, publishing axis samples into
/// `axis_tx` and button transitions into `button_tx`.
pub fn run<S: InputSource>(
    lc: Lifecycle,
    params: Params,
    mut source: S,
    mut axis_tx: SampleWriter<AxisRecord>,
    mut button_tx: SampleWriter<ButtonRecord>,
) {
    // Wait for the device to arrive
    while lc.running() && !source.try_open() {
        std::thread::sleep(Duration::from_micros(params.poll_interval_us));
    }

    if !lc.running() {
        return;
    }

    info!("Joystick found on \"{}\"", params.device);

    // One persistent record keeps the other axis's last value when a single
    // axis moves
    let mut record = AxisRecord::default();
    let mut tick = 0u64;

    while lc.running() {
        // Restrict rate
        std::thread::sleep(Duration::from_micros(params.poll_interval_us));

        // Drain all events waiting on the device
        while let Some(event) = source.sample() {
            match event {
                InputEvent::Axis { id, value } => {
                    if params.ignore_axes.contains(&id) {
                        continue;
                    }

                    if id == params.axis_steer {
                        record.steer = value as f64;
                    } else if id == params.axis_throttle {
                        // Reverse the throttle so up is forward
                        record.throttle = -(value as f64);
                    } else {
                        continue;
                    }

                    tick += 1;
                    record.tick = tick;
                    axis_tx.write(record);
                }
                InputEvent::Button { id, pressed } => {
                    tick += 1;
                    debug!("Button {} is {}", id, if pressed { "down" } else { "up" });

                    button_tx.write(ButtonRecord {
                        button: id as i16,
                        state: pressed as i16,
                        tick,
                    });
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel::channel;
    use crate::eqpt::sim::ScriptedInput;

    fn params() -> Params {
        Params {
            device: "sim".into(),
            axis_steer: 0,
            axis_throttle: 3,
            ignore_axes: vec![23, 24, 25],
            poll_interval_us: 10,
        }
    }

    #[test]
    fn test_axis_mapping_and_throttle_inversion() {
        let (axis_tx, axis_rx) = channel::<AxisRecord>(10).unwrap();
        let (button_tx, _button_rx) = channel::<ButtonRecord>(10).unwrap();

        let source = ScriptedInput::new(vec![
            InputEvent::Axis { id: 0, value: 5000 },
            // Ignored orientation axis
            InputEvent::Axis {
                id: 24,
                value: 31000,
            },
            InputEvent::Axis {
                id: 3,
                value: 12000,
            },
        ]);

        let lc = Lifecycle::new();
        let stopper = lc.clone();

        // The source drains, then the loop idles; stop it from another
        // thread after the samples land
        let handle = std::thread::spawn(move || {
            run(lc, params(), source, axis_tx, button_tx);
        });

        let mut out = AxisRecord::default();
        while !axis_rx.read(&mut out) || out.tick < 2 {
            std::thread::yield_now();
        }

        stopper.shutdown();
        handle.join().unwrap();

        assert_eq!(out.steer, 5000.0);
        // Up must be forward
        assert_eq!(out.throttle, -12000.0);
    }

    #[test]
    fn test_button_transitions_published() {
        let (axis_tx, _axis_rx) = channel::<AxisRecord>(10).unwrap();
        let (button_tx, button_rx) = channel::<ButtonRecord>(10).unwrap();

        let source = ScriptedInput::new(vec![InputEvent::Button {
            id: 14,
            pressed: true,
        }]);

        let lc = Lifecycle::new();
        let stopper = lc.clone();

        let handle = std::thread::spawn(move || {
            run(lc, params(), source, axis_tx, button_tx);
        });

        let mut out = ButtonRecord::default();
        while !button_rx.read(&mut out) {
            std::thread::yield_now();
        }

        stopper.shutdown();
        handle.join().unwrap();

        assert_eq!(out.button, 14);
        assert_eq!(out.state, 1);
    }
}
