//! # Drive loop
//!
//! The consumer tick of the exec. Each tick reads the latest joystick and
//! autonomy samples, arbitrates ownership of the two actuation axes, and
//! forwards the winning demand pair to the drive actuator.
//!
//! The autonomy stream is either the remote predictor's channel or the
//! onboard path follower, selected by the follower's `enabled` parameter.
//! The follower publishes its demands in the same form as a prediction, so
//! the hand-off protocol treats both autonomy sources identically.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, info, warn};
use serde::Deserialize;
use std::time::{Duration, Instant};

// Internal
use crate::arbiter::{self, ControlArbiter};
use crate::auto::follower::{Follower, FollowerMode};
use crate::channel::SampleReader;
use crate::eqpt::{DriveActuator, PoseSource};
use crate::lifecycle::Lifecycle;
use crate::records::AxisRecord;
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the drive loop.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Target period of one drive tick.
    ///
    /// The arbitration window and the follower's PID gains are tuned at
    /// this rate.
    ///
    /// Units: milliseconds
    pub tick_period_ms: u64,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Drive loop.
///
/// Runs until the lifecycle is shut down. Returns early, leaving the rest of
/// the exec running, if the actuator hardware is not ready.
pub fn run<A: DriveActuator, P: PoseSource>(
    lc: Lifecycle,
    params: Params,
    mut arbiter: ControlArbiter,
    mut follower: Follower,
    mut actuator: A,
    mut pose_source: P,
    js_rx: SampleReader<AxisRecord>,
    pred_rx: SampleReader<AxisRecord>,
) {
    if !actuator.is_ready() {
        error!("Drive actuator is not ready, drive loop will not run");
        return;
    }

    info!("Drive loop started, tick period {} ms", params.tick_period_ms);

    let tick_period = Duration::from_millis(params.tick_period_ms);
    let follow_route = follower.params.enabled;

    // Ticks for records synthesised from the follower
    let mut follower_tick = 0u64;
    let mut prev_mode = follower.mode();

    let mut axis = AxisRecord::default();
    let mut pred = AxisRecord::default();

    while lc.running() {
        let tick_start = Instant::now();

        // ---- AUTONOMY SOURCE ----

        let autonomy: Option<AxisRecord> = if follow_route {
            follower_demands(&mut follower, &mut pose_source, &arbiter, &mut follower_tick, &mut prev_mode)
        } else {
            match pred_rx.read(&mut pred) {
                true => Some(pred),
                false => None,
            }
        };

        // ---- ARBITRATION ----

        let input = arbiter::InputData {
            joystick: match js_rx.read(&mut axis) {
                true => Some(axis),
                false => None,
            },
            prediction: autonomy,
        };

        match arbiter.proc(&input) {
            Ok((demands, _report)) => {
                actuator.set_steering(demands.steering);
                actuator.set_throttle(demands.throttle);
            }
            Err(e) => warn!("Arbitration failed: {}", e),
        }

        // ---- TICK MANAGEMENT ----

        match tick_period.checked_sub(tick_start.elapsed()) {
            Some(d) => std::thread::sleep(d),
            None => warn!(
                "Drive tick overran by {:.6} s",
                (tick_start.elapsed() - tick_period).as_secs_f64()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Run the follower against the latest pose and shape its output as an
/// autonomy axis record.
///
/// The follower emits a fresh record every tick while following, plus one
/// final stop record when the path completes. After that it goes silent so
/// the arbitration window can lapse and hand the car back to the human.
fn follower_demands<P: PoseSource>(
    follower: &mut Follower,
    pose_source: &mut P,
    arbiter: &ControlArbiter,
    follower_tick: &mut u64,
    prev_mode: &mut FollowerMode,
) -> Option<AxisRecord> {
    let pose = pose_source.sample_pose()?;

    // A route session begins on the first pose fix
    if follower.mode() == FollowerMode::Idle {
        if let Err(e) = follower.begin(&pose) {
            warn!("Could not start follower session: {}", e);
            return None;
        }
    }

    let (demands, _report) = match follower.proc(&pose) {
        Ok(out) => out,
        Err(e) => {
            warn!("Follower processing failed: {}", e);
            return None;
        }
    };

    let mode = follower.mode();
    let completed_this_tick = mode == FollowerMode::Complete && *prev_mode != FollowerMode::Complete;
    *prev_mode = mode;

    if mode != FollowerMode::Following && !completed_this_tick {
        return None;
    }

    *follower_tick += 1;

    // The follower speaks normalised demands; records carry raw axis units
    let scale = arbiter.params.axis_scale;
    Some(AxisRecord {
        steer: demands.steering * scale,
        throttle: demands.throttle * scale,
        tick: *follower_tick,
    })
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::arbiter;
    use crate::auto::follower;
    use crate::channel::{channel, SampleWriter};
    use crate::records::DriveDemands;
    use nalgebra::Vector2;

    /// An actuator that republishes each demand pair for the test to read.
    struct RecordingActuator {
        tx: SampleWriter<DriveDemands>,
        steering: f64,
    }

    impl DriveActuator for RecordingActuator {
        fn set_steering(&mut self, percent: f64) {
            self.steering = percent;
        }

        fn set_throttle(&mut self, percent: f64) {
            self.tx.write(DriveDemands {
                steering: self.steering,
                throttle: percent,
            });
        }

        fn is_ready(&self) -> bool {
            true
        }
    }

    /// A pose source pinned to one position.
    struct FixedPose(Vector2<f64>);

    impl PoseSource for FixedPose {
        fn sample_pose(&mut self) -> Option<crate::records::Pose> {
            Some(crate::records::Pose { position_m: self.0 })
        }
    }

    fn drive_params() -> Params {
        Params { tick_period_ms: 1 }
    }

    #[test]
    fn test_joystick_demands_reach_actuator() {
        let (mut js_tx, js_rx) = channel::<AxisRecord>(10).unwrap();
        let (_pred_tx, pred_rx) = channel::<AxisRecord>(10).unwrap();
        let (dem_tx, dem_rx) = channel::<DriveDemands>(4).unwrap();

        js_tx.write(AxisRecord {
            steer: 16383.5,
            throttle: -16383.5,
            tick: 1,
        });

        let arbiter = ControlArbiter::with_params(arbiter::Params::default()).unwrap();
        let follower = Follower::with_params(follower::Params::default());

        let lc = Lifecycle::new();
        let stopper = lc.clone();

        let handle = std::thread::spawn(move || {
            run(
                lc,
                drive_params(),
                arbiter,
                follower,
                RecordingActuator {
                    tx: dem_tx,
                    steering: 0.0,
                },
                FixedPose(Vector2::zeros()),
                js_rx,
                pred_rx,
            );
        });

        let mut out = DriveDemands::default();
        while !dem_rx.read(&mut out) {
            std::thread::yield_now();
        }

        stopper.shutdown();
        handle.join().unwrap();

        assert!((out.steering - 0.5).abs() < 1e-9);
        assert!((out.throttle + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_follower_cruises_as_autonomy_source() {
        let (_js_tx, js_rx) = channel::<AxisRecord>(10).unwrap();
        let (_pred_tx, pred_rx) = channel::<AxisRecord>(10).unwrap();
        let (dem_tx, dem_rx) = channel::<DriveDemands>(4).unwrap();

        let arbiter = ControlArbiter::with_params(arbiter::Params::default()).unwrap();

        let follower = Follower::with_params(follower::Params {
            enabled: true,
            k_p: 2.0,
            k_i: 0.0,
            k_d: 0.0,
            accumulate_integral: false,
            cruise_throttle: 0.25,
            route: vec![[0.0, 0.0], [10.0, 0.0], [20.0, 0.0]],
            looping: false,
        });

        let lc = Lifecycle::new();
        let stopper = lc.clone();

        // Pinned mid-segment: the follower cruises forever
        let handle = std::thread::spawn(move || {
            run(
                lc,
                drive_params(),
                arbiter,
                follower,
                RecordingActuator {
                    tx: dem_tx,
                    steering: 0.0,
                },
                FixedPose(Vector2::new(5.0, 0.0)),
                js_rx,
                pred_rx,
            );
        });

        let mut out = DriveDemands::default();
        while !dem_rx.read(&mut out) || out.throttle == 0.0 {
            std::thread::yield_now();
        }

        stopper.shutdown();
        handle.join().unwrap();

        assert!((out.throttle - 0.25).abs() < 1e-9);
        // On the path centreline there is nothing to correct
        assert!(out.steering.abs() < 1e-9);
    }
}
