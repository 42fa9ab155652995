//! # Simulated equipment
//!
//! Software stand-ins for the vehicle hardware, selected by setting a
//! device name to `"sim"` in the relevant parameter file. The producer loops
//! drive these exactly as they would real devices, which keeps the full
//! pipeline exercisable on a desk.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::VecDeque;

use log::debug;
use nalgebra::Vector2;

use super::{DriveActuator, EqptError, FrameSource, InputEvent, InputSource, PoseSource, SweepSource};
use crate::records::{LidarReturn, Pose};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A frame source producing synthetic gradient frames of a fixed size.
pub struct SimFrameSource {
    frame: Vec<u8>,
    counter: u8,
}

/// A sweep source producing a constant-radius synthetic sweep.
pub struct SimSweepSource {
    radius_mm: f32,
}

/// An input source replaying a scripted sequence of events.
///
/// Also the input source used by unit tests.
pub struct ScriptedInput {
    events: VecDeque<InputEvent>,
}

/// A pose source that walks the vehicle along the +x axis at a fixed step.
pub struct SimPoseSource {
    position_m: Vector2<f64>,
    step_m: f64,
}

/// An actuator that records the last demand pair and logs it.
#[derive(Default)]
pub struct SimActuator {
    /// Last commanded steering
    pub steering: f64,

    /// Last commanded throttle
    pub throttle: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimFrameSource {
    pub fn new(frame_len: usize) -> Self {
        Self {
            frame: vec![0u8; frame_len],
            counter: 0,
        }
    }
}

impl FrameSource for SimFrameSource {
    fn init(&mut self) -> Result<(), EqptError> {
        Ok(())
    }

    fn grab(&mut self) -> Result<Option<&[u8]>, EqptError> {
        // A rolling gradient so successive frames differ
        self.counter = self.counter.wrapping_add(1);
        for (i, px) in self.frame.iter_mut().enumerate() {
            *px = (i as u8).wrapping_add(self.counter);
        }

        Ok(Some(&self.frame))
    }
}

impl SimSweepSource {
    pub fn new(radius_mm: f32) -> Self {
        Self { radius_mm }
    }
}

impl SweepSource for SimSweepSource {
    fn init(&mut self) -> Result<(), EqptError> {
        Ok(())
    }

    fn grab_sweep(&mut self, dest: &mut [LidarReturn]) -> Result<Option<usize>, EqptError> {
        let count = dest.len().min(360);

        for (i, ret) in dest.iter_mut().take(count).enumerate() {
            *ret = LidarReturn {
                distance: self.radius_mm,
                angle: i as f32,
                quality: 47,
            };
        }

        Ok(Some(count))
    }
}

impl ScriptedInput {
    pub fn new(events: Vec<InputEvent>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn try_open(&mut self) -> bool {
        true
    }

    fn sample(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }
}

impl SimPoseSource {
    pub fn new(start_m: Vector2<f64>, step_m: f64) -> Self {
        Self {
            position_m: start_m,
            step_m,
        }
    }
}

impl PoseSource for SimPoseSource {
    fn sample_pose(&mut self) -> Option<Pose> {
        let pose = Pose {
            position_m: self.position_m,
        };

        self.position_m += Vector2::new(self.step_m, 0.0);

        Some(pose)
    }
}

impl DriveActuator for SimActuator {
    fn set_steering(&mut self, percent: f64) {
        debug!("sim steering demand: {:.3}", percent);
        self.steering = percent;
    }

    fn set_throttle(&mut self, percent: f64) {
        debug!("sim throttle demand: {:.3}", percent);
        self.throttle = percent;
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scripted_input_drains() {
        let mut input = ScriptedInput::new(vec![
            InputEvent::Axis { id: 0, value: 100 },
            InputEvent::Button {
                id: 14,
                pressed: true,
            },
        ]);

        assert!(input.try_open());
        assert!(matches!(
            input.sample(),
            Some(InputEvent::Axis { id: 0, value: 100 })
        ));
        assert!(matches!(
            input.sample(),
            Some(InputEvent::Button { id: 14, pressed: true })
        ));
        assert!(input.sample().is_none());
    }

    #[test]
    fn test_sim_frames_differ() {
        let mut cam = SimFrameSource::new(16);
        cam.init().unwrap();

        let first = cam.grab().unwrap().unwrap().to_vec();
        let second = cam.grab().unwrap().unwrap().to_vec();

        assert_eq!(first.len(), 16);
        assert_ne!(first, second);
    }
}
