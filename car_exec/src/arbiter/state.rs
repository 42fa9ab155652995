//! Implementations for the control arbiter state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use super::{ArbiterError, Params};
use crate::records::{AxisRecord, DriveDemands};
use util::{
    maths::{clamp, lin_map},
    module::State,
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Control arbitration module state
#[derive(Default)]
pub struct ControlArbiter {
    pub(crate) params: Params,

    /// Ticks remaining on autonomy ownership of the steering axis
    pred_steer_ttl: u32,

    /// Ticks remaining on autonomy ownership of the throttle axis
    pred_throttle_ttl: u32,

    /// Tick of the last prediction consumed, used to detect fresh samples
    last_pred_tick: Option<u64>,

    /// The demand pair currently in force. A missing sample on either
    /// channel leaves the previous candidate for that axis untouched.
    candidate: DriveDemands,
}

/// Input data to control arbitration.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// Latest joystick axis sample, or `None` if the joystick has not yet
    /// published anything this session.
    pub joystick: Option<AxisRecord>,

    /// Latest autonomy axis sample, or `None` if no autonomy source has
    /// published anything this session.
    pub prediction: Option<AxisRecord>,
}

/// Status report for arbitration processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// Ticks remaining on autonomy steering ownership
    pub steer_ttl: u32,

    /// Ticks remaining on autonomy throttle ownership
    pub throttle_ttl: u32,

    /// Which stream owned steering this tick
    pub steer_source: CmdSource,

    /// Which stream owned throttle this tick
    pub throttle_source: CmdSource,

    /// True if a fresh prediction was consumed this tick
    pub fresh_prediction: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The stream that owns an actuation axis on a given tick.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Debug)]
pub enum CmdSource {
    Human,
    Autonomy,
}

impl Default for CmdSource {
    fn default() -> Self {
        CmdSource::Human
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for ControlArbiter {
    type InitData = &'static str;
    type InitError = ArbiterError;

    type InputData = InputData;
    type OutputData = DriveDemands;
    type StatusReport = StatusReport;
    type ProcError = ArbiterError;

    /// Initialise the arbiter.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        let params: Params =
            params::load(init_data).map_err(ArbiterError::ParamLoadError)?;

        *self = Self::with_params(params)?;

        Ok(())
    }

    /// Process one arbitration tick.
    fn proc(&mut self, input: &InputData)
        -> Result<(DriveDemands, StatusReport), ArbiterError>
    {
        let mut report = StatusReport::default();

        // Ownership windows decay by one tick before any arming, so a window
        // of W keeps autonomy in charge for exactly W ticks counting the
        // arming tick itself.
        self.pred_steer_ttl = self.pred_steer_ttl.saturating_sub(1);
        self.pred_throttle_ttl = self.pred_throttle_ttl.saturating_sub(1);

        // A prediction is consumed only once: its tick must differ from the
        // last one seen
        if let Some(pred) = input.prediction {
            if self.last_pred_tick != Some(pred.tick) {
                self.last_pred_tick = Some(pred.tick);
                report.fresh_prediction = true;

                let steering = self.normalise(pred.steer);
                let throttle = self.normalise(pred.throttle);

                self.candidate.steering = steering;
                self.candidate.throttle = throttle;

                self.pred_steer_ttl = self.params.pred_window_ticks;

                // A zero-throttle prediction does not claim the throttle
                // axis: the human regains throttle control immediately
                if throttle != 0.0 {
                    self.pred_throttle_ttl = self.params.pred_window_ticks;
                }
            }
        }

        // The joystick claims any axis whose ownership window has lapsed
        if let Some(axis) = input.joystick {
            if self.pred_steer_ttl == 0 {
                self.candidate.steering = self.normalise(axis.steer);
            }
            if self.pred_throttle_ttl == 0 {
                self.candidate.throttle = self.normalise(axis.throttle);
            }
        }

        report.steer_ttl = self.pred_steer_ttl;
        report.throttle_ttl = self.pred_throttle_ttl;
        report.steer_source = match self.pred_steer_ttl {
            0 => CmdSource::Human,
            _ => CmdSource::Autonomy,
        };
        report.throttle_source = match self.pred_throttle_ttl {
            0 => CmdSource::Human,
            _ => CmdSource::Autonomy,
        };

        let demands = DriveDemands {
            steering: clamp(&self.candidate.steering, &-1.0, &1.0),
            throttle: clamp(&self.candidate.throttle, &-1.0, &1.0),
        };

        Ok((demands, report))
    }
}

impl ControlArbiter {
    /// Build an arbiter directly from a parameter set.
    pub fn with_params(params: Params) -> Result<Self, ArbiterError> {
        if params.axis_scale <= 0.0 {
            return Err(ArbiterError::InvalidAxisScale(params.axis_scale));
        }

        Ok(Self {
            params,
            ..Default::default()
        })
    }

    /// Map a raw axis deflection onto the normalised [-1, 1] range.
    fn normalise(&self, raw: f64) -> f64 {
        let s = self.params.axis_scale;
        lin_map((-s, s), (-1.0, 1.0), raw)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn arbiter() -> ControlArbiter {
        ControlArbiter::with_params(Params {
            pred_window_ticks: 60,
            axis_scale: 32767.0,
        })
        .unwrap()
    }

    fn joystick(steer: f64, throttle: f64) -> AxisRecord {
        AxisRecord {
            steer,
            throttle,
            tick: 1,
        }
    }

    #[test]
    fn test_joystick_only() {
        let mut arb = arbiter();

        let input = InputData {
            joystick: Some(joystick(32767.0, -16383.5)),
            prediction: None,
        };

        let (demands, report) = arb.proc(&input).unwrap();

        assert!((demands.steering - 1.0).abs() < 1e-9);
        assert!((demands.throttle + 0.5).abs() < 1e-9);
        assert_eq!(report.steer_source, CmdSource::Human);
        assert_eq!(report.throttle_source, CmdSource::Human);
    }

    #[test]
    fn test_handoff_window() {
        let mut arb = arbiter();

        let js = joystick(10000.0, 5000.0);
        let pred = AxisRecord {
            steer: -32767.0,
            throttle: 16383.5,
            tick: 100,
        };

        // The prediction arrives once; the same record stays in the channel
        // and must not re-arm the window on later ticks
        let with_pred = InputData {
            joystick: Some(js),
            prediction: Some(pred),
        };

        // Ticks T0..T0+59: autonomy owns both axes
        for tick in 0..60 {
            let (demands, report) = arb.proc(&with_pred).unwrap();

            assert!(
                (demands.steering + 1.0).abs() < 1e-9,
                "joystick stole steering at tick {}",
                tick
            );
            assert!((demands.throttle - 0.5).abs() < 1e-9);
            assert_eq!(report.steer_source, CmdSource::Autonomy);
            assert_eq!(report.throttle_source, CmdSource::Autonomy);
            assert_eq!(report.fresh_prediction, tick == 0);
        }

        // Tick T0+60: the window has lapsed, the human is back in charge
        let (demands, report) = arb.proc(&with_pred).unwrap();

        assert!((demands.steering - 10000.0 / 32767.0).abs() < 1e-9);
        assert!((demands.throttle - 5000.0 / 32767.0).abs() < 1e-9);
        assert_eq!(report.steer_source, CmdSource::Human);
        assert_eq!(report.throttle_source, CmdSource::Human);
    }

    #[test]
    fn test_zero_throttle_failsafe() {
        let mut arb = arbiter();

        let js = joystick(0.0, 8000.0);
        let pred = AxisRecord {
            steer: 16383.5,
            throttle: 0.0,
            tick: 7,
        };

        let input = InputData {
            joystick: Some(js),
            prediction: Some(pred),
        };

        let (demands, report) = arb.proc(&input).unwrap();

        // Steering belongs to the autonomy for the window
        assert!((demands.steering - 0.5).abs() < 1e-9);
        assert_eq!(report.steer_source, CmdSource::Autonomy);

        // But a stop prediction never claims throttle
        assert!((demands.throttle - 8000.0 / 32767.0).abs() < 1e-9);
        assert_eq!(report.throttle_source, CmdSource::Human);
        assert_eq!(report.throttle_ttl, 0);
    }

    #[test]
    fn test_missing_samples_hold_candidate() {
        let mut arb = arbiter();

        let input = InputData {
            joystick: Some(joystick(16383.5, 16383.5)),
            prediction: None,
        };
        arb.proc(&input).unwrap();

        // Joystick goes silent: the previous demands stay in force
        let silent = InputData {
            joystick: None,
            prediction: None,
        };
        let (demands, _) = arb.proc(&silent).unwrap();

        assert!((demands.steering - 0.5).abs() < 1e-9);
        assert!((demands.throttle - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_new_prediction_rearms_window() {
        let mut arb = arbiter();

        let js = joystick(10000.0, 10000.0);

        for tick in 0..200u64 {
            // A fresh prediction every tick keeps re-arming the window
            let input = InputData {
                joystick: Some(js),
                prediction: Some(AxisRecord {
                    steer: -16383.5,
                    throttle: 16383.5,
                    tick,
                }),
            };

            let (demands, _) = arb.proc(&input).unwrap();
            assert!((demands.steering + 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_demands_clamped() {
        let mut arb = arbiter();

        let input = InputData {
            joystick: Some(joystick(2.0 * 32767.0, -2.0 * 32767.0)),
            prediction: None,
        };

        let (demands, _) = arb.proc(&input).unwrap();

        assert_eq!(demands.steering, 1.0);
        assert_eq!(demands.throttle, -1.0);
    }

    #[test]
    fn test_invalid_axis_scale_rejected() {
        assert!(ControlArbiter::with_params(Params {
            pred_window_ticks: 60,
            axis_scale: 0.0,
        })
        .is_err());
    }
}
