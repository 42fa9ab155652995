//! # Follower PID controller
//!
//! The control law converting a signed cross-track error into a steering
//! correction.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller over the cross-track error.
///
/// The derivative is the raw difference between successive samples and the
/// integral the raw sum, so the controller assumes it is called at a fixed
/// rate; the drive loop's tick period is a configuration constant.
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Derivative gain
    k_d: f64,

    /// If false the integral accumulator is left at zero
    accumulate_integral: bool,

    /// Error from the previous sample
    prev_error: f64,

    /// The integral accumulation
    integral: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64, accumulate_integral: bool) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            accumulate_integral,
            prev_error: 0f64,
            integral: 0f64,
        }
    }

    /// Clear the accumulated control history at the start of a session.
    pub fn reset(&mut self) {
        self.prev_error = 0f64;
        self.integral = 0f64;
    }

    /// Get the steering correction for the given error.
    ///
    /// A positive error produces a negative correction; each term opposes
    /// the error it measures.
    pub fn correction(&mut self, error: f64) -> f64 {
        let derivative = error - self.prev_error;

        if self.accumulate_integral {
            self.integral += error;
        }

        let out = -(self.k_p * error) - (self.k_d * derivative) - (self.k_i * self.integral);

        // Save err for next iteration
        self.prev_error = error;

        out
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_proportional_opposes_error() {
        let mut pid = PidController::new(2.0, 0.0, 0.0, false);

        assert_eq!(pid.correction(0.5), -1.0);
        assert_eq!(pid.correction(-0.5), 1.0);
    }

    #[test]
    fn test_derivative_uses_previous_error() {
        let mut pid = PidController::new(0.0, 0.0, 3.0, false);

        // First sample: derivative is the full error (previous error starts
        // at zero)
        assert_eq!(pid.correction(1.0), -3.0);

        // Constant error: no derivative contribution
        assert_eq!(pid.correction(1.0), 0.0);

        // Falling error: positive contribution
        assert_eq!(pid.correction(0.5), 1.5);
    }

    #[test]
    fn test_integral_accumulates_when_enabled() {
        let mut pid = PidController::new(0.0, 1.0, 0.0, true);

        assert_eq!(pid.correction(1.0), -1.0);
        assert_eq!(pid.correction(1.0), -2.0);
        assert_eq!(pid.correction(1.0), -3.0);
    }

    #[test]
    fn test_integral_disabled() {
        let mut pid = PidController::new(0.0, 1.0, 0.0, false);

        for _ in 0..10 {
            assert_eq!(pid.correction(1.0), 0.0);
        }
    }

    #[test]
    fn test_reset_clears_history() {
        let mut pid = PidController::new(1.0, 1.0, 1.0, true);

        pid.correction(2.0);
        pid.correction(-1.0);
        pid.reset();

        // After a reset the first correction looks like a first sample
        assert_eq!(pid.correction(1.0), -(1.0 + 1.0 + 1.0));
    }
}
